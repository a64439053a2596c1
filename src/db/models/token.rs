// src/db/models/token.rs

//! API token model

use crate::error::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

/// A stored API token; existence means validity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub id: Option<i64>,
    pub token: String,
}

impl Token {
    pub fn new(token: String) -> Self {
        Self { id: None, token }
    }

    /// Insert this token into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        match conn.execute("INSERT INTO tokens (token) VALUES (?1)", [&self.token]) {
            Ok(_) => {}
            Err(e) if Error::is_constraint_violation(&e) => {
                return Err(Error::Conflict("token value already exists".to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find a token by ID
    #[cfg(test)]
    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Self>> {
        let mut stmt = conn.prepare("SELECT id, token FROM tokens WHERE id = ?1")?;
        let token = stmt.query_row([id], Self::from_row).optional()?;
        Ok(token)
    }

    /// Whether `value` matches a stored token exactly
    pub fn exists(conn: &Connection, value: &str) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row("SELECT id FROM tokens WHERE token = ?1", [value], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    /// List all tokens ordered by ID
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT id, token FROM tokens ORDER BY id")?;
        let tokens = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tokens)
    }

    pub fn count(conn: &Connection) -> Result<i64> {
        let count = conn.query_row("SELECT COUNT(*) FROM tokens", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Overwrite the value of token `id`; `false` if no such row
    pub fn replace(conn: &Connection, id: i64, value: &str) -> Result<bool> {
        match conn.execute(
            "UPDATE tokens SET token = ?1 WHERE id = ?2",
            params![value, id],
        ) {
            Ok(changed) => Ok(changed == 1),
            Err(e) if Error::is_constraint_violation(&e) => {
                Err(Error::Conflict("token value already exists".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a token by ID, returning how many rows went away (0 or 1)
    pub fn delete(conn: &Connection, id: i64) -> Result<usize> {
        let removed = conn.execute("DELETE FROM tokens WHERE id = ?1", [id])?;
        Ok(removed)
    }

    /// Delete every token whose value differs from `keep`
    pub fn delete_all_except(conn: &Connection, keep: &str) -> Result<usize> {
        let removed = conn.execute("DELETE FROM tokens WHERE token != ?1", [keep])?;
        Ok(removed)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            token: row.get(1)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use tempfile::TempDir;

    fn create_test_db() -> (TempDir, Connection) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("parcel.db");
        db::init(&db_path).unwrap();
        let conn = db::open(&db_path).unwrap();
        (temp_dir, conn)
    }

    fn add(conn: &Connection, value: &str) -> i64 {
        Token::new(value.to_string()).insert(conn).unwrap()
    }

    #[test]
    fn test_insert_exists_and_count() {
        let (_temp, conn) = create_test_db();
        assert_eq!(Token::count(&conn).unwrap(), 0);

        let id = add(&conn, "aaaa");
        assert_eq!(id, 1);
        assert!(Token::exists(&conn, "aaaa").unwrap());
        assert!(!Token::exists(&conn, "AAAA").unwrap());
        assert!(!Token::exists(&conn, "").unwrap());
        assert_eq!(Token::count(&conn).unwrap(), 1);

        let err = Token::new("aaaa".to_string()).insert(&conn).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_replace() {
        let (_temp, conn) = create_test_db();
        let id = add(&conn, "old");

        assert!(Token::replace(&conn, id, "new").unwrap());
        assert!(!Token::exists(&conn, "old").unwrap());
        assert_eq!(Token::find_by_id(&conn, id).unwrap().unwrap().token, "new");

        assert!(!Token::replace(&conn, 77, "other").unwrap());
    }

    #[test]
    fn test_delete_all_except() {
        let (_temp, conn) = create_test_db();
        add(&conn, "one");
        add(&conn, "two");
        add(&conn, "three");

        assert_eq!(Token::delete_all_except(&conn, "two").unwrap(), 2);
        let remaining = Token::list_all(&conn).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].token, "two");
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (_temp, conn) = create_test_db();
        let id = add(&conn, "one");
        assert_eq!(Token::delete(&conn, id).unwrap(), 1);
        assert_eq!(Token::delete(&conn, id).unwrap(), 0);
    }
}
