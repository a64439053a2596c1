// src/db/models/package.rs

//! Package model and the guarded status transition

use crate::error::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    /// Registered, nothing fetched yet
    Created,
    /// Fetch/build finished successfully
    Downloaded,
    /// Activated by a client
    Activated,
}

impl PackageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageStatus::Created => "created",
            PackageStatus::Downloaded => "downloaded",
            PackageStatus::Activated => "activated",
        }
    }
}

impl FromStr for PackageStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "created" => Ok(PackageStatus::Created),
            "downloaded" => Ok(PackageStatus::Downloaded),
            "activated" => Ok(PackageStatus::Activated),
            _ => Err(format!("Invalid package status: {s}")),
        }
    }
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    pub id: Option<i64>,
    pub name: String,
    pub version: String,
    pub status: PackageStatus,
}

impl Package {
    /// Create a new package in the `created` state
    pub fn new(name: String, version: String) -> Self {
        Self {
            id: None,
            name,
            version,
            status: PackageStatus::Created,
        }
    }

    /// Insert this package into the database
    ///
    /// A duplicate (name, version) pair is reported as [`Error::Conflict`].
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        let inserted = conn.execute(
            "INSERT INTO packages (name, version, status) VALUES (?1, ?2, ?3)",
            params![&self.name, &self.version, self.status.as_str()],
        );

        match inserted {
            Ok(_) => {}
            Err(e) if Error::is_constraint_violation(&e) => {
                return Err(Error::Conflict(format!(
                    "package {} version {} already exists",
                    self.name, self.version
                )));
            }
            Err(e) => return Err(e.into()),
        }

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find a package by ID
    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Self>> {
        let mut stmt =
            conn.prepare("SELECT id, name, version, status FROM packages WHERE id = ?1")?;

        let package = stmt.query_row([id], Self::from_row).optional()?;

        Ok(package)
    }

    /// List all packages in insertion order
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt =
            conn.prepare("SELECT id, name, version, status FROM packages ORDER BY id")?;

        let packages = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(packages)
    }

    /// Move package `id` from `from` to `to` in a single conditional UPDATE
    ///
    /// Returns `true` only if the row existed and was in `from`. Every status
    /// change goes through here.
    pub fn transition(
        conn: &Connection,
        id: i64,
        from: PackageStatus,
        to: PackageStatus,
    ) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE packages SET status = ?1 WHERE id = ?2 AND status = ?3",
            params![to.as_str(), id, from.as_str()],
        )?;
        Ok(changed == 1)
    }

    /// Convert a database row to a Package
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let status_str: String = row.get(3)?;
        let status = status_str.parse::<PackageStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            )
        })?;

        Ok(Self {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            version: row.get(2)?,
            status,
        })
    }
}
