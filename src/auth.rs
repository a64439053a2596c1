// src/auth.rs

//! Token authority
//!
//! Issues, validates and revokes API tokens. While no token exists the
//! service is in bootstrap mode and accepts every request; minting the first
//! token closes it.

use crate::db::Database;
use crate::db::models::Token;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use rand::RngCore;
use rand::rngs::OsRng;
use std::sync::Arc;
use tracing::{debug, info};

/// Random bytes per token (rendered as twice as many hex characters)
pub const TOKEN_BYTES: usize = 32;

/// Generate a fresh token value from the OS CSPRNG
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Extract the value from an `Authorization: Token <value>` header
///
/// The scheme is matched case-insensitively. Anything else, including an
/// empty value, yields `None`.
pub fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, value) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("token") {
        return None;
    }
    let value = value.trim();
    if value.is_empty() { None } else { Some(value) }
}

/// Short prefix of a token value that is safe to log
pub fn redact(value: &str) -> String {
    let prefix: String = value.chars().take(6).collect();
    format!("{prefix}...")
}

/// Cached answer to "does any token exist"
///
/// Every mutation bumps the generation; a lookup that raced a mutation
/// carries the old generation and its result is dropped. Only `true` is
/// trusted without a query, and a request it would reject re-counts first,
/// since another process (the CLI) can add or delete tokens without touching
/// this cache.
#[derive(Debug, Default)]
struct BootstrapCache {
    state: Mutex<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    generation: u64,
    has_tokens: bool,
}

impl BootstrapCache {
    fn lookup(&self) -> (bool, u64) {
        let state = self.state.lock();
        (state.has_tokens, state.generation)
    }

    fn store(&self, generation: u64, has_tokens: bool) {
        let mut state = self.state.lock();
        if state.generation == generation {
            state.has_tokens = has_tokens;
        }
    }

    fn invalidate(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.has_tokens = false;
    }
}

/// Outcome of [`TokenAuthority::authenticate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Bootstrap mode: no token exists
    Open,
    /// The presented value matched a stored token
    Token(String),
    Denied,
}

/// Token issuance and validation backed by the `tokens` table
#[derive(Debug, Clone)]
pub struct TokenAuthority {
    db: Database,
    cache: Arc<BootstrapCache>,
}

impl TokenAuthority {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            cache: Arc::new(BootstrapCache::default()),
        }
    }

    pub async fn list(&self) -> Result<Vec<Token>> {
        self.db.run(Token::list_all).await
    }

    /// Mint and persist a new token
    pub async fn issue(&self) -> Result<Token> {
        let token = self
            .db
            .run(|conn| {
                let mut token = Token::new(generate_token());
                token.insert(conn)?;
                Ok(token)
            })
            .await?;
        self.cache.invalidate();

        info!("Issued token {}", token.id.unwrap_or_default());
        Ok(token)
    }

    /// Whether no token exists (every request is accepted)
    pub async fn is_bootstrap(&self) -> Result<bool> {
        Ok(!self.count_and_cache().await?)
    }

    async fn count_and_cache(&self) -> Result<bool> {
        let (_, generation) = self.cache.lookup();
        let count = self.db.run(Token::count).await?;
        self.cache.store(generation, count > 0);
        Ok(count > 0)
    }

    /// Decide how a request presenting `presented` is let in, if at all
    pub async fn authenticate(&self, presented: Option<&str>) -> Result<Access> {
        let (cached, _) = self.cache.lookup();
        if !cached && !self.count_and_cache().await? {
            return Ok(Access::Open);
        }

        if let Some(value) = presented {
            let owned = value.to_string();
            if self.db.run(move |conn| Token::exists(conn, &owned)).await? {
                return Ok(Access::Token(value.to_string()));
            }
        }

        // Tokens deleted by another process leave the cached answer stale
        if cached && !self.count_and_cache().await? {
            debug!("No tokens left, back in bootstrap mode");
            return Ok(Access::Open);
        }

        match presented {
            Some(value) => debug!("Rejected token {}", redact(value)),
            None => debug!("No token presented"),
        }
        Ok(Access::Denied)
    }

    /// Whether a request presenting `presented` is accepted
    pub async fn validate(&self, presented: Option<&str>) -> Result<bool> {
        Ok(self.authenticate(presented).await? != Access::Denied)
    }

    /// Overwrite the value of token `id`
    pub async fn replace(&self, id: i64, value: String) -> Result<()> {
        let replaced = self
            .db
            .run(move |conn| Token::replace(conn, id, &value))
            .await?;
        self.cache.invalidate();

        if replaced {
            info!("Replaced token {}", id);
            Ok(())
        } else {
            Err(Error::NotFound(format!("token {id}")))
        }
    }

    /// Replace token `id` with a freshly generated value
    pub async fn rotate(&self, id: i64) -> Result<Token> {
        let value = generate_token();
        self.replace(id, value.clone()).await?;
        Ok(Token {
            id: Some(id),
            token: value,
        })
    }

    /// Delete every token except the one whose value is `keep`
    pub async fn revoke_all_except(&self, keep: &str) -> Result<usize> {
        let keep = keep.to_string();
        let removed = self
            .db
            .run(move |conn| Token::delete_all_except(conn, &keep))
            .await?;
        self.cache.invalidate();

        info!("Revoked {} token(s)", removed);
        Ok(removed)
    }

    /// Delete token `id`; absent ids are not an error
    pub async fn revoke_one(&self, id: i64) -> Result<()> {
        let removed = self.db.run(move |conn| Token::delete(conn, id)).await?;
        self.cache.invalidate();

        if removed > 0 {
            info!("Revoked token {}", id);
        } else {
            debug!("Token {} already gone", id);
        }
        Ok(())
    }
}
