//! Key-value cache store.
//!
//! [`CacheStore`] is the capability the fetcher depends on. Production uses
//! [`RedisStore`]; tests substitute in-memory stubs.

use std::time::Duration;

use r2d2::{CustomizeConnection, Pool};
use redis::{Client, Connection, RedisError};
use tracing::{info, warn};

use crate::errors::CacheError;

/// Connect and command timeout for the store.
pub const STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on open store connections.
const POOL_SIZE: u32 = 8;

/// Minimal key-value capability with TTL writes.
pub trait CacheStore: Send + Sync {
    /// Fetch a value. `Ok(None)` is a clean miss.
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a value that expires after `ttl`.
    fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Check the store is reachable.
    fn ping(&self) -> Result<(), CacheError>;
}

/// Applies the command timeouts to every pooled connection.
#[derive(Debug, Clone, Copy)]
struct CommandTimeouts(Duration);

impl CustomizeConnection<Connection, RedisError> for CommandTimeouts {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), RedisError> {
        conn.set_read_timeout(Some(self.0))?;
        conn.set_write_timeout(Some(self.0))
    }
}

/// Redis-backed store (database 0).
///
/// Holds one connection pool for the life of the process. Connections are
/// opened on demand, kept, and handed back after each command.
pub struct RedisStore {
    pool: Pool<Client>,
    url: String,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("url", &self.url)
            .field("pool", &self.pool.state())
            .finish()
    }
}

impl RedisStore {
    /// Create a store handle without waiting on the network.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection URL is invalid.
    pub fn new(host: &str, port: u16) -> Result<Self, CacheError> {
        Self::with_timeout(host, port, STORE_TIMEOUT)
    }

    fn with_timeout(host: &str, port: u16, timeout: Duration) -> Result<Self, CacheError> {
        let url = format!("redis://{host}:{port}/0");
        let client = Client::open(url.as_str())?;
        let pool = Pool::builder()
            .max_size(POOL_SIZE)
            .min_idle(Some(1))
            .connection_timeout(timeout)
            .connection_customizer(Box::new(CommandTimeouts(timeout)))
            .build_unchecked(client);
        Ok(Self { pool, url })
    }

    /// Create a store and verify it answers `PING`.
    ///
    /// Returns `None` when the store is unreachable; the gateway then runs
    /// without a cache for the life of the process.
    #[must_use]
    pub fn connect(host: &str, port: u16) -> Option<Self> {
        Self::connect_within(host, port, STORE_TIMEOUT)
    }

    fn connect_within(host: &str, port: u16, timeout: Duration) -> Option<Self> {
        let store = match Self::with_timeout(host, port, timeout) {
            Ok(s) => s,
            Err(e) => {
                warn!("invalid cache store address {host}:{port}: {e}");
                return None;
            }
        };

        match store.ping() {
            Ok(()) => {
                info!("connected to cache store at {host}:{port}");
                Some(store)
            }
            Err(e) => {
                warn!("failed to connect to cache store at {host}:{port}: {e}");
                None
            }
        }
    }
}

impl CacheStore for RedisStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.pool.get()?;
        let value = redis::cmd("GET").arg(key).query::<Option<String>>(&mut *conn)?;
        Ok(value)
    }

    fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.pool.get()?;
        // SETEX rejects a zero expiry.
        let secs = ttl.as_secs().max(1);
        redis::cmd("SETEX")
            .arg(key)
            .arg(secs)
            .arg(value)
            .query::<()>(&mut *conn)?;
        Ok(())
    }

    fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.pool.get()?;
        redis::cmd("PING").query::<String>(&mut *conn)?;
        Ok(())
    }
}
