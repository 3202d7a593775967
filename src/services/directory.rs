// Client directory backends
//
// Each company runs its own directory engine with its own schema: Sundea
// keys clients on first/last name and records installations, Optivendi
// keys on a single name and has no installation data. Access goes through
// a bounded connection pool; the pooled connection is a guard, so it goes
// back to the pool when it drops on success and failure paths alike.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info};

use super::{ClientCriteria, ClientDirectory};

#[derive(Debug)]
struct PoolInner {
    path: PathBuf,
    idle: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
}

/// Bounded pool of sqlite connections to one database file.
#[derive(Clone, Debug)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Open the pool, establishing one connection eagerly so a bad path
    /// fails at startup rather than on the first query.
    pub fn open(path: impl Into<PathBuf>, max_connections: usize) -> Result<Self> {
        let path = path.into();
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        Ok(Self {
            inner: Arc::new(PoolInner {
                path,
                idle: Mutex::new(vec![conn]),
                permits: Arc::new(Semaphore::new(max_connections)),
            }),
        })
    }

    pub async fn acquire(&self) -> Result<PooledConnection> {
        let permit = Arc::clone(&self.inner.permits)
            .acquire_owned()
            .await
            .context("Connection pool closed")?;

        let reused = match self.inner.idle.lock() {
            Ok(mut idle) => idle.pop(),
            Err(_) => None,
        };
        let conn = match reused {
            Some(conn) => conn,
            None => Connection::open(&self.inner.path).with_context(|| {
                format!("Failed to open database {}", self.inner.path.display())
            })?,
        };

        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(&self.inner),
            _permit: permit,
        })
    }
}

/// A checked-out connection. Returns itself to the pool on drop.
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl std::ops::Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection taken")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Ok(mut idle) = self.pool.idle.lock() {
                debug!("Returning connection to pool");
                idle.push(conn);
            }
        }
    }
}

/// Decode every row of a prepared statement into a JSON object keyed by
/// column name.
fn rows_to_json(
    stmt: &mut rusqlite::Statement<'_>,
    params: impl rusqlite::Params,
) -> Result<Vec<Value>> {
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();

    let mut rows = stmt.query(params).context("Query failed")?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().context("Row fetch failed")? {
        let mut object = serde_json::Map::new();
        for (index, name) in columns.iter().enumerate() {
            let value = match row.get_ref(index).context("Column decode failed")? {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(n) => Value::from(n),
                ValueRef::Real(f) => Value::from(f),
                ValueRef::Text(text) => {
                    Value::String(String::from_utf8_lossy(text).into_owned())
                }
                ValueRef::Blob(_) => Value::Null,
            };
            object.insert(name.clone(), value);
        }
        out.push(Value::Object(object));
    }
    Ok(out)
}

async fn ping(pool: &ConnectionPool) -> Result<()> {
    let conn = pool.acquire().await?;
    tokio::task::spawn_blocking(move || -> Result<()> {
        conn.query_row("SELECT 1", [], |_| Ok(()))
            .context("Connection check failed")?;
        Ok(())
    })
    .await
    .context("Connection check task failed")?
}

/// Sundea client directory: clients by first and last name, plus
/// installation records.
#[derive(Debug)]
pub struct SundeaDirectory {
    pool: ConnectionPool,
}

impl SundeaDirectory {
    pub fn open(path: impl Into<PathBuf>, max_connections: usize) -> Result<Self> {
        Ok(Self {
            pool: ConnectionPool::open(path, max_connections)?,
        })
    }

    pub async fn ping(&self) -> Result<()> {
        ping(&self.pool).await
    }
}

#[async_trait]
impl ClientDirectory for SundeaDirectory {
    async fn lookup_client(&self, criteria: &ClientCriteria) -> Result<Vec<Value>> {
        let ClientCriteria::FullName {
            first_name,
            last_name,
        } = criteria
        else {
            bail!("Sundea directory requires first_name and last_name criteria");
        };
        info!(first_name, last_name, "Getting client information from the database");

        let first_name = first_name.clone();
        let last_name = last_name.clone();
        let conn = self.pool.acquire().await?;
        tokio::task::spawn_blocking(move || -> Result<Vec<Value>> {
            let mut stmt = conn
                .prepare(
                    "SELECT * FROM clients \
                     WHERE first_name LIKE ?1 COLLATE NOCASE \
                     AND last_name LIKE ?2 COLLATE NOCASE",
                )
                .context("Failed to prepare client query")?;
            rows_to_json(&mut stmt, [first_name, last_name])
        })
        .await
        .context("Client query task failed")?
    }

    async fn lookup_installations(&self, client_id: &str) -> Result<Vec<Value>> {
        info!(client_id, "Getting client installation information from the database");

        let client_id = client_id.to_string();
        let conn = self.pool.acquire().await?;
        tokio::task::spawn_blocking(move || -> Result<Vec<Value>> {
            let mut stmt = conn
                .prepare("SELECT * FROM installations WHERE client_id = ?1")
                .context("Failed to prepare installation query")?;
            rows_to_json(&mut stmt, [client_id])
        })
        .await
        .context("Installation query task failed")?
    }
}

/// Optivendi client directory: clients by a single name column.
pub struct OptivendiDirectory {
    pool: ConnectionPool,
}

impl OptivendiDirectory {
    pub fn open(path: impl Into<PathBuf>, max_connections: usize) -> Result<Self> {
        Ok(Self {
            pool: ConnectionPool::open(path, max_connections)?,
        })
    }

    pub async fn ping(&self) -> Result<()> {
        ping(&self.pool).await
    }
}

#[async_trait]
impl ClientDirectory for OptivendiDirectory {
    async fn lookup_client(&self, criteria: &ClientCriteria) -> Result<Vec<Value>> {
        let ClientCriteria::CompanyName { name } = criteria else {
            bail!("Optivendi directory requires name criteria");
        };
        info!(name, "Getting client information from the database");

        let name = name.clone();
        let conn = self.pool.acquire().await?;
        tokio::task::spawn_blocking(move || -> Result<Vec<Value>> {
            let mut stmt = conn
                .prepare("SELECT * FROM clients WHERE name LIKE ?1 COLLATE NOCASE")
                .context("Failed to prepare client query")?;
            rows_to_json(&mut stmt, [name])
        })
        .await
        .context("Client query task failed")?
    }

    async fn lookup_installations(&self, _client_id: &str) -> Result<Vec<Value>> {
        bail!("Installations are not recorded in the Optivendi directory");
    }
}
