use std::{env, error::Error, fmt, future::Future};

use async_trait::async_trait;
use plan_core::{
    error::{PlanError, Result},
    store::{PlanStore, PlanStoreTransaction},
};
use sqlx::Transaction;

pub mod data_model;
pub mod queries;

/// A row decoded into something that violates an invariant the core assumes
/// always holds (e.g. a trip with two owner columns set). Should only ever
/// be reachable via a hand-edited database, not through this crate's own
/// writes.
#[derive(Debug)]
pub struct CorruptRow(pub &'static str);

impl fmt::Display for CorruptRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "corrupt row: {}", self.0)
    }
}

impl Error for CorruptRow {}

impl From<CorruptRow> for PlanError {
    fn from(value: CorruptRow) -> Self {
        PlanError::storage(value)
    }
}

pub struct DatabaseConnectionInfo {
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub port: u16,
    pub database: String,
}

impl DatabaseConnectionInfo {
    pub fn from_env() -> Option<Self> {
        let username = env::var("DATABASE_USER").ok()?;
        let password = env::var("DATABASE_PASSWORD").ok()?;
        let hostname = env::var("DATABASE_HOST").ok()?;
        let port: u16 = env::var("DATABASE_PORT").ok()?.parse().ok()?;
        let database = env::var("DATABASE_NAME").ok()?;
        Some(Self {
            username,
            password,
            hostname,
            port,
            database,
        })
    }

    fn postgres_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.hostname, self.port, self.database
        )
    }
}

#[derive(Clone)]
pub struct PgPlanStore {
    pool: sqlx::PgPool,
}

impl PgPlanStore {
    pub async fn connect(info: &DatabaseConnectionInfo) -> std::result::Result<Self, Box<dyn Error>> {
        let pool = sqlx::postgres::PgPool::connect(&info.postgres_url()).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        log::info!("connected to plan store at {}:{}", info.hostname, info.port);
        Ok(Self { pool })
    }
}

pub struct PgTransaction<'a> {
    tx: Transaction<'a, sqlx::Postgres>,
}

pub struct PgAutocommit {
    pool: sqlx::PgPool,
}

#[async_trait]
impl<'a> PlanStoreTransaction for PgTransaction<'a> {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(queries::convert_error)
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.map_err(queries::convert_error)
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    type Transaction = PgTransaction<'static>;
    type Autocommit = PgAutocommit;

    async fn begin(&self) -> Result<Self::Transaction> {
        let tx = self.pool.begin().await.map_err(queries::convert_error)?;
        Ok(PgTransaction { tx })
    }

    fn auto(&self) -> Self::Autocommit {
        PgAutocommit {
            pool: self.pool.clone(),
        }
    }

    async fn perform_transaction<T, F, Fut>(&self, action: F) -> Result<T>
    where
        T: Send,
        F: Send + FnOnce(&mut Self::Transaction) -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        let tx = self.pool.begin().await.map_err(queries::convert_error)?;
        let mut tx = PgTransaction { tx };
        match action(&mut tx).await {
            Ok(value) => {
                tx.tx.commit().await.map_err(queries::convert_error)?;
                Ok(value)
            }
            Err(err) => {
                let _ = tx.tx.rollback().await;
                Err(err)
            }
        }
    }
}
