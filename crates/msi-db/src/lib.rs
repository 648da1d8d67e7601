use anyhow::{bail, Context, Result};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};

mod index_tables;
mod links;

pub use index_tables::{ensure_index_tables, swap_index_tables};
pub use links::{delete_links, fetch_links_for_stock, process_stock_links, save_links};

pub const ENV_DB_URL: &str = "MSI_DATABASE_URL";

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Connection settings read from canonical config JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbSettings {
    /// Name of the env var holding the database URL (never the URL itself).
    pub url_env: String,
    pub max_connections: u32,
}

impl Default for DbSettings {
    fn default() -> Self {
        Self {
            url_env: ENV_DB_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl DbSettings {
    /// Optional:
    /// - database.url_env (string); default=MSI_DATABASE_URL
    /// - database.max_connections (1..=100); default=10
    pub fn from_config_json(cfg: &Value) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(v) = cfg.pointer("/database/url_env").filter(|v| !v.is_null()) {
            let name = v.as_str().context("database.url_env must be a string")?;
            if name.trim().is_empty() {
                bail!("database.url_env must not be empty");
            }
            settings.url_env = name.to_string();
        }

        if let Some(v) = cfg.pointer("/database/max_connections").filter(|v| !v.is_null()) {
            let n = v
                .as_u64()
                .context("database.max_connections must be a positive integer")?;
            if !(1..=100).contains(&n) {
                bail!("database.max_connections out of bounds (1..=100): {n}");
            }
            settings.max_connections = n as u32;
        }

        Ok(settings)
    }
}

/// Connect to Postgres using the URL in `settings.url_env`.
pub async fn connect(settings: &DbSettings) -> Result<PgPool> {
    let url = std::env::var(&settings.url_env)
        .with_context(|| format!("missing env var {}", settings.url_env))?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Connect to Postgres using MSI_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    connect(&DbSettings::default()).await
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_link_table: bool,
}

/// Connectivity + schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema = 'public' and table_name = 'inventory_stock_source_link'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_link_table: exists,
    })
}
