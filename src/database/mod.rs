use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use std::str::FromStr;

pub mod cache_repository;
pub mod schema;
pub mod settings_repository;

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    pub async fn new() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:./video_cache.db?mode=rwc".to_string());

        tracing::info!("Connecting to database: {}", database_url);

        // 配置 SQLite 连接选项
        let connect_options = SqliteConnectOptions::from_str(&database_url)?
            .busy_timeout(std::time::Duration::from_secs(30)); // 设置忙等待超时

        // SQLite 单写入者，限制为1个连接以避免锁定问题
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connect_options)
            .await?;

        Self::with_pool(pool).await
    }

    /// 在给定连接池上初始化（测试用内存库走这里）
    pub async fn with_pool(pool: Pool<Sqlite>) -> Result<Self> {
        // 初始化 schema（必要时从旧的单键结构迁移）
        schema::init_schema(&pool).await?;
        schema::verify_schema(&pool).await?;

        let stats = cache_repository::get_cache_stats(&pool).await?;
        tracing::info!("Cache ready with {} entries", stats.total_cached);

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}
