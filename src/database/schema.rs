use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

/// 初始化数据库 schema
///
/// 三种情况：
/// - 表不存在：直接建复合键结构
/// - 旧的单键结构（缺 quality / format_type 列）：迁移
/// - 已是复合键结构：跳过
pub async fn init_schema(pool: &Pool<Sqlite>) -> Result<()> {
    let columns = table_columns(pool, "video_cache").await?;

    if columns.is_empty() {
        create_compound_schema(pool).await?;
    } else if !columns.iter().any(|c| c == "quality")
        || !columns.iter().any(|c| c == "format_type")
    {
        migrate_to_compound_schema(pool).await?;
    }

    create_user_settings_table(pool).await?;
    Ok(())
}

/// 读取表的列名（表不存在时为空）
async fn table_columns(pool: &Pool<Sqlite>, table: &str) -> Result<Vec<String>> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(|row| row.get::<String, _>("name")).collect())
}

/// 创建复合键缓存表与索引
async fn create_compound_schema(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS video_cache (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL,
            quality TEXT DEFAULT 'auto',
            format_type TEXT DEFAULT 'video',
            file_id TEXT NOT NULL,
            title TEXT,
            duration INTEGER,
            file_size INTEGER,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            last_accessed TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(url, quality, format_type)
        )"#,
    )
    .execute(pool)
    .await?;

    // 复合键查找用索引，外加按 URL 的二级索引供兼容路径使用
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_url_quality_format ON video_cache(url, quality, format_type)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_url ON video_cache(url)")
        .execute(pool)
        .await?;

    Ok(())
}

/// 从旧的单键结构迁移到复合键结构
///
/// 旧表改名备份，历史行以 ('auto', 'video') 默认键迁入新表；
/// 备份表保留，不自动删除。
async fn migrate_to_compound_schema(pool: &Pool<Sqlite>) -> Result<()> {
    tracing::info!("Migrating video_cache schema to compound-key version...");

    // 已经迁移过的库直接跳过
    let backup_exists =
        sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name='video_cache_old'")
            .fetch_optional(pool)
            .await?;
    if backup_exists.is_some() {
        tracing::info!("Migration already completed");
        return Ok(());
    }

    sqlx::query("ALTER TABLE video_cache RENAME TO video_cache_old")
        .execute(pool)
        .await?;

    create_compound_schema(pool).await?;

    sqlx::query(
        r#"INSERT INTO video_cache
           (url, quality, format_type, file_id, title, duration, file_size, created_at, last_accessed)
           SELECT url, 'auto', 'video', file_id, title, duration, file_size, created_at, last_accessed
           FROM video_cache_old"#,
    )
    .execute(pool)
    .await?;

    normalize_migrated_timestamps(pool).await?;

    tracing::info!("Database migration completed successfully");
    Ok(())
}

/// 把迁入行的时间戳改写成仓库层绑定的文本格式
///
/// 旧行带的是 SQLite 的 'YYYY-MM-DD HH:MM:SS' 文本，与新写入的格式混在
/// 一张表里会让 `ORDER BY last_accessed` 的字符串比较偏离时间顺序。
/// 读出再经 sqlx 重新绑定，保证两种来源的行共用同一种文本形式。
async fn normalize_migrated_timestamps(pool: &Pool<Sqlite>) -> Result<()> {
    let rows: Vec<(i64, Option<DateTime<Utc>>, Option<DateTime<Utc>>)> =
        sqlx::query_as("SELECT id, created_at, last_accessed FROM video_cache")
            .fetch_all(pool)
            .await?;

    for (id, created_at, last_accessed) in rows {
        sqlx::query("UPDATE video_cache SET created_at = ?, last_accessed = ? WHERE id = ?")
            .bind(created_at)
            .bind(last_accessed)
            .bind(id)
            .execute(pool)
            .await?;
    }

    Ok(())
}

/// 创建用户设置表
async fn create_user_settings_table(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS user_settings (
            user_id INTEGER PRIMARY KEY,
            min_quality TEXT,
            max_quality TEXT,
            min_size_mb INTEGER,
            max_size_mb INTEGER,
            quick_mode_enabled BOOLEAN DEFAULT 0,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_user_settings ON user_settings(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// 验证数据库schema完整性
pub async fn verify_schema(pool: &Pool<Sqlite>) -> Result<()> {
    let required_tables = vec!["video_cache", "user_settings"];

    for table in required_tables {
        let exists = sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name=?")
            .bind(table)
            .fetch_optional(pool)
            .await?;

        if exists.is_none() {
            return Err(anyhow::anyhow!("Required table '{}' does not exist", table));
        }
    }

    let required_indexes = vec!["idx_url_quality_format", "idx_url", "idx_user_settings"];

    for index in required_indexes {
        let exists = sqlx::query("SELECT name FROM sqlite_master WHERE type='index' AND name=?")
            .bind(index)
            .fetch_optional(pool)
            .await?;

        if exists.is_none() {
            return Err(anyhow::anyhow!("Required index '{}' does not exist", index));
        }
    }

    tracing::info!("Database schema verification completed successfully");
    Ok(())
}
