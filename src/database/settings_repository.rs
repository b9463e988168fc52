use anyhow::Result;
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};

use crate::models::{SettingsError, SettingsUpdate, UserSettings};

// ============ 用户设置 ============
//
// 设置按用户惰性创建：查不到就返回全默认值，不落库；
// 第一次成功的更新才会写入行。

/// 读取用户设置（缺省时返回默认值）
pub async fn get_user_settings(pool: &Pool<Sqlite>, user_id: i64) -> Result<UserSettings> {
    let row = sqlx::query(
        r#"SELECT min_quality, max_quality, min_size_mb, max_size_mb, quick_mode_enabled
           FROM user_settings WHERE user_id = ?"#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(UserSettings::defaults(user_id));
    };

    Ok(UserSettings {
        user_id,
        min_quality: row.get("min_quality"),
        max_quality: row.get("max_quality"),
        min_size_mb: row.get("min_size_mb"),
        max_size_mb: row.get("max_size_mb"),
        quick_mode_enabled: row.get("quick_mode_enabled"),
    })
}

/// 更新用户设置（部分字段）
///
/// 合并后的设置要通过 min ≤ max 校验；校验失败时同步拒绝，
/// 库中的原值保持不变，错误里指明应调整的边界。
pub async fn update_user_settings(
    pool: &Pool<Sqlite>,
    user_id: i64,
    update: &SettingsUpdate,
) -> Result<UserSettings, UpdateError> {
    let current = get_user_settings(pool, user_id)
        .await
        .map_err(UpdateError::Database)?;

    let next = current.apply(update)?;

    sqlx::query(
        r#"INSERT INTO user_settings
           (user_id, min_quality, max_quality, min_size_mb, max_size_mb, quick_mode_enabled, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?)
           ON CONFLICT(user_id) DO UPDATE SET
               min_quality = excluded.min_quality,
               max_quality = excluded.max_quality,
               min_size_mb = excluded.min_size_mb,
               max_size_mb = excluded.max_size_mb,
               quick_mode_enabled = excluded.quick_mode_enabled,
               updated_at = excluded.updated_at"#,
    )
    .bind(user_id)
    .bind(&next.min_quality)
    .bind(&next.max_quality)
    .bind(next.min_size_mb)
    .bind(next.max_size_mb)
    .bind(next.quick_mode_enabled)
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(|e| UpdateError::Database(e.into()))?;

    Ok(next)
}

/// 清空用户设置（恢复默认）
pub async fn clear_user_settings(pool: &Pool<Sqlite>, user_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM user_settings WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// 设置更新的失败原因
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error(transparent)]
    Invalid(#[from] SettingsError),

    #[error("数据库错误: {0}")]
    Database(anyhow::Error),
}
