use anyhow::Result;
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};

use crate::models::{CacheEntry, CacheStats, MediaKind};

// ============ 复合键缓存 ============
//
// 一个 (url, quality, format_type) 复合键至多对应一行。
// 精确查找永远先于按 URL 的兼容回退；两者在命中时都刷新 last_accessed。

/// 精确键查找
///
/// 命中时刷新 `last_accessed` 并返回完整条目（含大小/时长，供说明文字使用）。
pub async fn get_exact(
    pool: &Pool<Sqlite>,
    url: &str,
    quality: &str,
    kind: MediaKind,
) -> Result<Option<CacheEntry>> {
    let entry: Option<CacheEntry> = sqlx::query_as(
        r#"SELECT url, quality, format_type, file_id, title, duration, file_size,
                  created_at, last_accessed
           FROM video_cache
           WHERE url = ? AND quality = ? AND format_type = ?"#,
    )
    .bind(url)
    .bind(quality)
    .bind(kind.to_string())
    .fetch_optional(pool)
    .await?;

    let Some(mut entry) = entry else {
        return Ok(None);
    };

    let now = Utc::now();
    sqlx::query(
        "UPDATE video_cache SET last_accessed = ? WHERE url = ? AND quality = ? AND format_type = ?",
    )
    .bind(now)
    .bind(url)
    .bind(quality)
    .bind(kind.to_string())
    .execute(pool)
    .await?;
    entry.last_accessed = now;

    Ok(Some(entry))
}

/// 按 URL 的兼容回退查找
///
/// 返回该 URL 下最近访问的任意清晰度/类型条目的 (file_id, title)。
/// 只为历史上的单键条目而存在，新写入一律走复合键路径。
pub async fn get_any(pool: &Pool<Sqlite>, url: &str) -> Result<Option<(String, Option<String>)>> {
    let row = sqlx::query(
        r#"SELECT file_id, title, quality, format_type FROM video_cache
           WHERE url = ?
           ORDER BY last_accessed DESC
           LIMIT 1"#,
    )
    .bind(url)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let file_id: String = row.get("file_id");
    let title: Option<String> = row.get("title");
    let quality: String = row.get("quality");
    let format_type: String = row.get("format_type");

    // 命中的行刷新访问时间
    sqlx::query(
        "UPDATE video_cache SET last_accessed = ? WHERE url = ? AND quality = ? AND format_type = ?",
    )
    .bind(Utc::now())
    .bind(url)
    .bind(&quality)
    .bind(&format_type)
    .execute(pool)
    .await?;

    Ok(Some((file_id, title)))
}

/// 写入/覆盖缓存条目
///
/// 同键已存在时就地覆盖（句柄、标题、时长、大小与两个时间戳），
/// 键身份不变；冲突子句保证同键并发写入的原子性（后写胜出）。
#[allow(clippy::too_many_arguments)]
pub async fn put(
    pool: &Pool<Sqlite>,
    url: &str,
    quality: &str,
    kind: MediaKind,
    file_id: &str,
    title: Option<&str>,
    duration: Option<i64>,
    file_size: Option<i64>,
) -> Result<()> {
    let now = Utc::now();

    sqlx::query(
        r#"INSERT INTO video_cache
           (url, quality, format_type, file_id, title, duration, file_size, created_at, last_accessed)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
           ON CONFLICT(url, quality, format_type) DO UPDATE SET
               file_id = excluded.file_id,
               title = excluded.title,
               duration = excluded.duration,
               file_size = excluded.file_size,
               created_at = excluded.created_at,
               last_accessed = excluded.last_accessed"#,
    )
    .bind(url)
    .bind(quality)
    .bind(kind.to_string())
    .bind(file_id)
    .bind(title)
    .bind(duration)
    .bind(file_size)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// 缓存统计：总数与按类型/清晰度的分布
pub async fn get_cache_stats(pool: &Pool<Sqlite>) -> Result<CacheStats> {
    let total_cached: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM video_cache")
        .fetch_one(pool)
        .await?;

    let mut stats = CacheStats {
        total_cached,
        ..Default::default()
    };

    let format_rows =
        sqlx::query("SELECT format_type, COUNT(*) as count FROM video_cache GROUP BY format_type")
            .fetch_all(pool)
            .await?;
    for row in format_rows {
        stats
            .by_format
            .insert(row.get::<String, _>("format_type"), row.get::<i64, _>("count"));
    }

    let quality_rows =
        sqlx::query("SELECT quality, COUNT(*) as count FROM video_cache GROUP BY quality")
            .fetch_all(pool)
            .await?;
    for row in quality_rows {
        stats
            .by_quality
            .insert(row.get::<String, _>("quality"), row.get::<i64, _>("count"));
    }

    Ok(stats)
}
