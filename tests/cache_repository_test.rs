// 缓存与设置存储集成测试
//
// 在内存 SQLite 上验证复合键缓存的查/填/覆盖、兼容回退、
// 旧结构迁移以及用户设置的校验语义。

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};

use video_bot_backend::database::{cache_repository, schema, settings_repository, Database};
use video_bot_backend::models::{MediaKind, SettingsUpdate};

/// 单连接的内存库（与生产配置一致，单写入者）
async fn memory_pool() -> Pool<Sqlite> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

async fn ready_pool() -> Pool<Sqlite> {
    let pool = memory_pool().await;
    Database::with_pool(pool.clone()).await.unwrap();
    pool
}

#[tokio::test]
async fn test_put_then_get_exact_round_trip() {
    let pool = ready_pool().await;

    cache_repository::put(
        &pool,
        "https://youtu.be/abc",
        "720p",
        MediaKind::Video,
        "file-1",
        Some("Test Video"),
        Some(212),
        Some(10_000_000),
    )
    .await
    .unwrap();

    let entry = cache_repository::get_exact(&pool, "https://youtu.be/abc", "720p", MediaKind::Video)
        .await
        .unwrap()
        .expect("entry should exist");

    assert_eq!(entry.file_id, "file-1");
    assert_eq!(entry.title.as_deref(), Some("Test Video"));
    assert_eq!(entry.duration, Some(212));
    assert_eq!(entry.file_size, Some(10_000_000));
    // 命中刷新访问时间
    assert!(entry.last_accessed >= entry.created_at);
}

#[tokio::test]
async fn test_compound_key_isolates_quality_and_type() {
    let pool = ready_pool().await;
    let url = "https://youtu.be/abc";

    cache_repository::put(&pool, url, "720p", MediaKind::Video, "v720", None, None, None)
        .await
        .unwrap();
    cache_repository::put(&pool, url, "1080p", MediaKind::Video, "v1080", None, None, None)
        .await
        .unwrap();
    cache_repository::put(&pool, url, "audio-only", MediaKind::Audio, "a1", None, None, None)
        .await
        .unwrap();

    // 同一 URL 下三个键互不干扰
    let v720 = cache_repository::get_exact(&pool, url, "720p", MediaKind::Video)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(v720.file_id, "v720");

    let audio = cache_repository::get_exact(&pool, url, "audio-only", MediaKind::Audio)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(audio.file_id, "a1");

    // 不存在的键不会串到别的清晰度
    let miss = cache_repository::get_exact(&pool, url, "480p", MediaKind::Video)
        .await
        .unwrap();
    assert!(miss.is_none());
}

#[tokio::test]
async fn test_put_same_key_overwrites_in_place() {
    let pool = ready_pool().await;
    let url = "https://youtu.be/abc";

    cache_repository::put(&pool, url, "720p", MediaKind::Video, "old", Some("Old"), None, None)
        .await
        .unwrap();
    cache_repository::put(&pool, url, "720p", MediaKind::Video, "new", Some("New"), None, None)
        .await
        .unwrap();

    let entry = cache_repository::get_exact(&pool, url, "720p", MediaKind::Video)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.file_id, "new");
    assert_eq!(entry.title.as_deref(), Some("New"));

    // 覆盖而非新增：同键只有一行
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM video_cache WHERE url = ?")
        .bind(url)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_get_any_returns_most_recently_accessed() {
    let pool = ready_pool().await;
    let url = "https://youtu.be/abc";

    cache_repository::put(&pool, url, "480p", MediaKind::Video, "v480", Some("A"), None, None)
        .await
        .unwrap();
    cache_repository::put(&pool, url, "1080p", MediaKind::Video, "v1080", Some("B"), None, None)
        .await
        .unwrap();

    // 访问 480p 条目把它推到最近
    cache_repository::get_exact(&pool, url, "480p", MediaKind::Video)
        .await
        .unwrap();

    let (file_id, _title) = cache_repository::get_any(&pool, url)
        .await
        .unwrap()
        .expect("some entry should exist");
    assert_eq!(file_id, "v480");
}

#[tokio::test]
async fn test_legacy_fallback_finds_auto_entry() {
    let pool = ready_pool().await;
    let url = "https://youtu.be/legacy";

    // 历史条目以 ('auto', 'video') 默认键存在
    cache_repository::put(&pool, url, "auto", MediaKind::Video, "legacy-1", Some("Old clip"), None, None)
        .await
        .unwrap();

    // 精确键未命中
    let exact = cache_repository::get_exact(&pool, url, "720p", MediaKind::Video)
        .await
        .unwrap();
    assert!(exact.is_none());

    // 兼容回退命中
    let (file_id, title) = cache_repository::get_any(&pool, url).await.unwrap().unwrap();
    assert_eq!(file_id, "legacy-1");
    assert_eq!(title.as_deref(), Some("Old clip"));
}

#[tokio::test]
async fn test_single_key_schema_migrates_to_compound() {
    let pool = memory_pool().await;

    // 手工搭一个旧的单键结构
    sqlx::query(
        r#"CREATE TABLE video_cache (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL UNIQUE,
            file_id TEXT NOT NULL,
            title TEXT,
            duration INTEGER,
            file_size INTEGER,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            last_accessed TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )"#,
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO video_cache (url, file_id, title) VALUES (?, ?, ?)")
        .bind("https://youtu.be/old")
        .bind("migrated-1")
        .bind("Old video")
        .execute(&pool)
        .await
        .unwrap();

    schema::init_schema(&pool).await.unwrap();
    schema::verify_schema(&pool).await.unwrap();

    // 历史行带着默认键迁入新表
    let row = sqlx::query("SELECT quality, format_type, file_id FROM video_cache WHERE url = ?")
        .bind("https://youtu.be/old")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.get::<String, _>("quality"), "auto");
    assert_eq!(row.get::<String, _>("format_type"), "video");
    assert_eq!(row.get::<String, _>("file_id"), "migrated-1");

    // 备份表保留
    let backup =
        sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name='video_cache_old'")
            .fetch_optional(&pool)
            .await
            .unwrap();
    assert!(backup.is_some());

    // 迁入行的时间戳被改写成仓库层绑定的格式，
    // 而不是 SQLite 默认的 'YYYY-MM-DD HH:MM:SS'（恰好 19 个字符）
    let ts: String = sqlx::query_scalar("SELECT last_accessed FROM video_cache WHERE url = ?")
        .bind("https://youtu.be/old")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(ts.len() > 19, "timestamp not rebound: {ts}");

    // 迁入行与新写入的行在 MRU 排序下可比：后写入的更新
    cache_repository::put(
        &pool,
        "https://youtu.be/old",
        "720p",
        MediaKind::Video,
        "fresh-1",
        None,
        None,
        None,
    )
    .await
    .unwrap();
    let (mru, _) = cache_repository::get_any(&pool, "https://youtu.be/old")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mru, "fresh-1");

    // 再跑一次是幂等的
    schema::init_schema(&pool).await.unwrap();
}

#[tokio::test]
async fn test_cache_stats_counts_by_dimension() {
    let pool = ready_pool().await;

    cache_repository::put(&pool, "u1", "720p", MediaKind::Video, "f1", None, None, None)
        .await
        .unwrap();
    cache_repository::put(&pool, "u2", "720p", MediaKind::Video, "f2", None, None, None)
        .await
        .unwrap();
    cache_repository::put(&pool, "u3", "audio-only", MediaKind::Audio, "f3", None, None, None)
        .await
        .unwrap();

    let stats = cache_repository::get_cache_stats(&pool).await.unwrap();
    assert_eq!(stats.total_cached, 3);
    assert_eq!(stats.by_format.get("video"), Some(&2));
    assert_eq!(stats.by_format.get("audio"), Some(&1));
    assert_eq!(stats.by_quality.get("720p"), Some(&2));
}

#[tokio::test]
async fn test_settings_default_then_update_then_clear() {
    let pool = ready_pool().await;

    // 未写入过的用户拿到默认值
    let defaults = settings_repository::get_user_settings(&pool, 7).await.unwrap();
    assert!(!defaults.has_constraints());
    assert!(!defaults.quick_mode_enabled);

    let updated = settings_repository::update_user_settings(
        &pool,
        7,
        &SettingsUpdate {
            max_quality: Some("720p".to_string()),
            max_size_mb: Some(50),
            quick_mode_enabled: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.max_quality.as_deref(), Some("720p"));
    assert!(updated.quick_mode_enabled);

    // 持久化生效
    let reloaded = settings_repository::get_user_settings(&pool, 7).await.unwrap();
    assert_eq!(reloaded.max_size_mb, Some(50));

    settings_repository::clear_user_settings(&pool, 7).await.unwrap();
    let cleared = settings_repository::get_user_settings(&pool, 7).await.unwrap();
    assert!(!cleared.has_constraints());
}

#[tokio::test]
async fn test_invalid_constraint_rejected_and_prior_kept() {
    let pool = ready_pool().await;

    settings_repository::update_user_settings(
        &pool,
        9,
        &SettingsUpdate {
            max_quality: Some("480p".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    // min > max 的写入被同步拒绝
    let err = settings_repository::update_user_settings(
        &pool,
        9,
        &SettingsUpdate {
            min_quality: Some("1080p".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, settings_repository::UpdateError::Invalid(_)));

    // 库中原值保持不变
    let kept = settings_repository::get_user_settings(&pool, 9).await.unwrap();
    assert_eq!(kept.max_quality.as_deref(), Some("480p"));
    assert!(kept.min_quality.is_none());
}
