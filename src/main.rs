// 命令行入口 - 基于标准输入的交互循环
//
// 每行输入要么是一个视频 URL，要么是一条命令。
// 实际的聊天接入层可以替换这里，核心逻辑都在库里。

use std::io::{BufRead, Write as _};
use std::sync::Arc;
use std::time::Duration;

use video_bot_backend::database::Database;
use video_bot_backend::external::{LocalDelivery, YtDlpFetcher, DEFAULT_MAX_FILE_SIZE};
use video_bot_backend::models::SettingsUpdate;
use video_bot_backend::services::{
    DetectionCache, DownloadService, ServiceError, UrlDetector, UrlOutcome,
};

/// 单用户命令行会话的固定用户标识
const CLI_USER_ID: i64 = 0;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize database
    let database = Database::new().await?;

    // Initialize fetch tool
    let ytdlp_path = std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string());
    let fetch_timeout: u64 = std::env::var("FETCH_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(300);
    let fetcher = YtDlpFetcher::new(&ytdlp_path)
        .with_timeouts(Duration::from_secs(60), Duration::from_secs(fetch_timeout));

    // Initialize delivery transport
    let delivery_dir = std::env::var("DELIVERY_DIR").unwrap_or_else(|_| "./delivered".to_string());
    let max_upload: u64 = std::env::var("MAX_UPLOAD_MB")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(|mb: u64| mb * 1024 * 1024)
        .unwrap_or(DEFAULT_MAX_FILE_SIZE);
    let delivery = LocalDelivery::new(&delivery_dir).with_max_file_size(max_upload);

    let detection_ttl: u64 = std::env::var("DETECTION_TTL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(300);

    let service =
        DownloadService::new(database.pool().clone(), Arc::new(fetcher), Arc::new(delivery))
            .with_detection_cache(DetectionCache::new(Duration::from_secs(detection_ttl)));

    tracing::info!("🚀 Video bot ready (delivery dir: {})", delivery_dir);
    println!("发送视频链接开始下载；/help 查看命令");

    let stdin = std::io::stdin();
    let mut last_url: Option<String> = None;

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_whitespace().collect::<Vec<_>>().as_slice() {
            ["/help"] => print_help(),
            ["/stats"] => match service.cache_stats().await {
                Ok(stats) => {
                    println!("缓存条目: {}", stats.total_cached);
                    for (kind, count) in &stats.by_format {
                        println!("  {}: {}", kind, count);
                    }
                    for (quality, count) in &stats.by_quality {
                        println!("  {}: {}", quality, count);
                    }
                }
                Err(e) => println!("错误: {}", e),
            },
            ["/settings"] => match service.get_settings(CLI_USER_ID).await {
                Ok(s) => println!(
                    "min_quality={:?} max_quality={:?} min_size_mb={:?} max_size_mb={:?} quick_mode={}",
                    s.min_quality, s.max_quality, s.min_size_mb, s.max_size_mb, s.quick_mode_enabled
                ),
                Err(e) => println!("错误: {}", e),
            },
            ["/settings", field, value] => {
                let update = match settings_update(field, value) {
                    Some(update) => update,
                    None => {
                        println!("未知设置项: {}", field);
                        continue;
                    }
                };
                match service.update_settings(CLI_USER_ID, &update).await {
                    Ok(_) => println!("已更新"),
                    Err(e) => println!("错误: {}", e),
                }
            }
            ["/clear"] => match service.clear_settings(CLI_USER_ID).await {
                Ok(()) => println!("设置已恢复默认"),
                Err(e) => println!("错误: {}", e),
            },
            ["/quick", state @ ("on" | "off")] => {
                let update = SettingsUpdate {
                    quick_mode_enabled: Some(*state == "on"),
                    ..Default::default()
                };
                match service.update_settings(CLI_USER_ID, &update).await {
                    Ok(s) => println!("快速模式: {}", s.quick_mode_enabled),
                    Err(e) => println!("错误: {}", e),
                }
            }
            ["/cancel"] => {
                if let Some(url) = &last_url {
                    service.cancel_selection(CLI_USER_ID, url);
                    println!("已取消");
                }
            }
            ["pick", format_id] => {
                let Some(url) = last_url.clone() else {
                    println!("先发送一个视频链接");
                    continue;
                };
                match service.handle_selection(CLI_USER_ID, &url, format_id).await {
                    Ok(d) => report_delivered(&d.title, &d.file_id, d.from_cache),
                    Err(e) => println!("错误: {}", e),
                }
            }
            [url] if UrlDetector::is_video_url(url) => {
                last_url = Some(url.to_string());
                match service.handle_url(CLI_USER_ID, url).await {
                    Ok(UrlOutcome::Delivered(d)) => {
                        report_delivered(&d.title, &d.file_id, d.from_cache)
                    }
                    Ok(UrlOutcome::ChoicesReady(catalog)) => print_choices(&catalog),
                    Err(ServiceError::NoMatchingFormat) => {
                        println!("没有格式满足当前约束，可手动选择：");
                        if let Some(catalog) = service.pending_choices(CLI_USER_ID, url) {
                            print_choices(&catalog);
                        }
                    }
                    Err(e) => println!("错误: {}", e),
                }
            }
            _ => println!("无法识别的输入；/help 查看命令"),
        }
    }

    Ok(())
}

fn print_help() {
    println!("命令:");
    println!("  <视频链接>                    探测格式并下载");
    println!("  pick <format_id>             从上一次的目录中选择");
    println!("  /settings                    查看当前设置");
    println!("  /settings <项> <值>          更新设置 (min_quality/max_quality/min_size/max_size)");
    println!("  /quick on|off                开关快速模式");
    println!("  /clear                       恢复默认设置");
    println!("  /stats                       查看缓存统计");
    println!("  /cancel                      取消待选会话");
}

fn settings_update(field: &str, value: &str) -> Option<SettingsUpdate> {
    let mut update = SettingsUpdate::default();
    match field {
        "min_quality" => update.min_quality = Some(value.to_string()),
        "max_quality" => update.max_quality = Some(value.to_string()),
        "min_size" => update.min_size_mb = Some(value.parse().ok()?),
        "max_size" => update.max_size_mb = Some(value.parse().ok()?),
        _ => return None,
    }
    Some(update)
}

fn print_choices(catalog: &video_bot_backend::models::FormatCatalog) {
    println!("{} — 可选格式:", catalog.title);
    for entry in &catalog.video {
        println!(
            "  pick {:<8} {} {} {:.1}MB{}",
            entry.format_id,
            entry.quality_label(),
            entry.ext,
            entry.filesize_mb(),
            if entry.has_audio { "" } else { " (需混音)" }
        );
    }
    for entry in &catalog.audio {
        println!(
            "  pick {:<8} audio {} {:.0}kbps",
            entry.format_id, entry.ext, entry.abr_kbps
        );
    }
}

fn report_delivered(title: &str, file_id: &str, from_cache: bool) {
    if from_cache {
        println!("⚡ 缓存命中，即时投递: {} -> {}", title, file_id);
    } else {
        println!("✅ 已下载并投递: {} -> {}", title, file_id);
    }
}
