// 抓取协作方 - 通过外部 yt-dlp 探测与下载媒体
//
// 探测（probe）用 `-J` 拿到标题/时长/原始格式列表；
// 下载（fetch）按格式选择串抓取到本地临时目录。
// 两者都受硬性墙钟超时约束：要么完成、要么超时、要么失败，
// 绝不挂起，结果只报告一次。

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::models::RawFormat;

/// 抓取超时默认值（秒）
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 300;

/// 探测超时默认值（秒）
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 60;

/// 抓取相关错误
#[derive(Debug, Error)]
pub enum FetchError {
    /// 提供方没有返回任何可用信息
    #[error("提供方无可用信息")]
    Unavailable,

    #[error("抓取超时")]
    TimedOut,

    #[error("抓取失败: {0}")]
    Failed(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("探测输出解析失败: {0}")]
    MalformedProbeOutput(#[from] serde_json::Error),
}

/// 一次探测的结果
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub title: String,
    pub duration_secs: u64,
    pub formats: Vec<RawFormat>,
}

/// 抓取时的格式选择
#[derive(Debug, Clone, PartialEq)]
pub enum FetchSelection {
    /// 按提供方格式标识抓取；纯视频轨需要混入最优音频
    FormatId { id: String, mux_audio: bool },

    /// 默认路径：不超过 720p 的最优混流
    Default,
}

impl FetchSelection {
    /// 生成提供方的格式选择串
    pub fn format_spec(&self) -> String {
        match self {
            FetchSelection::FormatId { id, mux_audio } => {
                if *mux_audio {
                    format!("{id}+bestaudio/{id}")
                } else {
                    id.clone()
                }
            }
            FetchSelection::Default => "best[height<=720]".to_string(),
        }
    }
}

/// 抓取到的本地制品
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub local_path: PathBuf,

    /// 包含制品与元数据文件的临时目录，投递结束后由调用方整体删除
    pub scratch_dir: PathBuf,

    pub title: String,
    pub duration_secs: Option<u64>,
    pub file_size: u64,
}

/// 抓取协作方接口
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// 探测可用格式（不下载）
    async fn probe(&self, url: &str) -> Result<ProbeResult, FetchError>;

    /// 按选择串抓取到本地
    async fn fetch(&self, url: &str, selection: &FetchSelection) -> Result<FetchedMedia, FetchError>;
}

/// 探测输出的顶层结构（yt-dlp `-J`）
#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    formats: Option<Vec<RawFormat>>,
}

/// 下载附带的元数据文件（`--write-info-json`）
#[derive(Debug, Deserialize)]
struct InfoJson {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

/// 可识别为媒体制品的扩展名
const MEDIA_EXTENSIONS: &[&str] = &["mp4", "webm", "mkv", "avi", "m4a", "mp3", "opus"];

/// 基于 yt-dlp 子进程的抓取实现
pub struct YtDlpFetcher {
    program: PathBuf,
    probe_timeout: Duration,
    fetch_timeout: Duration,
}

impl YtDlpFetcher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }

    pub fn with_timeouts(mut self, probe: Duration, fetch: Duration) -> Self {
        self.probe_timeout = probe;
        self.fetch_timeout = fetch;
        self
    }

    /// 运行子进程并施加墙钟超时；超时的子进程随 future 一起被终止
    async fn run(&self, args: &[&str], timeout: Duration) -> Result<std::process::Output, FetchError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).kill_on_drop(true);

        debug!(program = %self.program.display(), ?args, "Running fetch tool");

        match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!(?args, "Fetch tool timed out");
                Err(FetchError::TimedOut)
            }
        }
    }

    /// 在临时目录里找出下载产物与元数据文件
    fn scan_scratch_dir(dir: &Path) -> Result<(Option<PathBuf>, Option<PathBuf>), FetchError> {
        let mut media_file = None;
        let mut info_file = None;

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

            if name.ends_with(".info.json") {
                info_file = Some(path);
            } else if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                if MEDIA_EXTENSIONS.contains(&ext) {
                    media_file = Some(path);
                }
            }
        }

        Ok((media_file, info_file))
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn probe(&self, url: &str) -> Result<ProbeResult, FetchError> {
        let output = self
            .run(&["-J", "--no-playlist", url], self.probe_timeout)
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(url, "Probe failed: {}", stderr.trim());
            return Err(FetchError::Unavailable);
        }

        let parsed: ProbeOutput = serde_json::from_slice(&output.stdout)?;
        let formats = parsed.formats.unwrap_or_default();

        if formats.is_empty() {
            return Err(FetchError::Unavailable);
        }

        Ok(ProbeResult {
            title: parsed.title.unwrap_or_else(|| "Unknown".to_string()),
            duration_secs: parsed.duration.unwrap_or(0.0) as u64,
            formats,
        })
    }

    async fn fetch(&self, url: &str, selection: &FetchSelection) -> Result<FetchedMedia, FetchError> {
        // 失败路径靠 TempDir 守卫自动清理；成功时目录随制品
        // 一起交出，由调用方在投递结束后整体删除
        let scratch = tempfile::tempdir()?;
        let template = scratch.path().join("%(title)s.%(ext)s");
        let spec = selection.format_spec();

        let output = self
            .run(
                &[
                    "--format",
                    &spec,
                    "--output",
                    template.to_str().unwrap_or("%(title)s.%(ext)s"),
                    "--no-playlist",
                    "--write-info-json",
                    url,
                ],
                self.fetch_timeout,
            )
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::Failed(stderr.trim().to_string()));
        }

        let (media_file, info_file) = Self::scan_scratch_dir(scratch.path())?;
        let Some(local_path) = media_file else {
            return Err(FetchError::Failed(
                "下载完成但未找到媒体文件".to_string(),
            ));
        };

        let file_size = std::fs::metadata(&local_path)?.len();

        // 标题/时长优先取元数据文件，取不到就用文件名
        let mut title = local_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Unknown")
            .to_string();
        let mut duration_secs = None;

        if let Some(info_path) = info_file {
            match std::fs::read(&info_path).map(|bytes| serde_json::from_slice::<InfoJson>(&bytes)) {
                Ok(Ok(info)) => {
                    if let Some(t) = info.title {
                        title = t;
                    }
                    duration_secs = info.duration.map(|d| d as u64);
                }
                _ => warn!(path = %info_path.display(), "Could not parse info file"),
            }
        }

        info!(url, %spec, size = file_size, "Fetched media artifact");

        // 脱离守卫，清理责任转交调用方
        let scratch_dir = scratch.into_path();

        Ok(FetchedMedia {
            local_path,
            scratch_dir,
            title,
            duration_secs,
            file_size,
        })
    }
}
