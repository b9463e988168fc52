// 格式目录数据模型
//
// 定义提供方上报的原始流描述符（RawFormat）以及规整后的
// 格式条目（FormatEntry）与格式目录（FormatCatalog）。

use serde::{Deserialize, Serialize};

use super::quality::{MediaKind, QualityTier};

/// 提供方上报的原始流描述符
///
/// 字段与 yt-dlp 的 `-J` 输出对应，提供方经常缺字段或重复上报，
/// 规整工作由 `services::catalog_builder` 完成。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFormat {
    /// 提供方分配的格式标识（单次探测内唯一）
    #[serde(default)]
    pub format_id: String,

    /// 容器/扩展名（mp4、webm、m4a…）
    #[serde(default)]
    pub ext: Option<String>,

    /// 视频编码标签（"none" 表示无视频轨）
    #[serde(default)]
    pub vcodec: Option<String>,

    /// 音频编码标签（"none" 表示无音频轨）
    #[serde(default)]
    pub acodec: Option<String>,

    /// 视频像素高度
    #[serde(default)]
    pub height: Option<u32>,

    /// 上报文件大小（字节）
    #[serde(default)]
    pub filesize: Option<u64>,

    /// 上报的近似文件大小（字节）
    #[serde(default)]
    pub filesize_approx: Option<u64>,

    /// 音频码率（kbps）
    #[serde(default)]
    pub abr: Option<f64>,
}

impl RawFormat {
    /// 是否带视频轨
    pub fn has_video_track(&self) -> bool {
        matches!(&self.vcodec, Some(v) if !v.is_empty() && v != "none")
    }

    /// 是否带音频轨
    pub fn has_audio_track(&self) -> bool {
        matches!(&self.acodec, Some(a) if !a.is_empty() && a != "none")
    }

    /// 上报大小（字节）；未知时为 0
    ///
    /// 大小绝不从码率×时长估算——未知就是未知。
    pub fn reported_size(&self) -> u64 {
        self.filesize.or(self.filesize_approx).unwrap_or(0)
    }
}

/// 一个可交付的流选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatEntry {
    /// 提供方格式标识（仅在单次选择会话内有效，不进入持久缓存）
    pub format_id: String,

    /// 媒体类型
    pub kind: MediaKind,

    /// 清晰度档位（音频条目为 Unknown，显示为 "audio-only"）
    pub quality: QualityTier,

    /// 容器/扩展名（仅作并列时的偏好依据，mp4/m4a 优先）
    pub ext: String,

    /// 上报大小（字节），0 表示未知
    pub filesize: u64,

    /// 视频条目：是否已混入音频轨
    pub has_audio: bool,

    /// 音频条目：码率（kbps），仅用于音频排序
    pub abr_kbps: f64,
}

impl FormatEntry {
    /// 缓存键中使用的清晰度标签
    pub fn quality_label(&self) -> String {
        match self.kind {
            MediaKind::Video => self.quality.to_string(),
            MediaKind::Audio => "audio-only".to_string(),
        }
    }

    /// 上报大小（MB）；未知时为 0.0
    pub fn filesize_mb(&self) -> f64 {
        self.filesize as f64 / (1024.0 * 1024.0)
    }
}

/// 规整后的格式目录
///
/// 每次探测生成一份，由探测结果缓存按 URL 短期记忆；
/// 选择与缓存子系统只读取它。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatCatalog {
    /// 视频标题
    pub title: String,

    /// 时长（秒）
    pub duration_secs: u64,

    /// 视频选项，按清晰度降序，每档至多一条
    pub video: Vec<FormatEntry>,

    /// 音频选项，按码率降序
    pub audio: Vec<FormatEntry>,
}

impl FormatCatalog {
    /// 目录是否没有任何可选条目
    pub fn is_empty(&self) -> bool {
        self.video.is_empty() && self.audio.is_empty()
    }

    /// 按格式标识查找条目
    pub fn find(&self, format_id: &str) -> Option<&FormatEntry> {
        self.video
            .iter()
            .chain(self.audio.iter())
            .find(|e| e.format_id == format_id)
    }
}
