// 格式目录构建器 - 规整提供方上报的原始格式列表
//
// 提供方的格式列表嘈杂且常有重复：同一 format_id 重复上报、
// 预览图元数据伪装成视频流、视频轨与音频轨分开投递等。
// 本模块把原始列表规整为去重、排好序的视频/音频两份目录。

use std::collections::HashSet;

use tracing::debug;

use crate::models::{FormatCatalog, FormatEntry, MediaKind, QualityTier, RawFormat};

/// 合理的视频高度范围，范围之外的按预览/缩略图元数据丢弃
const MIN_SANE_HEIGHT: u32 = 240;
const MAX_SANE_HEIGHT: u32 = 4320;

/// 格式目录构建器
#[derive(Clone, Copy)]
pub struct CatalogBuilder;

impl CatalogBuilder {
    /// 从原始格式列表构建目录
    ///
    /// 步骤：
    /// 1. 按 format_id 丢弃真重复（提供方会重复上报完全相同的条目）
    /// 2. 分类：带视频轨即视频（无论是否混音）；只有音频轨才算音频
    /// 3. 视频高度必须落在 [240, 4320]，档位由高度直接生成
    /// 4. 大小只取上报值，未知记 0，绝不按码率×时长估算
    /// 5. 视频降序排序（档位 > 已混音 > mp4 > 上报大小），每档只留最优一条
    /// 6. 音频按码率降序，m4a 并列优先
    pub fn build(title: &str, duration_secs: u64, raw_formats: &[RawFormat]) -> FormatCatalog {
        let mut seen_ids: HashSet<&str> = HashSet::new();
        let mut video: Vec<FormatEntry> = Vec::new();
        let mut audio: Vec<FormatEntry> = Vec::new();

        for raw in raw_formats {
            if raw.format_id.is_empty() || !seen_ids.insert(raw.format_id.as_str()) {
                continue;
            }

            if raw.has_video_track() {
                let Some(height) = raw.height else {
                    continue;
                };
                if !(MIN_SANE_HEIGHT..=MAX_SANE_HEIGHT).contains(&height) {
                    debug!(
                        format_id = %raw.format_id,
                        height, "Discarding video format with implausible height"
                    );
                    continue;
                }

                video.push(FormatEntry {
                    format_id: raw.format_id.clone(),
                    kind: MediaKind::Video,
                    quality: QualityTier::Height(height),
                    ext: raw.ext.clone().unwrap_or_default(),
                    filesize: raw.reported_size(),
                    has_audio: raw.has_audio_track(),
                    abr_kbps: 0.0,
                });
            } else if raw.has_audio_track() {
                audio.push(FormatEntry {
                    format_id: raw.format_id.clone(),
                    kind: MediaKind::Audio,
                    quality: QualityTier::Unknown,
                    ext: raw.ext.clone().unwrap_or_default(),
                    filesize: raw.reported_size(),
                    has_audio: true,
                    abr_kbps: raw.abr.unwrap_or(0.0),
                });
            }
        }

        video.sort_by(|a, b| Self::video_rank(b).cmp(&Self::video_rank(a)));
        Self::dedup_video_by_tier(&mut video);

        audio.sort_by(|a, b| Self::audio_rank(b).partial_cmp(&Self::audio_rank(a)).unwrap_or(std::cmp::Ordering::Equal));

        debug!(
            title,
            video_count = video.len(),
            audio_count = audio.len(),
            "Built format catalog"
        );

        FormatCatalog {
            title: title.to_string(),
            duration_secs,
            video,
            audio,
        }
    }

    /// 视频排序键，降序使用
    ///
    /// 同档位并列时：已混音优先于纯视频轨，mp4 优先于其他容器，
    /// 最后以上报大小作为质量代理（大者优先）。
    fn video_rank(entry: &FormatEntry) -> (u32, bool, bool, u64) {
        (
            entry.quality.height().unwrap_or(0),
            entry.has_audio,
            entry.ext == "mp4",
            entry.filesize,
        )
    }

    /// 音频排序键，降序使用
    fn audio_rank(entry: &FormatEntry) -> (f64, u8) {
        (entry.abr_kbps, u8::from(entry.ext == "m4a"))
    }

    /// 每个清晰度档位只保留排序后最靠前的一条
    fn dedup_video_by_tier(video: &mut Vec<FormatEntry>) {
        let mut seen_tiers: HashSet<u32> = HashSet::new();
        video.retain(|entry| match entry.quality.height() {
            Some(h) => seen_tiers.insert(h),
            None => false,
        });
    }
}
