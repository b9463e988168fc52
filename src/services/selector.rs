// 最优匹配选择器 - 在目录中挑出满足约束的单个最优条目
//
// 先在视频列表里找满足约束的最高档位条目；没有则退到音频列表
// （已按码率排序）取第一条；再没有则报告无匹配，由调用方
// 展示完整目录让用户手动选择。

use tracing::debug;

use crate::models::{FormatCatalog, FormatEntry, UserSettings};
use crate::services::matcher;

/// 在目录中选出满足约束的最优条目
///
/// 视频列表由构建器排好（档位降序，档内并列已裁决），
/// 因此第一条满足约束的就是最优视频；并列由目录顺序决定。
pub fn select_best<'a>(
    catalog: &'a FormatCatalog,
    settings: &UserSettings,
) -> Option<&'a FormatEntry> {
    if let Some(entry) = catalog
        .video
        .iter()
        .find(|entry| matcher::matches(entry, settings))
    {
        debug!(format_id = %entry.format_id, quality = %entry.quality, "Best match is a video entry");
        return Some(entry);
    }

    if let Some(entry) = catalog
        .audio
        .iter()
        .find(|entry| matcher::matches(entry, settings))
    {
        debug!(format_id = %entry.format_id, "Best match fell back to an audio entry");
        return Some(entry);
    }

    debug!("No catalog entry satisfies the active constraints");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaKind, QualityTier};

    const MB: u64 = 1024 * 1024;

    fn video(id: &str, height: u32, size: u64) -> FormatEntry {
        FormatEntry {
            format_id: id.to_string(),
            kind: MediaKind::Video,
            quality: QualityTier::Height(height),
            ext: "mp4".to_string(),
            filesize: size,
            has_audio: true,
            abr_kbps: 0.0,
        }
    }

    fn audio(id: &str, abr: f64) -> FormatEntry {
        FormatEntry {
            format_id: id.to_string(),
            kind: MediaKind::Audio,
            quality: QualityTier::Unknown,
            ext: "m4a".to_string(),
            filesize: 0,
            has_audio: false,
            abr_kbps: abr,
        }
    }

    /// 典型目录：1080p 大小未知、720p 40MB、480p 10MB
    fn sample_catalog() -> FormatCatalog {
        FormatCatalog {
            title: "t".to_string(),
            duration_secs: 100,
            video: vec![
                video("v1080", 1080, 0),
                video("v720", 720, 40 * MB),
                video("v480", 480, 10 * MB),
            ],
            audio: vec![audio("a-hi", 160.0), audio("a-lo", 64.0)],
        }
    }

    #[test]
    fn test_highest_acceptable_video_wins() {
        let catalog = sample_catalog();
        let settings = UserSettings {
            max_quality: Some("720p".to_string()),
            max_size_mb: Some(50),
            ..UserSettings::defaults(1)
        };

        // 1080p 被清晰度上限排除（即便大小未知），应选中 720p
        let best = select_best(&catalog, &settings).unwrap();
        assert_eq!(best.format_id, "v720");
    }

    #[test]
    fn test_unconstrained_picks_top_of_catalog() {
        let catalog = sample_catalog();
        let best = select_best(&catalog, &UserSettings::defaults(1)).unwrap();
        assert_eq!(best.format_id, "v1080");
    }

    #[test]
    fn test_min_size_with_unknown_size_leniency() {
        // min_size_mb=60：720p(40MB)、480p(10MB) 被拒，
        // 1080p 大小未知，按宽容策略通过最小边界并被选中
        let catalog = sample_catalog();
        let settings = UserSettings {
            min_size_mb: Some(60),
            ..UserSettings::defaults(1)
        };

        let best = select_best(&catalog, &settings).unwrap();
        assert_eq!(best.format_id, "v1080");
    }

    #[test]
    fn test_no_match_when_all_sizes_known() {
        // 所有大小已知且都低于最小边界时才是真正的无匹配
        let catalog = FormatCatalog {
            title: "t".to_string(),
            duration_secs: 100,
            video: vec![video("v720", 720, 40 * MB), video("v480", 480, 10 * MB)],
            audio: vec![],
        };
        let settings = UserSettings {
            min_size_mb: Some(60),
            ..UserSettings::defaults(1)
        };

        assert!(select_best(&catalog, &settings).is_none());
    }

    #[test]
    fn test_audio_fallback_when_no_video_matches() {
        let catalog = FormatCatalog {
            title: "t".to_string(),
            duration_secs: 100,
            video: vec![video("v2160", 2160, 0)],
            audio: vec![audio("a-hi", 160.0), audio("a-lo", 64.0)],
        };
        let settings = UserSettings {
            max_quality: Some("1080p".to_string()),
            ..UserSettings::defaults(1)
        };

        // 视频全部超出上限，退回码率最高的音频
        let best = select_best(&catalog, &settings).unwrap();
        assert_eq!(best.format_id, "a-hi");
    }

    #[test]
    fn test_empty_catalog_no_match() {
        let catalog = FormatCatalog::default();
        assert!(select_best(&catalog, &UserSettings::defaults(1)).is_none());
    }
}
