// 约束评估器 - 判断单个格式条目是否满足用户约束
//
// 清晰度约束只对视频生效（音频没有可比的档位）；
// 大小约束对两种类型都生效。未设置的边界不构成限制。
// 上报大小为 0 表示"未知"：未知大小同时通过最小与最大边界——
// 既然无从得知真实大小，最小边界对它无法可靠执行，
// 与其悄悄拒掉本来有效的条目，不如放行（刻意的宽容策略）。

use crate::models::{FormatEntry, MediaKind, UserSettings};

pub use crate::models::settings::validate_quality_bounds as validate_bounds;

/// 判断条目是否满足用户的全部约束
pub fn matches(entry: &FormatEntry, settings: &UserSettings) -> bool {
    if entry.kind == MediaKind::Video
        && !entry
            .quality
            .within(settings.min_quality_tier(), settings.max_quality_tier())
    {
        return false;
    }

    size_within(entry.filesize_mb(), settings.min_size_mb, settings.max_size_mb)
}

/// 大小区间检查（MB）
///
/// `size_mb == 0.0` 表示未知，通过所有边界。
fn size_within(size_mb: f64, min_mb: Option<i64>, max_mb: Option<i64>) -> bool {
    if size_mb == 0.0 {
        return true;
    }

    if let Some(min) = min_mb {
        if size_mb < min as f64 {
            return false;
        }
    }
    if let Some(max) = max_mb {
        if size_mb > max as f64 {
            return false;
        }
    }

    true
}
