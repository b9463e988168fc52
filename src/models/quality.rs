// 清晰度等级 - 视频质量档位与媒体类型
//
// 本模块定义视频清晰度档位（按像素高度排序）和媒体类型，用于：
// - 解析用户或提供方上报的清晰度字符串（"720p"、"1080p" 等）
// - 档位之间的比较与区间判断
// - 缓存复合键中的媒体类型标识（video / audio）

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 视频清晰度档位
///
/// 档位由像素高度决定（240p、360p、480p、720p、1080p…），比较按高度进行，
/// 而不是按字符串顺序。无法识别的字符串归为 `Unknown`：
/// 它不参与比较（`compare` 返回 `None`），并且总是通过区间检查——
/// 这是对提供方异常数据的宽容策略，属于刻意设计。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityTier {
    /// 已知清晰度（像素高度，如 720 表示 720p）
    Height(u32),

    /// 无法识别的清晰度
    Unknown,
}

impl QualityTier {
    /// 从字符串解析清晰度档位
    ///
    /// 支持 "720p"、"720P"、"720" 等形式；其余任何字符串（包括 "auto"）
    /// 解析为 `Unknown`。
    pub fn parse(s: &str) -> Self {
        let normalized = s.trim().trim_end_matches(['p', 'P']);

        match normalized.parse::<u32>() {
            Ok(height) if height > 0 => QualityTier::Height(height),
            _ => QualityTier::Unknown,
        }
    }

    /// 两个档位的比较
    ///
    /// 任一方为 `Unknown` 时不可比较，返回 `None`。
    pub fn compare(a: QualityTier, b: QualityTier) -> Option<Ordering> {
        match (a, b) {
            (QualityTier::Height(ha), QualityTier::Height(hb)) => Some(ha.cmp(&hb)),
            _ => None,
        }
    }

    /// 判断档位是否落在 [min, max] 区间内
    ///
    /// - 未设置的边界视为不限制
    /// - `Unknown` 档位或 `Unknown` 边界总是通过（宽容策略）
    pub fn within(self, min: Option<QualityTier>, max: Option<QualityTier>) -> bool {
        let above_min = match min {
            Some(m) => !matches!(Self::compare(self, m), Some(Ordering::Less)),
            None => true,
        };
        let below_max = match max {
            Some(m) => !matches!(Self::compare(self, m), Some(Ordering::Greater)),
            None => true,
        };

        above_min && below_max
    }

    /// 档位的像素高度（`Unknown` 返回 None）
    pub fn height(self) -> Option<u32> {
        match self {
            QualityTier::Height(h) => Some(h),
            QualityTier::Unknown => None,
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityTier::Height(h) => write!(f, "{}p", h),
            QualityTier::Unknown => write!(f, "unknown"),
        }
    }
}

/// 媒体类型
///
/// 缓存复合键的第三个分量，持久化为 "video" / "audio"。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Video,
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            _ => Err(format!("Invalid media kind: {}", s)),
        }
    }
}
