// 用户偏好设置
//
// 每个用户一份，首次访问时以全默认值惰性创建，可逐字段更新、可整体清空。
// 写入时强制校验 min ≤ max（清晰度与大小各一对），违反的写入被拒绝，
// 原值保留，并告知用户应调整哪个边界。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::quality::QualityTier;

/// 设置写入校验错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("min_quality ({min}) exceeds max_quality ({max}); adjust one of the quality bounds")]
    QualityBoundsInverted { min: String, max: String },

    #[error("min_size_mb ({min}) exceeds max_size_mb ({max}); adjust one of the size bounds")]
    SizeBoundsInverted { min: i64, max: i64 },
}

/// 用户设置
///
/// 清晰度边界以原始字符串存储（与数据库一致），比较时再解析；
/// 无法识别的字符串按宽容策略不构成限制。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: i64,
    pub min_quality: Option<String>,
    pub max_quality: Option<String>,
    pub min_size_mb: Option<i64>,
    pub max_size_mb: Option<i64>,
    pub quick_mode_enabled: bool,
}

impl UserSettings {
    /// 全默认设置
    pub fn defaults(user_id: i64) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }

    /// 是否设置了任何约束（快速模式只有在有约束时才有意义）
    pub fn has_constraints(&self) -> bool {
        self.min_quality.is_some()
            || self.max_quality.is_some()
            || self.min_size_mb.is_some()
            || self.max_size_mb.is_some()
    }

    /// 解析后的最低清晰度边界
    pub fn min_quality_tier(&self) -> Option<QualityTier> {
        self.min_quality.as_deref().map(QualityTier::parse)
    }

    /// 解析后的最高清晰度边界
    pub fn max_quality_tier(&self) -> Option<QualityTier> {
        self.max_quality.as_deref().map(QualityTier::parse)
    }

    /// 应用部分更新并校验边界一致性
    ///
    /// 每个被更新的边界都要与另一侧的既有边界联合校验；
    /// 校验失败时返回错误，调用方保留原值。
    pub fn apply(&self, update: &SettingsUpdate) -> Result<UserSettings, SettingsError> {
        let mut next = self.clone();

        if let Some(ref v) = update.min_quality {
            next.min_quality = Some(v.clone());
        }
        if let Some(ref v) = update.max_quality {
            next.max_quality = Some(v.clone());
        }
        if let Some(v) = update.min_size_mb {
            next.min_size_mb = Some(v);
        }
        if let Some(v) = update.max_size_mb {
            next.max_size_mb = Some(v);
        }
        if let Some(v) = update.quick_mode_enabled {
            next.quick_mode_enabled = v;
        }

        next.validate()?;
        Ok(next)
    }

    /// 校验 min ≤ max 不变量
    pub fn validate(&self) -> Result<(), SettingsError> {
        if let (Some(min), Some(max)) = (&self.min_quality, &self.max_quality) {
            if !validate_quality_bounds(
                Some(QualityTier::parse(min)),
                Some(QualityTier::parse(max)),
            ) {
                return Err(SettingsError::QualityBoundsInverted {
                    min: min.clone(),
                    max: max.clone(),
                });
            }
        }

        if let (Some(min), Some(max)) = (self.min_size_mb, self.max_size_mb) {
            if min > max {
                return Err(SettingsError::SizeBoundsInverted { min, max });
            }
        }

        Ok(())
    }
}

/// 类型化的部分更新
///
/// 每个字段都是可选的；`Some` 表示本次写入该字段。
/// 相比开放的键值包，这让边界一致性检查在更新入口处
/// 就能拿到完整的类型信息。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    pub min_quality: Option<String>,
    pub max_quality: Option<String>,
    pub min_size_mb: Option<i64>,
    pub max_size_mb: Option<i64>,
    pub quick_mode_enabled: Option<bool>,
}

/// 校验一对清晰度边界是否一致
///
/// 任一侧未设置、相等、或任一侧无法识别（不可比较）都视为有效；
/// 仅当两侧都可比较且 min 严格大于 max 时拒绝。
pub fn validate_quality_bounds(min: Option<QualityTier>, max: Option<QualityTier>) -> bool {
    match (min, max) {
        (Some(lo), Some(hi)) => !matches!(
            QualityTier::compare(lo, hi),
            Some(std::cmp::Ordering::Greater)
        ),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_unset() {
        let s = UserSettings::defaults(42);
        assert_eq!(s.user_id, 42);
        assert!(!s.has_constraints());
        assert!(!s.quick_mode_enabled);
    }

    #[test]
    fn test_apply_partial_update() {
        let s = UserSettings::defaults(1);
        let next = s
            .apply(&SettingsUpdate {
                max_quality: Some("720p".to_string()),
                quick_mode_enabled: Some(true),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(next.max_quality.as_deref(), Some("720p"));
        assert!(next.quick_mode_enabled);
        assert!(next.min_quality.is_none());
        assert!(next.has_constraints());
    }

    #[test]
    fn test_inverted_quality_bounds_rejected() {
        let s = UserSettings {
            max_quality: Some("480p".to_string()),
            ..UserSettings::defaults(1)
        };

        // 新写入的 min 要对照既有的 max 校验
        let err = s
            .apply(&SettingsUpdate {
                min_quality: Some("1080p".to_string()),
                ..Default::default()
            })
            .unwrap_err();

        assert_eq!(
            err,
            SettingsError::QualityBoundsInverted {
                min: "1080p".to_string(),
                max: "480p".to_string(),
            }
        );
    }

    #[test]
    fn test_inverted_size_bounds_rejected() {
        let s = UserSettings {
            min_size_mb: Some(100),
            ..UserSettings::defaults(1)
        };

        let err = s
            .apply(&SettingsUpdate {
                max_size_mb: Some(10),
                ..Default::default()
            })
            .unwrap_err();

        assert_eq!(err, SettingsError::SizeBoundsInverted { min: 100, max: 10 });
    }

    #[test]
    fn test_unknown_quality_never_rejected() {
        // 无法识别的档位不可比较，按有效处理
        assert!(validate_quality_bounds(
            Some(QualityTier::Unknown),
            Some(QualityTier::Height(240))
        ));
        assert!(validate_quality_bounds(
            Some(QualityTier::Height(4320)),
            Some(QualityTier::Unknown)
        ));
    }

    #[test]
    fn test_equal_bounds_valid() {
        assert!(validate_quality_bounds(
            Some(QualityTier::Height(720)),
            Some(QualityTier::Height(720))
        ));

        let s = UserSettings {
            min_size_mb: Some(50),
            max_size_mb: Some(50),
            ..UserSettings::defaults(1)
        };
        assert!(s.validate().is_ok());
    }
}
