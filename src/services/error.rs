// 服务层错误类型定义
//
// 所有错误都局限于单次用户交互，不会使进程失败；
// 抓取不做自动重试，由用户重新发起。

use thiserror::Error;

use crate::external::delivery::DeliveryError;
use crate::external::fetcher::FetchError;
use crate::models::SettingsError;

/// 下载服务的统一错误类型
#[derive(Debug, Error)]
pub enum ServiceError {
    /// 提供方没有返回任何可用的格式信息；调用方回退到默认抓取路径
    #[error("提供方未返回可用的格式信息")]
    DetectionUnavailable,

    /// 没有条目满足当前约束；调用方改为展示完整目录
    #[error("没有格式满足当前约束")]
    NoMatchingFormat,

    /// 所选格式标识在当前目录中不存在（会话过期或标识失效）
    #[error("所选格式不存在或会话已过期: {0}")]
    UnknownSelection(String),

    /// 制品超出传输层大小上限
    #[error("文件过大: {size_mb}MB，上限 {limit_mb}MB")]
    ArtifactTooLarge { size_mb: u64, limit_mb: u64 },

    /// 设置写入违反 min ≤ max 不变量
    #[error("无效约束: {0}")]
    InvalidConstraint(#[from] SettingsError),

    #[error("抓取失败: {0}")]
    Fetch(#[from] FetchError),

    #[error("投递失败: {0}")]
    Delivery(DeliveryError),

    #[error("数据库错误: {0}")]
    Database(anyhow::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}
