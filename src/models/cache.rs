// 缓存条目数据模型
//
// 复合键缓存的一行：(url, quality, format_type) 唯一对应一个
// 已成功投递的媒体制品引用（file_id）。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;

/// 复合键缓存条目
///
/// `file_id` 是传输层签发的不透明投递句柄，可用于免重新上传的即时再投递。
/// 首次成功投递时创建；同键再次写入时就地覆盖（键身份不变）；
/// 每次成功读取都会刷新 `last_accessed`。
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,

    /// 清晰度标签（如 "720p"；无指定选择的默认路径为 "auto"）
    pub quality: String,

    /// 媒体类型（"video" / "audio"）
    pub format_type: String,

    /// 投递句柄
    pub file_id: String,

    pub title: Option<String>,

    /// 时长（秒）
    pub duration: Option<i64>,

    /// 文件大小（字节）
    pub file_size: Option<i64>,

    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

/// 缓存统计信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// 缓存条目总数
    pub total_cached: i64,

    /// 按媒体类型的分布
    pub by_format: HashMap<String, i64>,

    /// 按清晰度标签的分布
    pub by_quality: HashMap<String, i64>,
}
