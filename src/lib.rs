// 视频下载后端库
//
// 本库提供视频下载机器人的核心功能，包括：
// - 格式探测与目录构建
// - 质量/大小约束匹配与自动选择
// - 复合键缓存（url + quality + format_type）
// - 用户设置存储

pub mod database;
pub mod external;
pub mod models;
pub mod services;
