// URL 检测器 - 识别消息中的视频链接
//
// 判断用户发来的文本是否是受支持的视频 URL，
// 支持 youtube.com/watch、youtu.be、embed、/v/ 四种形式。

use regex::Regex;
use std::sync::OnceLock;

/// URL 检测器
#[derive(Clone, Copy)]
pub struct UrlDetector;

impl UrlDetector {
    /// 检测文本是否包含受支持的视频 URL
    pub fn is_video_url(text: &str) -> bool {
        static VIDEO_URL_REGEX: OnceLock<Regex> = OnceLock::new();

        let regex = VIDEO_URL_REGEX.get_or_init(|| {
            Regex::new(
                r"(?:https?://)?(?:www\.)?(?:youtube\.com/(?:watch\?v=|embed/|v/)[\w-]+|youtu\.be/[\w-]+)",
            )
            .expect("视频 URL 正则表达式编译失败")
        });

        regex.is_match(text)
    }
}
