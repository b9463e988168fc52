// 格式探测结果缓存
//
// 按 URL 短期记忆格式目录，避免一次选择会话内反复调用昂贵的探测。
// 它独立于复合键缓存，位于其上游：前者避免重复构建目录，
// 后者负责制品的长期复用。

use std::sync::Arc;
use std::time::Duration;

use crate::models::FormatCatalog;
use crate::services::ttl_cache::TtlCache;

/// 默认新鲜度窗口（秒）
pub const DEFAULT_FRESHNESS_SECS: u64 = 300;

/// 格式探测结果缓存
#[derive(Debug, Clone)]
pub struct DetectionCache {
    catalogs: TtlCache<String, Arc<FormatCatalog>>,
}

impl DetectionCache {
    pub fn new(freshness: Duration) -> Self {
        Self {
            catalogs: TtlCache::new(freshness),
        }
    }

    /// 读取窗口内的目录
    pub fn get(&self, url: &str) -> Option<Arc<FormatCatalog>> {
        self.catalogs.get(&url.to_string())
    }

    /// 记录一次探测结果
    pub fn insert(&self, url: &str, catalog: Arc<FormatCatalog>) {
        self.catalogs.insert(url.to_string(), catalog);
    }

    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }
}

impl Default for DetectionCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_FRESHNESS_SECS))
    }
}
