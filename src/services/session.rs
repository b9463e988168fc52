// 选择会话存储
//
// 在"展示选项"与"用户点选"之间暂存格式目录。显式地以 (user_id, url)
// 作键，而不是进程级全局状态：不同用户的并发请求互不可见，
// 条目在选中、取消或超时后消失，不会无限增长。

use std::sync::Arc;
use std::time::Duration;

use crate::models::FormatCatalog;
use crate::services::ttl_cache::TtlCache;

/// 会话默认存活时间（秒）
pub const DEFAULT_SESSION_TTL_SECS: u64 = 600;

/// 选择会话存储
#[derive(Debug, Clone)]
pub struct SessionStore {
    pending: TtlCache<(i64, String), Arc<FormatCatalog>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: TtlCache::new(ttl),
        }
    }

    /// 暂存一份待选目录
    pub fn stash(&self, user_id: i64, url: &str, catalog: Arc<FormatCatalog>) {
        self.pending.insert((user_id, url.to_string()), catalog);
    }

    /// 取出并结束会话（选中即清除）
    pub fn take(&self, user_id: i64, url: &str) -> Option<Arc<FormatCatalog>> {
        self.pending.take(&(user_id, url.to_string()))
    }

    /// 查看但不结束会话（渲染选项时使用）
    pub fn peek(&self, user_id: i64, url: &str) -> Option<Arc<FormatCatalog>> {
        self.pending.get(&(user_id, url.to_string()))
    }

    /// 取消会话
    pub fn cancel(&self, user_id: i64, url: &str) {
        self.pending.remove(&(user_id, url.to_string()));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_SESSION_TTL_SECS))
    }
}
