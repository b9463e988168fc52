// 带时效的内存缓存
//
// 通用的 TTL 键值表，过期条目在下次访问该键时惰性淘汰，没有后台清扫。
// 探测结果缓存与选择会话存储都建立在它之上。

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// 缓存条目
#[derive(Debug, Clone)]
struct TtlEntry<V> {
    value: V,
    created_at: Instant,
    ttl: Duration,
}

impl<V> TtlEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

/// 带时效的内存键值缓存
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    entries: Arc<RwLock<HashMap<K, TtlEntry<V>>>>,
    default_ttl: Duration,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            default_ttl,
        }
    }

    /// 读取未过期的值；过期条目被就地淘汰
    pub fn get(&self, key: &K) -> Option<V> {
        {
            let entries = self.entries.read().ok()?;
            let entry = entries.get(key)?;
            if !entry.is_expired() {
                return Some(entry.value.clone());
            }
        }

        self.remove(key);
        None
    }

    /// 写入，使用默认 TTL
    pub fn insert(&self, key: K, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    /// 写入，使用指定 TTL
    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, TtlEntry::new(value, ttl));
        }
    }

    /// 取出并移除未过期的值
    pub fn take(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.write().ok()?;
        let entry = entries.remove(key)?;
        if entry.is_expired() {
            None
        } else {
            Some(entry.value)
        }
    }

    pub fn remove(&self, key: &K) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
    }

    /// 淘汰所有已过期条目
    pub fn purge_expired(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, entry| !entry.is_expired());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_basic_operations() {
        let cache: TtlCache<String, String> = TtlCache::new(Duration::from_secs(1));

        cache.insert("key1".to_string(), "value1".to_string());
        assert_eq!(cache.get(&"key1".to_string()), Some("value1".to_string()));

        assert_eq!(cache.get(&"missing".to_string()), None);

        cache.remove(&"key1".to_string());
        assert_eq!(cache.get(&"key1".to_string()), None);
    }

    #[test]
    fn test_expiration_is_lazy() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_millis(50));

        cache.insert("key".to_string(), 7);
        assert_eq!(cache.len(), 1);

        thread::sleep(Duration::from_millis(80));

        // 过期条目仍占位，直到对该键的下一次访问
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"key".to_string()), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_take_removes_entry() {
        let cache: TtlCache<(i64, String), u32> = TtlCache::new(Duration::from_secs(10));

        cache.insert((1, "url".to_string()), 42);
        assert_eq!(cache.take(&(1, "url".to_string())), Some(42));
        assert_eq!(cache.take(&(1, "url".to_string())), None);
    }

    #[test]
    fn test_purge_expired() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_millis(50));

        cache.insert("old".to_string(), 1);
        cache.insert_with_ttl("fresh".to_string(), 2, Duration::from_secs(60));

        thread::sleep(Duration::from_millis(80));
        cache.purge_expired();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"fresh".to_string()), Some(2));
    }

    #[test]
    fn test_reinsert_resets_ttl() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_millis(100));

        cache.insert("key".to_string(), 1);
        thread::sleep(Duration::from_millis(60));
        cache.insert("key".to_string(), 2);
        thread::sleep(Duration::from_millis(60));

        // 第二次写入刷新了时效
        assert_eq!(cache.get(&"key".to_string()), Some(2));
    }
}
