// 下载服务 - 协调缓存、探测、选择与投递
//
// 控制流：URL 进入 → 探测结果缓存返回记忆的目录，或触发一次探测与
// 目录构建 → 开了快速模式且有约束时由选择器自动挑选，并对该精确键
// 走缓存查/填；否则目录进入选择会话等用户点选，点选后走同一条
// 缓存查/填路径。所有失败都局限于本次交互。

use std::sync::Arc;

use sqlx::{Pool, Sqlite};
use tracing::{info, warn};

use crate::database::{cache_repository, settings_repository};
use crate::external::delivery::{DeliveryError, DeliveryTransport};
use crate::external::fetcher::{FetchError, FetchSelection, MediaFetcher};
use crate::models::{
    CacheStats, FormatCatalog, FormatEntry, MediaKind, SettingsUpdate, UserSettings,
};
use crate::services::catalog_builder::CatalogBuilder;
use crate::services::detection_cache::DetectionCache;
use crate::services::error::ServiceError;
use crate::services::selector;
use crate::services::session::SessionStore;

/// 默认路径使用的清晰度标签（未做任何指定选择）
const AUTO_QUALITY: &str = "auto";

/// 一次成功投递的结果
#[derive(Debug, Clone)]
pub struct Delivered {
    /// 可复用的投递句柄
    pub file_id: String,
    pub title: String,
    /// 是否来自缓存（免抓取即时投递）
    pub from_cache: bool,
}

/// 处理一个 URL 的结果
#[derive(Debug)]
pub enum UrlOutcome {
    /// 已投递（缓存命中或快速模式自动选择）
    Delivered(Delivered),

    /// 目录已就绪，等待用户点选
    ChoicesReady(Arc<FormatCatalog>),
}

/// 下载服务
#[derive(Clone)]
pub struct DownloadService {
    pool: Pool<Sqlite>,
    fetcher: Arc<dyn MediaFetcher>,
    delivery: Arc<dyn DeliveryTransport>,
    detection_cache: DetectionCache,
    sessions: SessionStore,
}

impl DownloadService {
    pub fn new(
        pool: Pool<Sqlite>,
        fetcher: Arc<dyn MediaFetcher>,
        delivery: Arc<dyn DeliveryTransport>,
    ) -> Self {
        Self {
            pool,
            fetcher,
            delivery,
            detection_cache: DetectionCache::default(),
            sessions: SessionStore::default(),
        }
    }

    /// 替换探测结果缓存（自定义新鲜度窗口时使用）
    pub fn with_detection_cache(mut self, cache: DetectionCache) -> Self {
        self.detection_cache = cache;
        self
    }

    /// 处理用户发来的视频 URL
    ///
    /// 快速模式且设有约束时自动选择并投递；无匹配时暂存目录并报
    /// `NoMatchingFormat`，调用方用 `pending_choices` 渲染手动选择。
    /// 探测不可用时回退到默认抓取路径（"auto" 键）。
    pub async fn handle_url(&self, user_id: i64, url: &str) -> Result<UrlOutcome, ServiceError> {
        let settings = self.get_settings(user_id).await?;

        let catalog = match self.detect_formats(url).await {
            Ok(catalog) => catalog,
            Err(ServiceError::DetectionUnavailable) => {
                // 提供方没给任何可用信息：走默认抓取路径
                warn!(url, "Format detection unavailable, falling back to default fetch");
                let delivered = self
                    .deliver(url, AUTO_QUALITY, MediaKind::Video, &FetchSelection::Default, true)
                    .await?;
                return Ok(UrlOutcome::Delivered(delivered));
            }
            Err(e) => return Err(e),
        };

        if settings.quick_mode_enabled && settings.has_constraints() {
            return match selector::select_best(&catalog, &settings) {
                Some(entry) => {
                    info!(user_id, url, format_id = %entry.format_id, "Quick mode selected a format");
                    let selection = Self::selection_for(entry);
                    let delivered = self
                        .deliver(url, &entry.quality_label(), entry.kind, &selection, false)
                        .await?;
                    Ok(UrlOutcome::Delivered(delivered))
                }
                None => {
                    // 无匹配不终结交互：目录留给用户手动选择
                    self.sessions.stash(user_id, url, catalog);
                    Err(ServiceError::NoMatchingFormat)
                }
            };
        }

        self.sessions.stash(user_id, url, catalog.clone());
        Ok(UrlOutcome::ChoicesReady(catalog))
    }

    /// 处理用户对某个格式的点选
    pub async fn handle_selection(
        &self,
        user_id: i64,
        url: &str,
        format_id: &str,
    ) -> Result<Delivered, ServiceError> {
        let catalog = self
            .sessions
            .take(user_id, url)
            .ok_or_else(|| ServiceError::UnknownSelection(format_id.to_string()))?;

        let Some(entry) = catalog.find(format_id) else {
            // 标识不在目录里：会话放回去，用户可以重选
            self.sessions.stash(user_id, url, catalog.clone());
            return Err(ServiceError::UnknownSelection(format_id.to_string()));
        };

        let selection = Self::selection_for(entry);
        self.deliver(url, &entry.quality_label(), entry.kind, &selection, false)
            .await
    }

    /// 查看某个用户在某 URL 上待选的目录
    pub fn pending_choices(&self, user_id: i64, url: &str) -> Option<Arc<FormatCatalog>> {
        self.sessions.peek(user_id, url)
    }

    /// 取消待选会话
    pub fn cancel_selection(&self, user_id: i64, url: &str) {
        self.sessions.cancel(user_id, url);
    }

    /// 探测可用格式（带短期记忆）
    pub async fn detect_formats(&self, url: &str) -> Result<Arc<FormatCatalog>, ServiceError> {
        if let Some(catalog) = self.detection_cache.get(url) {
            info!(url, "Detection cache hit");
            return Ok(catalog);
        }

        let probe = self.fetcher.probe(url).await.map_err(|e| match e {
            FetchError::Unavailable => ServiceError::DetectionUnavailable,
            other => ServiceError::Fetch(other),
        })?;

        let catalog = Arc::new(CatalogBuilder::build(
            &probe.title,
            probe.duration_secs,
            &probe.formats,
        ));

        if catalog.is_empty() {
            return Err(ServiceError::DetectionUnavailable);
        }

        self.detection_cache.insert(url, catalog.clone());
        Ok(catalog)
    }

    /// 投递一个精确键的制品：先查缓存，未命中才抓取
    ///
    /// 精确查找永远先于兼容回退；失效的缓存句柄按未命中处理，
    /// 对应的缓存行只在新抓取成功后才被覆盖。
    async fn deliver(
        &self,
        url: &str,
        quality: &str,
        kind: MediaKind,
        selection: &FetchSelection,
        allow_legacy_fallback: bool,
    ) -> Result<Delivered, ServiceError> {
        // 缓存命中路径
        if let Some(entry) = cache_repository::get_exact(&self.pool, url, quality, kind)
            .await
            .map_err(ServiceError::Database)?
        {
            match self.delivery.redeliver(&entry.file_id).await {
                Ok(()) => {
                    info!(url, quality, "Cache HIT, instant redelivery");
                    return Ok(Delivered {
                        file_id: entry.file_id,
                        title: entry.title.unwrap_or_else(|| "Unknown".to_string()),
                        from_cache: true,
                    });
                }
                Err(DeliveryError::StaleHandle) => {
                    warn!(url, quality, "Cached delivery handle is stale, fetching fresh copy");
                }
                Err(e) => return Err(ServiceError::Delivery(e)),
            }
        } else if allow_legacy_fallback {
            // 历史单键条目的兼容路径
            if let Some((file_id, title)) = cache_repository::get_any(&self.pool, url)
                .await
                .map_err(ServiceError::Database)?
            {
                match self.delivery.redeliver(&file_id).await {
                    Ok(()) => {
                        info!(url, "Cache HIT via legacy lookup");
                        return Ok(Delivered {
                            file_id,
                            title: title.unwrap_or_else(|| "Unknown".to_string()),
                            from_cache: true,
                        });
                    }
                    Err(DeliveryError::StaleHandle) => {
                        warn!(url, "Legacy delivery handle is stale, fetching fresh copy");
                    }
                    Err(e) => return Err(ServiceError::Delivery(e)),
                }
            }
        }

        // 缓存未命中：抓取新副本
        info!(url, quality, spec = %selection.format_spec(), "Cache MISS, fetching");
        let fetched = self.fetcher.fetch(url, selection).await?;

        // 超限制品在上传前拒绝，抓取残留整体清掉
        let limit = self.delivery.max_file_size();
        if fetched.file_size > limit {
            Self::discard_scratch(&fetched.scratch_dir).await;
            return Err(ServiceError::ArtifactTooLarge {
                size_mb: fetched.file_size / (1024 * 1024),
                limit_mb: limit / (1024 * 1024),
            });
        }

        // 上传之后本地目录即无用，成败都不留残余
        let upload_result = self
            .delivery
            .upload(&fetched.local_path, &fetched.title, kind)
            .await;
        Self::discard_scratch(&fetched.scratch_dir).await;
        let file_id = upload_result.map_err(ServiceError::Delivery)?;

        cache_repository::put(
            &self.pool,
            url,
            quality,
            kind,
            &file_id,
            Some(&fetched.title),
            fetched.duration_secs.map(|d| d as i64),
            Some(fetched.file_size as i64),
        )
        .await
        .map_err(ServiceError::Database)?;

        info!(url, quality, %file_id, "Fetched, delivered and cached");
        Ok(Delivered {
            file_id,
            title: fetched.title,
            from_cache: false,
        })
    }

    /// 删除抓取留下的临时目录（制品与元数据文件）
    async fn discard_scratch(dir: &std::path::Path) {
        if let Err(e) = tokio::fs::remove_dir_all(dir).await {
            warn!(path = %dir.display(), "Could not clean up scratch directory: {}", e);
        }
    }

    /// 由目录条目生成抓取选择
    fn selection_for(entry: &FormatEntry) -> FetchSelection {
        FetchSelection::FormatId {
            id: entry.format_id.clone(),
            mux_audio: entry.kind == MediaKind::Video && !entry.has_audio,
        }
    }

    // ============ 设置与统计 ============

    pub async fn get_settings(&self, user_id: i64) -> Result<UserSettings, ServiceError> {
        settings_repository::get_user_settings(&self.pool, user_id)
            .await
            .map_err(ServiceError::Database)
    }

    /// 更新用户设置；违反 min ≤ max 的写入被拒绝，原值保留
    pub async fn update_settings(
        &self,
        user_id: i64,
        update: &SettingsUpdate,
    ) -> Result<UserSettings, ServiceError> {
        settings_repository::update_user_settings(&self.pool, user_id, update)
            .await
            .map_err(|e| match e {
                settings_repository::UpdateError::Invalid(e) => ServiceError::InvalidConstraint(e),
                settings_repository::UpdateError::Database(e) => ServiceError::Database(e),
            })
    }

    pub async fn clear_settings(&self, user_id: i64) -> Result<(), ServiceError> {
        settings_repository::clear_user_settings(&self.pool, user_id)
            .await
            .map_err(ServiceError::Database)
    }

    pub async fn cache_stats(&self) -> Result<CacheStats, ServiceError> {
        cache_repository::get_cache_stats(&self.pool)
            .await
            .map_err(ServiceError::Database)
    }
}
