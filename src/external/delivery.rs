// 投递协作方 - 把本地制品上传给最终用户所在的传输层
//
// 上传成功后返回不透明的投递句柄（file_id），之后可凭句柄免上传
// 再投递。传输层有固定的制品大小上限，超限的制品在上传前就被拒绝。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::MediaKind;

/// 传输层默认大小上限（50MB）
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// 投递相关错误
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// 先前缓存的投递句柄被传输层拒绝
    #[error("投递句柄已失效")]
    StaleHandle,

    #[error("传输层错误: {0}")]
    Transport(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 投递协作方接口
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// 传输层的制品大小上限（字节）
    fn max_file_size(&self) -> u64;

    /// 上传本地制品，返回可复用的投递句柄
    async fn upload(&self, path: &Path, title: &str, kind: MediaKind)
        -> Result<String, DeliveryError>;

    /// 凭句柄再投递，句柄失效时返回 `StaleHandle`
    async fn redeliver(&self, file_id: &str) -> Result<(), DeliveryError>;
}

/// 文件系统投递实现
///
/// 自带二进制的本地替身：把制品拷入投递目录，以目标路径为句柄；
/// 再投递只要求句柄指向的文件仍然存在。
pub struct LocalDelivery {
    root: PathBuf,
    max_file_size: u64,
}

impl LocalDelivery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    pub fn with_max_file_size(mut self, max: u64) -> Self {
        self.max_file_size = max;
        self
    }
}

#[async_trait]
impl DeliveryTransport for LocalDelivery {
    fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    async fn upload(
        &self,
        path: &Path,
        title: &str,
        kind: MediaKind,
    ) -> Result<String, DeliveryError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let file_name = path
            .file_name()
            .ok_or_else(|| DeliveryError::Transport("制品路径没有文件名".to_string()))?;
        let dest = self.root.join(file_name);

        tokio::fs::copy(path, &dest).await?;
        info!(%title, %kind, dest = %dest.display(), "Delivered artifact");

        Ok(dest.to_string_lossy().into_owned())
    }

    async fn redeliver(&self, file_id: &str) -> Result<(), DeliveryError> {
        if tokio::fs::try_exists(file_id).await? {
            debug!(file_id, "Redelivered from existing handle");
            Ok(())
        } else {
            Err(DeliveryError::StaleHandle)
        }
    }
}
