use crate::downloader::dirs::ensure_directories;
use crate::downloader::error::{SnapError, SnapResult};
use crate::downloader::path::{PathResolver, SizeVariant};
use crate::photo::PhotoDescriptor;
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// 已存在文件的最小有效大小（字节）
///
/// 小于等于该值的文件视为之前失败或截断的下载，需要重新获取
pub const DEFAULT_MIN_VALID_SIZE: u64 = 100;

/// 单个 worker（或整次运行）的计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    /// 新下载的文件数
    pub downloaded: u64,
    /// 本地已存在而跳过的文件数
    pub skipped: u64,
    /// 失败数（标识符无效、文件系统错误、远程获取失败）
    pub failed: u64,
}

impl WorkerStats {
    pub fn processed(&self) -> u64 {
        self.downloaded + self.skipped + self.failed
    }
}

impl AddAssign for WorkerStats {
    fn add_assign(&mut self, other: Self) {
        self.downloaded += other.downloaded;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

impl std::iter::Sum for WorkerStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut acc, s| {
            acc += s;
            acc
        })
    }
}

/// 单条照片的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded,
    Skipped,
}

/// 下载 worker
///
/// 按顺序处理分配到的一段照片；单条失败只记录日志，不影响后续照片
#[derive(Debug, Clone)]
pub struct DownloadWorker {
    /// worker 编号（仅用于日志）
    index: usize,
    client: Client,
    resolver: Arc<PathResolver>,
    variant: SizeVariant,
    min_valid_size: u64,
}

impl DownloadWorker {
    pub fn new(
        index: usize,
        client: Client,
        resolver: Arc<PathResolver>,
        variant: SizeVariant,
        min_valid_size: u64,
    ) -> Self {
        Self {
            index,
            client,
            resolver,
            variant,
            min_valid_size,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// 处理整个分片
    pub async fn run(&self, partition: &[PhotoDescriptor]) -> WorkerStats {
        let mut stats = WorkerStats::default();

        debug!("[worker{}] 开始处理 {} 张照片", self.index, partition.len());

        for photo in partition {
            match self.fetch_one(photo).await {
                Ok(FetchOutcome::Downloaded) => stats.downloaded += 1,
                Ok(FetchOutcome::Skipped) => stats.skipped += 1,
                Err(e) => {
                    warn!("[worker{}] 照片 {} 处理失败: {}", self.index, photo.id, e);
                    stats.failed += 1;
                }
            }
        }

        debug!(
            "[worker{}] 完成: 下载 {}, 跳过 {}, 失败 {}",
            self.index, stats.downloaded, stats.skipped, stats.failed
        );
        stats
    }

    /// 处理单条照片
    pub async fn fetch_one(&self, photo: &PhotoDescriptor) -> SnapResult<FetchOutcome> {
        let local_path = self.resolver.local_path(photo, self.variant)?;

        if self.is_present(&local_path).await {
            return Ok(FetchOutcome::Skipped);
        }

        ensure_directories(&local_path).await?;

        let url = self.resolver.remote_url(photo, self.variant);
        let bytes = self.download_to(&url, &local_path).await?;

        debug!(
            "[worker{}] {} --> {:?} ({} bytes, {})",
            self.index,
            url,
            local_path,
            bytes,
            photo.title().unwrap_or("-")
        );
        Ok(FetchOutcome::Downloaded)
    }

    /// 文件存在且大于最小有效大小
    async fn is_present(&self, path: &Path) -> bool {
        match tokio::fs::metadata(path).await {
            Ok(meta) => meta.is_file() && meta.len() > self.min_valid_size,
            Err(_) => false,
        }
    }

    /// 下载到临时文件后重命名，避免半截文件被当作已完成
    async fn download_to(&self, url: &str, path: &Path) -> SnapResult<u64> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SnapError::RemoteFetch {
                url: url.to_string(),
                status: None,
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SnapError::RemoteFetch {
                url: url.to_string(),
                status: Some(status.as_u16()),
                message: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let temp_path = temp_path_for(path);
        let result = write_body(url, resp, &temp_path).await;

        let written = match result {
            Ok(n) => n,
            Err(e) => {
                let _ = tokio::fs::remove_file(&temp_path).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&temp_path, path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(SnapError::filesystem(path, e));
        }

        Ok(written)
    }
}

/// 同目录下的唯一临时文件名：`<file>.<uuid>.part`
fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.{}.part", file_name, Uuid::new_v4().simple()))
}

/// 流式写入响应体
async fn write_body(url: &str, resp: reqwest::Response, temp_path: &Path) -> SnapResult<u64> {
    let mut file = File::create(temp_path)
        .await
        .map_err(|e| SnapError::filesystem(temp_path, e))?;

    let mut stream = resp.bytes_stream();
    let mut total = 0u64;

    while let Some(chunk) = stream.next().await {
        let data = chunk.map_err(|e| SnapError::RemoteFetch {
            url: url.to_string(),
            status: None,
            message: format!("读取数据流失败: {}", e),
        })?;
        file.write_all(&data)
            .await
            .map_err(|e| SnapError::filesystem(temp_path, e))?;
        total += data.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| SnapError::filesystem(temp_path, e))?;

    Ok(total)
}
