// 下载 worker 池
//
// 静态分片：启动时把照片列表切成至多 worker_count 段连续、互不重叠的区间，
// 每段交给一个 worker 并发处理，全部完成后汇总计数。
// 运行期间 worker 之间不共享可变状态，计数在 join 之后合并。

use crate::config::DownloadConfig;
use crate::downloader::path::{PathResolver, SizeVariant};
use crate::downloader::worker::{DownloadWorker, WorkerStats};
use crate::photo::PhotoDescriptor;
use anyhow::{Context, Result};
use reqwest::Client;
use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{error, info};

/// 默认 worker 数
pub const DEFAULT_WORKER_COUNT: usize = 8;

/// 计算分片区间
///
/// 每段大小为 ceil(len / workers)，最后一段可能更短。只返回实际需要的区间，
/// 数量不超过 min(workers, len)；`len == 0` 时返回一个空区间。
/// 保证所有区间首尾相接、覆盖 `0..len` 且互不重叠。
pub fn partition_ranges(len: usize, workers: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return vec![0..0];
    }
    let size = len.div_ceil(workers.max(1));

    (0..len)
        .step_by(size)
        .map(|start| start..start + size.min(len - start))
        .collect()
}

/// worker 池
#[derive(Debug, Clone)]
pub struct WorkerPool {
    client: Client,
    resolver: Arc<PathResolver>,
    variant: SizeVariant,
    min_valid_size: u64,
}

impl WorkerPool {
    pub fn new(
        client: Client,
        resolver: PathResolver,
        variant: SizeVariant,
        min_valid_size: u64,
    ) -> Self {
        Self {
            client,
            resolver: Arc::new(resolver),
            variant,
            min_valid_size,
        }
    }

    /// 按下载配置创建（带单请求超时）
    pub fn from_config(config: &DownloadConfig, variant: SizeVariant) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("flickr-snaps/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        let resolver = PathResolver::new(&config.cache_dir, config.url_template.clone());
        Ok(Self::new(client, resolver, variant, config.min_valid_size))
    }

    /// 并发下载全部照片
    ///
    /// 阻塞直到所有 worker 处理完各自分片。worker 任务异常退出（panic）
    /// 只记录日志，其余 worker 的计数照常汇总。
    pub async fn run(&self, photos: Vec<PhotoDescriptor>, worker_count: usize) -> WorkerStats {
        let started = Instant::now();
        let total = photos.len();
        let photos: Arc<[PhotoDescriptor]> = photos.into();
        let ranges = partition_ranges(total, worker_count);

        info!(
            "开始下载: {} 张照片, {} 个 worker, 规格={}",
            total,
            ranges.len(),
            self.variant.as_str()
        );

        let mut join_set: JoinSet<WorkerStats> = JoinSet::new();

        for (index, range) in ranges.into_iter().enumerate() {
            if range.is_empty() {
                continue;
            }

            let worker = DownloadWorker::new(
                index,
                self.client.clone(),
                Arc::clone(&self.resolver),
                self.variant,
                self.min_valid_size,
            );
            let photos = Arc::clone(&photos);

            join_set.spawn(async move { worker.run(&photos[range]).await });
        }

        let mut stats = WorkerStats::default();
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(worker_stats) => stats += worker_stats,
                Err(e) => error!("下载 worker 异常退出: {}", e),
            }
        }

        info!(
            "下载结束: 下载 {}, 跳过 {}, 失败 {}, 耗时 {:.1}s",
            stats.downloaded,
            stats.skipped,
            stats.failed,
            started.elapsed().as_secs_f64()
        );

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::worker::DEFAULT_MIN_VALID_SIZE;
    use httpmock::prelude::*;
    use proptest::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_partition_even() {
        let ranges = partition_ranges(10, 2);
        assert_eq!(ranges, vec![0..5, 5..10]);
    }

    #[test]
    fn test_partition_uneven() {
        // 9 / 8 -> 每段 2，只需要 5 段
        let ranges = partition_ranges(9, 8);
        assert_eq!(ranges, vec![0..2, 2..4, 4..6, 6..8, 8..9]);
    }

    #[test]
    fn test_partition_huge_worker_count() {
        assert_eq!(partition_ranges(10, usize::MAX).len(), 10);
        assert_eq!(partition_ranges(3, 100_000_000), vec![0..1, 1..2, 2..3]);
        assert_eq!(partition_ranges(usize::MAX, 2).len(), 2);
    }

    #[test]
    fn test_partition_empty_and_zero_workers() {
        assert_eq!(partition_ranges(0, 4), vec![0..0]);
        assert_eq!(partition_ranges(3, 0), vec![0..3]);
    }

    proptest! {
        #[test]
        fn prop_partition_exact(len in 0usize..5000, workers in 1usize..=usize::MAX) {
            let ranges = partition_ranges(len, workers);
            prop_assert!(ranges.len() <= workers);
            prop_assert!(ranges.len() <= len.max(1));

            let sum: usize = ranges.iter().map(|r| r.len()).sum();
            prop_assert_eq!(sum, len);

            // 首尾相接 => 每个下标恰好出现一次
            let mut expected_start = 0;
            for r in &ranges {
                prop_assert_eq!(r.start, expected_start);
                prop_assert!(r.end >= r.start);
                expected_start = r.end;
            }
            prop_assert_eq!(expected_start, len);
        }
    }

    fn pool_for(server: &MockServer, cache_root: &Path) -> WorkerPool {
        let template = format!("{}/{{server}}/{{id}}_{{secret}}{{suffix}}.jpg", server.base_url());
        WorkerPool::new(
            Client::new(),
            PathResolver::new(cache_root, template),
            SizeVariant::Thumbnail,
            DEFAULT_MIN_VALID_SIZE,
        )
    }

    fn photos(count: u64) -> Vec<PhotoDescriptor> {
        (0..count)
            .map(|i| PhotoDescriptor::new((1_000_000 + i * 1_001).to_string(), "1", "2", "abc"))
            .collect()
    }

    fn count_jpgs(dir: &Path) -> usize {
        let mut count = 0;
        for entry in std::fs::read_dir(dir).unwrap().flatten() {
            let path = entry.path();
            if path.is_dir() {
                count += count_jpgs(&path);
            } else if path.extension().map(|e| e == "jpg").unwrap_or(false) {
                count += 1;
            }
        }
        count
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_thumbnails_with_two_workers() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path_contains("_abc_t.jpg");
                then.status(200).body(vec![0xFFu8; 256]);
            })
            .await;

        let temp_dir = TempDir::new().unwrap();
        let pool = pool_for(&server, temp_dir.path());

        let stats = pool.run(photos(10), 2).await;

        assert_eq!(stats.downloaded, 10);
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.failed, 0);
        assert_eq!(mock.hits_async().await, 10);
        assert_eq!(count_jpgs(temp_dir.path()), 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_second_run_skips_everything() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200).body(vec![0xFFu8; 256]);
            })
            .await;

        let temp_dir = TempDir::new().unwrap();
        let pool = pool_for(&server, temp_dir.path());

        let first = pool.run(photos(13), 8).await;
        assert_eq!(first.downloaded, 13);

        let second = pool.run(photos(13), 8).await;
        assert_eq!(second.downloaded, 0);
        assert_eq!(second.skipped, 13);
        assert_eq!(mock.hits_async().await, 13);
    }

    #[tokio::test]
    async fn test_empty_list() {
        let server = MockServer::start_async().await;
        let temp_dir = TempDir::new().unwrap();
        let pool = pool_for(&server, temp_dir.path());

        let stats = pool.run(Vec::new(), 8).await;
        assert_eq!(stats, WorkerStats::default());
    }
}
