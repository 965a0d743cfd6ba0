// snaps 子命令：把照片列表中的图片下载到本地缓存

use crate::config::AppConfig;
use crate::downloader::{SizeVariant, WorkerPool, WorkerStats};
use crate::photo::{resolve_list_path, PhotoList};
use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

#[derive(Args, Debug, Clone)]
pub struct SnapsArgs {
    /// 下载原尺寸图片（默认缩略图）
    #[arg(short, long)]
    pub big: bool,

    /// 倒序处理照片
    #[arg(short, long)]
    pub reverse: bool,

    /// 并发 worker 数（默认取配置中的 worker_count）
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// 照片列表文件（可省略 .json 扩展名）
    #[arg(required = true)]
    pub lists: Vec<String>,
}

impl SnapsArgs {
    pub fn variant(&self) -> SizeVariant {
        if self.big {
            SizeVariant::Full
        } else {
            SizeVariant::Thumbnail
        }
    }
}

/// 执行 snaps 子命令
///
/// 依次处理每个列表文件；某个列表不存在时，在处理它之前停止并返回错误，
/// 已处理列表的下载结果保留。
pub async fn run(config: &AppConfig, args: &SnapsArgs) -> Result<WorkerStats> {
    config.download.validate()?;

    let pool = WorkerPool::from_config(&config.download, args.variant())?;
    let workers = args
        .workers
        .unwrap_or_else(|| config.download.effective_worker_count());

    let mut total = WorkerStats::default();

    for name in &args.lists {
        let path = resolve_list_path(name);

        let list = match PhotoList::load(&path).await {
            Ok(list) => list,
            Err(e) => {
                if total.processed() > 0 {
                    warn!(
                        "已处理的列表: 下载 {}, 跳过 {}, 失败 {}",
                        total.downloaded, total.skipped, total.failed
                    );
                }
                return Err(e).with_context(|| format!("无法处理照片列表 {:?}", path));
            }
        };

        info!("照片列表: {:?} ({} 张)", path, list.len());

        let mut photos = list.into_photos();
        if args.reverse {
            photos.reverse();
        }

        total += pool.run(photos, workers).await;
    }

    if total.downloaded > 0 {
        info!("已下载 {} 张图片", total.downloaded);
    }
    if total.skipped > 0 {
        info!("{} 张图片已存在", total.skipped);
    }
    if total.failed > 0 {
        warn!("{} 张图片下载失败", total.failed);
    }

    Ok(total)
}
