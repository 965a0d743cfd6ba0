// merge 子命令：合并多个照片列表（按 id 取并集）

use crate::photo::{merge_lists, resolve_list_path, PhotoList};
use anyhow::{Context, Result};
use clap::Args;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct MergeArgs {
    /// 输出文件（默认输出到标准输出）
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 要合并的照片列表（可省略 .json 扩展名）
    #[arg(required = true)]
    pub lists: Vec<String>,
}

/// 按顺序加载并合并列表，先出现者保留
pub async fn merge_files(names: &[String]) -> Result<PhotoList> {
    let mut lists = Vec::with_capacity(names.len());
    for name in names {
        let path = resolve_list_path(name);
        let list = PhotoList::load(&path)
            .await
            .with_context(|| format!("无法合并照片列表 {:?}", path))?;
        lists.push(list);
    }
    Ok(merge_lists(lists))
}

/// 执行 merge 子命令
pub async fn run(args: &MergeArgs) -> Result<PhotoList> {
    let merged = merge_files(&args.lists).await?;
    info!("合并 {} 个列表, 共 {} 张照片", args.lists.len(), merged.len());

    match args.output {
        Some(ref output) => merged.save(output).await?,
        None => {
            let json = merged
                .to_json_pretty()
                .context("Failed to serialize merged list")?;
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json).context("写入标准输出失败")?;
        }
    }

    Ok(merged)
}
