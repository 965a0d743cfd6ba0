// list 子命令：按标签枚举照片并保存为列表文件

use crate::config::AppConfig;
use crate::flickr::{collect_tagged_photos, FlickrClient, PhotoSource, SearchQuery};
use crate::photo::PhotoList;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// 最多获取的照片数（默认取配置中的 default_limit）
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// 输出文件（默认 <标签以+连接>.json）
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 额外返回字段，逗号分隔
    #[arg(short, long)]
    pub extras: Option<String>,

    /// 每页数量（最大 500）
    #[arg(long)]
    pub page_size: Option<u32>,

    /// 要搜索的标签
    #[arg(required = true)]
    pub tags: Vec<String>,
}

/// 默认输出文件名：标签以 `+` 连接，去掉空格
pub fn default_output_name(tags: &[String]) -> PathBuf {
    let name: String = tags.join("+").chars().filter(|c| *c != ' ').collect();
    PathBuf::from(format!("{}.json", name))
}

/// 执行 list 子命令
pub async fn run(config: &AppConfig, args: &ListArgs) -> Result<PhotoList> {
    let client = FlickrClient::new(config.flickr.clone())?;
    run_with_source(config, args, &client).await
}

/// 使用指定数据源执行 list 子命令
pub async fn run_with_source<S>(config: &AppConfig, args: &ListArgs, source: &S) -> Result<PhotoList>
where
    S: PhotoSource + ?Sized,
{
    let limit = args.limit.unwrap_or(config.flickr.default_limit);

    let mut flickr_config = config.flickr.clone();
    if let Some(page_size) = args.page_size {
        flickr_config.page_size = page_size;
    }
    let per_page = flickr_config.effective_page_size(limit);

    let mut query = SearchQuery::new(args.tags.iter().cloned());
    if let Some(ref extras) = args.extras {
        query = query.with_extras(extras.clone());
    }

    info!(
        "搜索带标签的照片: tags={}, limit={}, per_page={}",
        query.tags_param(),
        limit,
        per_page
    );

    let list = collect_tagged_photos(source, &query, limit, per_page).await?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_name(&args.tags));
    list.save(&output)
        .await
        .with_context(|| format!("写入照片列表失败: {:?}", output))?;

    Ok(list)
}
