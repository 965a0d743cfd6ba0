//! 路径解析
//!
//! 把照片描述 + 尺寸规格映射为远程 URL 和本地缓存路径，纯函数，无 I/O。
//!
//! 本地缓存布局：`<cache_root>/<bucket1:03>/<bucket2:03>/<id><suffix>.jpg`
//! - bucket1 = (id / 1_000_000) % 1000
//! - bucket2 = (id / 1000) % 1000

use crate::downloader::error::{SnapError, SnapResult};
use crate::photo::PhotoDescriptor;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 默认远程地址模板
pub const DEFAULT_URL_TEMPLATE: &str =
    "http://farm{farm}.static.flickr.com/{server}/{id}_{secret}{suffix}.jpg";

/// 默认缓存根目录
pub const DEFAULT_CACHE_DIR: &str = "flickrcache";

/// 图片尺寸规格，整次运行统一使用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeVariant {
    /// 缩略图（后缀 `_t`）
    Thumbnail,
    /// 原尺寸（无后缀）
    Full,
}

impl SizeVariant {
    /// URL 与本地文件名共用的后缀
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Thumbnail => "_t",
            Self::Full => "",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thumbnail => "thumbnail",
            Self::Full => "full",
        }
    }
}

impl Default for SizeVariant {
    fn default() -> Self {
        Self::Thumbnail
    }
}

/// 解析照片 id 为非负整数
///
/// 只接受纯 ASCII 数字，拒绝空串、符号和空白
pub fn parse_photo_id(id: &str) -> SnapResult<u64> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SnapError::InvalidIdentifier { id: id.to_string() });
    }
    id.parse::<u64>()
        .map_err(|_| SnapError::InvalidIdentifier { id: id.to_string() })
}

/// 两级分桶目录编号
pub fn bucket_pair(id: u64) -> (u64, u64) {
    ((id / 1_000_000) % 1000, (id / 1000) % 1000)
}

/// 路径解析器
#[derive(Debug, Clone)]
pub struct PathResolver {
    cache_root: PathBuf,
    url_template: String,
}

impl PathResolver {
    pub fn new(cache_root: impl Into<PathBuf>, url_template: impl Into<String>) -> Self {
        Self {
            cache_root: cache_root.into(),
            url_template: url_template.into(),
        }
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// 远程图片地址
    pub fn remote_url(&self, photo: &PhotoDescriptor, variant: SizeVariant) -> String {
        self.url_template
            .replace("{farm}", &photo.farm)
            .replace("{server}", &photo.server)
            .replace("{id}", &photo.id)
            .replace("{secret}", &photo.secret)
            .replace("{suffix}", variant.suffix())
    }

    /// 本地缓存路径
    pub fn local_path(&self, photo: &PhotoDescriptor, variant: SizeVariant) -> SnapResult<PathBuf> {
        let numeric_id = parse_photo_id(&photo.id)?;
        let (bucket1, bucket2) = bucket_pair(numeric_id);

        Ok(self
            .cache_root
            .join(format!("{:03}", bucket1))
            .join(format!("{:03}", bucket2))
            .join(format!("{}{}.jpg", photo.id, variant.suffix())))
    }
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DIR, DEFAULT_URL_TEMPLATE)
    }
}
