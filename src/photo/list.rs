//! 照片列表
//!
//! 持久化格式：JSON 数组，按枚举顺序保存照片描述。
//! 去重使用单次调用内的已见 id 集合，先出现者保留。

use crate::downloader::error::{SnapError, SnapResult};
use crate::photo::PhotoDescriptor;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 照片列表文件的默认扩展名
pub const LIST_EXTENSION: &str = "json";

/// 解析列表文件名
///
/// 扩展名不是 `.json` 时在文件名末尾补上 `.json`（`st.louis` -> `st.louis.json`）
pub fn resolve_list_path(name: &str) -> PathBuf {
    let path = PathBuf::from(name);
    if path.extension().is_some_and(|ext| ext == LIST_EXTENSION) {
        return path;
    }
    PathBuf::from(format!("{}.{}", name, LIST_EXTENSION))
}

/// 按 id 去重的照片列表
#[derive(Debug, Clone, Default)]
pub struct PhotoList {
    photos: Vec<PhotoDescriptor>,
    seen: HashSet<String>,
}

impl PhotoList {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从描述序列构建，重复 id 只保留第一次出现
    pub fn from_photos<I>(photos: I) -> Self
    where
        I: IntoIterator<Item = PhotoDescriptor>,
    {
        let mut list = Self::new();
        list.extend(photos);
        list
    }

    /// 追加一条照片，返回是否为新 id
    pub fn push(&mut self, photo: PhotoDescriptor) -> bool {
        if self.contains(&photo.id) {
            return false;
        }
        self.seen.insert(photo.id.clone());
        self.photos.push(photo);
        true
    }

    /// 批量追加，返回新增数量
    pub fn extend<I>(&mut self, photos: I) -> usize
    where
        I: IntoIterator<Item = PhotoDescriptor>,
    {
        let mut added = 0;
        for photo in photos {
            if self.push(photo) {
                added += 1;
            }
        }
        added
    }

    /// 合并另一个列表（并集，先出现者保留）
    pub fn merge(&mut self, other: PhotoList) -> usize {
        self.extend(other.photos)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn photos(&self) -> &[PhotoDescriptor] {
        &self.photos
    }

    pub fn into_photos(self) -> Vec<PhotoDescriptor> {
        self.photos
    }

    /// 从 JSON 文件加载
    ///
    /// 文件内重复的 id 会被丢弃
    pub async fn load(path: &Path) -> SnapResult<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SnapError::MissingListFile(path.to_path_buf()));
            }
            Err(e) => return Err(SnapError::filesystem(path, e)),
        };

        let photos: Vec<PhotoDescriptor> =
            serde_json::from_str(&content).map_err(|source| SnapError::MalformedList {
                path: path.to_path_buf(),
                source,
            })?;

        let total = photos.len();
        let list = Self::from_photos(photos);
        if list.len() < total {
            debug!(
                "列表 {:?} 中有 {} 条重复照片被忽略",
                path,
                total - list.len()
            );
        }
        info!("已加载照片列表 {:?}: {} 张", path, list.len());
        Ok(list)
    }

    /// 序列化为带缩进的 JSON
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.photos)
    }

    /// 保存到 JSON 文件
    pub async fn save(&self, path: &Path) -> SnapResult<()> {
        let content = self
            .to_json_pretty()
            .map_err(|source| SnapError::MalformedList {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SnapError::filesystem(parent, e))?;
        }

        tokio::fs::write(path, content)
            .await
            .map_err(|e| SnapError::filesystem(path, e))?;

        info!("已写入 {} 张照片到 {:?}", self.len(), path);
        Ok(())
    }
}

impl From<Vec<PhotoDescriptor>> for PhotoList {
    fn from(photos: Vec<PhotoDescriptor>) -> Self {
        Self::from_photos(photos)
    }
}

/// 合并多个列表，按 id 取并集，保持首次出现的顺序
pub fn merge_lists<I>(lists: I) -> PhotoList
where
    I: IntoIterator<Item = PhotoList>,
{
    lists.into_iter().fold(PhotoList::new(), |mut acc, list| {
        acc.merge(list);
        acc
    })
}
