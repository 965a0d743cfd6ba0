// 目录创建
//
// 为目标文件逐级创建祖先目录（由浅到深）。
// 多个 worker 可能同时创建同一目录，"已存在" 不算错误；
// 同名路径是普通文件、权限不足、磁盘已满等才会失败。

use crate::downloader::error::{SnapError, SnapResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 确保 `path` 的所有祖先目录存在
///
/// # 参数
/// * `path` - 目标文件路径（文件本身不会被创建）
pub async fn ensure_directories(path: &Path) -> SnapResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return Ok(()),
    };

    // 已存在时快速返回
    if tokio::fs::metadata(parent)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        return Ok(());
    }

    let mut ancestors: Vec<PathBuf> = parent
        .ancestors()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .collect();
    ancestors.reverse();

    for dir in ancestors {
        create_one(&dir).await?;
    }

    Ok(())
}

async fn create_one(dir: &Path) -> SnapResult<()> {
    match tokio::fs::create_dir(dir).await {
        Ok(()) => {
            debug!("创建目录: {:?}", dir);
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => match tokio::fs::metadata(dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(SnapError::filesystem(
                dir,
                std::io::Error::new(ErrorKind::AlreadyExists, "同名路径已存在且不是目录"),
            )),
            Err(e) => Err(SnapError::filesystem(dir, e)),
        },
        Err(e) => {
            // 根目录等无法创建但已存在的情况
            if tokio::fs::metadata(dir)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false)
            {
                Ok(())
            } else {
                Err(SnapError::filesystem(dir, e))
            }
        }
    }
}
