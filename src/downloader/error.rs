//! 下载错误类型
//!
//! 单条照片的错误（标识符非法、文件系统、远程获取）只在 worker 内部记录日志并计数，
//! 不会中断整个批次；列表文件缺失或 JSON 格式错误属于运行级错误。

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 下载流程错误
#[derive(Debug, Error)]
pub enum SnapError {
    /// 照片 id 不是合法的非负整数
    #[error("照片标识符无效: {id:?}")]
    InvalidIdentifier { id: String },

    /// 目录创建或文件写入失败
    #[error("文件系统错误: {path:?}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 非成功 HTTP 状态或传输失败
    #[error("远程获取失败: {url} ({})", describe_fetch(.status, .message))]
    RemoteFetch {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// 请求的照片列表文件不存在
    #[error("照片列表文件不存在: {0:?}")]
    MissingListFile(PathBuf),

    /// 照片列表 JSON 格式错误
    #[error("照片列表解析失败: {path:?}: {source}")]
    MalformedList {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn describe_fetch(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("HTTP {} {}", code, message),
        None => message.to_string(),
    }
}

impl SnapError {
    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}

pub type SnapResult<T> = std::result::Result<T, SnapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_fetch_display() {
        let err = SnapError::RemoteFetch {
            url: "http://farm1.static.flickr.com/2/1_abc_t.jpg".to_string(),
            status: Some(404),
            message: "Not Found".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("HTTP 404"));
        assert!(text.contains("1_abc_t.jpg"));
    }
}
