// Flickr Snaps Library
// 按标签获取 Flickr 照片列表并批量下载到本地缓存

// 配置管理模块
pub mod config;

// 日志模块
pub mod logging;

// 照片数据模型与列表
pub mod photo;

// Flickr 元数据接口
pub mod flickr;

// 下载引擎模块
pub mod downloader;

// 子命令
pub mod commands;

// 导出常用类型
pub use config::AppConfig;
pub use downloader::{PathResolver, SizeVariant, SnapError, WorkerPool, WorkerStats};
pub use flickr::{FlickrClient, PhotoSource, SearchQuery};
pub use photo::{PhotoDescriptor, PhotoList};
