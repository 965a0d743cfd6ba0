// 配置管理模块

use crate::downloader::path::{DEFAULT_CACHE_DIR, DEFAULT_URL_TEMPLATE};
use crate::downloader::pool::DEFAULT_WORKER_COUNT;
use crate::downloader::worker::DEFAULT_MIN_VALID_SIZE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config/app.toml";

/// 搜索接口单页上限
pub const MAX_PAGE_SIZE: u32 = 500;

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Flickr 接口配置
    #[serde(default)]
    pub flickr: FlickrConfig,
    /// 下载配置
    #[serde(default)]
    pub download: DownloadConfig,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 是否启用日志文件持久化
    #[serde(default = "default_log_enabled")]
    pub enabled: bool,
    /// 日志文件保存目录
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// 日志保留天数（默认 7 天）
    #[serde(default = "default_log_retention_days")]
    pub retention_days: u32,
    /// 日志级别（默认 info）
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 单个日志文件最大大小（字节，默认 50MB）
    #[serde(default = "default_log_max_file_size")]
    pub max_file_size: u64,
}

fn default_log_enabled() -> bool {
    true
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_retention_days() -> u32 {
    7
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_max_file_size() -> u64 {
    50 * 1024 * 1024 // 50MB
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_log_enabled(),
            log_dir: default_log_dir(),
            retention_days: default_log_retention_days(),
            level: default_log_level(),
            max_file_size: default_log_max_file_size(),
        }
    }
}

/// Flickr 接口配置
///
/// 凭证需预先获取，这里只负责读取
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlickrConfig {
    /// API Key
    #[serde(default)]
    pub api_key: String,
    /// API Secret（用于请求签名）
    #[serde(default)]
    pub api_secret: String,
    /// 授权 token（可为空）
    #[serde(default)]
    pub auth_token: String,
    /// REST 接口地址
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// 每页数量（最大 500）
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// 默认最多获取的照片数
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// 请求超时（秒）
    #[serde(default = "default_flickr_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://api.flickr.com/services/rest/".to_string()
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_limit() -> usize {
    4500
}

fn default_flickr_timeout_secs() -> u64 {
    30
}

impl Default for FlickrConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            auth_token: String::new(),
            endpoint: default_endpoint(),
            page_size: default_page_size(),
            default_limit: default_limit(),
            timeout_secs: default_flickr_timeout_secs(),
        }
    }
}

impl FlickrConfig {
    /// 实际使用的每页数量：限制在 1..=500，且不超过 limit
    pub fn effective_page_size(&self, limit: usize) -> u32 {
        let capped = self.page_size.clamp(1, MAX_PAGE_SIZE);
        let limit = u32::try_from(limit.max(1)).unwrap_or(u32::MAX);
        capped.min(limit)
    }

    /// 是否可以对请求签名
    pub fn can_sign(&self) -> bool {
        !self.api_secret.is_empty() && !self.auth_token.is_empty()
    }
}

/// 下载配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// 本地缓存根目录
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// 并发 worker 数
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// 已存在文件的最小有效大小（字节）
    #[serde(default = "default_min_valid_size")]
    pub min_valid_size: u64,
    /// 单个请求超时（秒）
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// 远程地址模板，占位符: {farm} {server} {id} {secret} {suffix}
    #[serde(default = "default_url_template")]
    pub url_template: String,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

fn default_worker_count() -> usize {
    DEFAULT_WORKER_COUNT
}

fn default_min_valid_size() -> u64 {
    DEFAULT_MIN_VALID_SIZE
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_url_template() -> String {
    DEFAULT_URL_TEMPLATE.to_string()
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            worker_count: default_worker_count(),
            min_valid_size: default_min_valid_size(),
            request_timeout_secs: default_request_timeout_secs(),
            url_template: default_url_template(),
        }
    }
}

impl DownloadConfig {
    /// 校验下载配置
    pub fn validate(&self) -> Result<()> {
        if self.cache_dir.as_os_str().is_empty() {
            anyhow::bail!("缓存目录不能为空");
        }
        if !self.url_template.contains("{id}") {
            anyhow::bail!("地址模板缺少 {{id}} 占位符: {}", self.url_template);
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("请求超时必须大于 0");
        }
        Ok(())
    }

    /// 实际 worker 数（至少为 1）
    pub fn effective_worker_count(&self) -> usize {
        self.worker_count.max(1)
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub async fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;

        let config: AppConfig = toml::from_str(&content).context("Failed to parse config file")?;

        config
            .download
            .validate()
            .context("配置文件中的下载配置验证失败")?;

        Ok(config)
    }

    /// 保存配置到文件
    pub async fn save_to_file(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        // 确保父目录存在
        if let Some(parent) = std::path::Path::new(path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        fs::write(path, content)
            .await
            .context("Failed to write config file")?;

        tracing::info!("✓ 配置已保存: {}", path);
        Ok(())
    }

    /// 加载或创建默认配置
    ///
    /// 文件不存在时写出一份默认配置，方便填写凭证
    pub async fn load_or_default(path: &str) -> Self {
        match Self::load_from_file(path).await {
            Ok(config) => {
                tracing::info!("配置文件加载成功: {}", path);
                config
            }
            Err(e) => {
                tracing::warn!("配置文件加载失败，使用默认配置: {:#}", e);
                let default_config = Self::default();

                if !std::path::Path::new(path).exists() {
                    if let Err(e) = default_config.save_to_file(path).await {
                        tracing::error!("保存默认配置失败: {}", e);
                    }
                }

                default_config
            }
        }
    }
}
