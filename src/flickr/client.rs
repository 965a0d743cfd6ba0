// Flickr 客户端实现
//
// 只实现按标签搜索所需的最小接口：flickr.photos.search 分页枚举。
// 凭证（api_key / api_secret / auth_token）由配置文件提供。

use crate::config::FlickrConfig;
use crate::flickr::{PhotoPage, SearchResponse};
use crate::photo::PhotoList;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// 搜索方法名
const SEARCH_METHOD: &str = "flickr.photos.search";

/// 每获取多少张照片打印一次进度
const PROGRESS_INTERVAL: usize = 100;

/// 搜索条件
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// 标签（多个标签以逗号连接后提交）
    pub tags: Vec<String>,
    /// 额外返回字段，逗号分隔
    pub extras: Option<String>,
}

impl SearchQuery {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            extras: None,
        }
    }

    pub fn with_extras(mut self, extras: impl Into<String>) -> Self {
        let extras = extras.into();
        self.extras = if extras.trim().is_empty() {
            None
        } else {
            Some(extras)
        };
        self
    }

    pub fn tags_param(&self) -> String {
        self.tags.join(",")
    }
}

/// 照片元数据来源
#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// 获取一页搜索结果
    ///
    /// # 参数
    /// * `page` - 页码（从1开始）
    /// * `per_page` - 每页数量
    async fn search_page(&self, query: &SearchQuery, page: u32, per_page: u32)
        -> Result<PhotoPage>;
}

/// 按标签枚举照片，按 id 去重，最多获取 `limit` 张
///
/// 重复照片也计入已获取数量；遇到空页或最后一页时停止
pub async fn collect_tagged_photos<S>(
    source: &S,
    query: &SearchQuery,
    limit: usize,
    per_page: u32,
) -> Result<PhotoList>
where
    S: PhotoSource + ?Sized,
{
    let mut list = PhotoList::new();
    if limit == 0 {
        return Ok(list);
    }

    let mut retrieved = 0usize;
    let mut page = 1u32;

    'pages: loop {
        let result = source
            .search_page(query, page, per_page)
            .await
            .with_context(|| format!("获取第 {} 页失败", page))?;

        debug!(
            "第 {}/{} 页: {} 张照片",
            result.page,
            result.pages,
            result.photos.len()
        );

        if result.photos.is_empty() {
            break;
        }

        let is_last = result.is_last();
        for photo in result.photos {
            retrieved += 1;
            list.push(photo);

            if retrieved % PROGRESS_INTERVAL == 0 {
                info!("已获取 {} 张...", retrieved);
            }
            if retrieved >= limit {
                break 'pages;
            }
        }

        if is_last {
            break;
        }
        page += 1;
    }

    info!(
        "枚举完成: 获取 {} 张, 去重后 {} 张",
        retrieved,
        list.len()
    );
    Ok(list)
}

/// Flickr REST 客户端
#[derive(Debug, Clone)]
pub struct FlickrClient {
    client: Client,
    config: FlickrConfig,
}

impl FlickrClient {
    pub fn new(config: FlickrConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            anyhow::bail!("未配置 Flickr API Key，请在配置文件 [flickr] 中填写 api_key");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("flickr-snaps/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        info!(
            "初始化 Flickr 客户端: endpoint={}, 签名={}",
            config.endpoint,
            if config.can_sign() { "启用" } else { "未启用" }
        );

        Ok(Self { client, config })
    }

    /// 构造请求参数（需要时附带签名）
    fn build_params(&self, query: &SearchQuery, page: u32, per_page: u32) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = vec![
            ("method".into(), SEARCH_METHOD.into()),
            ("api_key".into(), self.config.api_key.clone()),
            ("tags".into(), query.tags_param()),
            ("per_page".into(), per_page.to_string()),
            ("page".into(), page.to_string()),
            ("format".into(), "json".into()),
            ("nojsoncallback".into(), "1".into()),
        ];

        if let Some(ref extras) = query.extras {
            params.push(("extras".into(), extras.clone()));
        }

        if self.config.can_sign() {
            params.push(("auth_token".into(), self.config.auth_token.clone()));
            let sig = sign_params(&self.config.api_secret, &params);
            params.push(("api_sig".into(), sig));
        }

        params
    }
}

#[async_trait]
impl PhotoSource for FlickrClient {
    async fn search_page(
        &self,
        query: &SearchQuery,
        page: u32,
        per_page: u32,
    ) -> Result<PhotoPage> {
        let params = self.build_params(query, page, per_page);

        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&params)
            .send()
            .await
            .context("Failed to send search request")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("搜索请求失败: HTTP {}", status);
        }

        let body: SearchResponse = response
            .json()
            .await
            .context("Failed to parse search response")?;

        if !body.is_ok() {
            anyhow::bail!(
                "Flickr API 错误 {}: {}",
                body.code.unwrap_or_default(),
                body.message.unwrap_or_default()
            );
        }

        body.photos.context("搜索响应缺少 photos 字段")
    }
}

/// 请求签名：md5(secret + 按键名排序后拼接的 key+value)
pub fn sign_params(secret: &str, params: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut raw = String::from(secret);
    for (key, value) in sorted {
        raw.push_str(key);
        raw.push_str(value);
    }

    format!("{:x}", md5::compute(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photo::PhotoDescriptor;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::collections::HashMap;

    /// 内存中的分页数据源
    struct FakeSource {
        pages: HashMap<u32, Vec<PhotoDescriptor>>,
        total_pages: u32,
    }

    #[async_trait]
    impl PhotoSource for FakeSource {
        async fn search_page(&self, _query: &SearchQuery, page: u32, _per_page: u32) -> Result<PhotoPage> {
            Ok(PhotoPage {
                page,
                pages: self.total_pages,
                photos: self.pages.get(&page).cloned().unwrap_or_default(),
            })
        }
    }

    fn photo(id: &str) -> PhotoDescriptor {
        PhotoDescriptor::new(id, "1", "2", "abc")
    }

    fn ids(list: &PhotoList) -> Vec<&str> {
        list.photos().iter().map(|p| p.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_collect_dedups_across_pages() {
        let source = FakeSource {
            pages: HashMap::from([
                (1, vec![photo("1"), photo("2"), photo("1")]),
                (2, vec![photo("3"), photo("2")]),
            ]),
            total_pages: 2,
        };

        let list = collect_tagged_photos(&source, &SearchQuery::new(["sunset"]), 100, 3)
            .await
            .unwrap();
        assert_eq!(ids(&list), vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_collect_duplicate_single_page() {
        let source = FakeSource {
            pages: HashMap::from([(1, vec![photo("1"), photo("1")])]),
            total_pages: 1,
        };

        let list = collect_tagged_photos(&source, &SearchQuery::new(["cat"]), 4500, 500)
            .await
            .unwrap();
        assert_eq!(list.len(), 1);
    }

    #[tokio::test]
    async fn test_collect_respects_limit() {
        let source = FakeSource {
            pages: HashMap::from([
                (1, vec![photo("1"), photo("2"), photo("3")]),
                (2, vec![photo("4"), photo("5"), photo("6")]),
            ]),
            total_pages: 2,
        };

        let list = collect_tagged_photos(&source, &SearchQuery::new(["cat"]), 4, 3)
            .await
            .unwrap();
        assert_eq!(ids(&list), vec!["1", "2", "3", "4"]);

        let empty = collect_tagged_photos(&source, &SearchQuery::new(["cat"]), 0, 3)
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_collect_stops_on_empty_page() {
        let source = FakeSource {
            pages: HashMap::from([(1, vec![photo("1")])]),
            total_pages: 10,
        };

        let list = collect_tagged_photos(&source, &SearchQuery::new(["cat"]), 100, 1)
            .await
            .unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_sign_params_order_independent() {
        let a = vec![
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "1".to_string()),
        ];
        let b = vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ];

        let sig = sign_params("secret", &a);
        assert_eq!(sig, sign_params("secret", &b));
        assert_eq!(sig.len(), 32);
        assert_eq!(sig, format!("{:x}", md5::compute("secreta1b2")));
        assert_ne!(sig, sign_params("other", &a));
    }

    #[test]
    fn test_new_requires_api_key() {
        assert!(FlickrClient::new(FlickrConfig::default()).is_err());
    }

    fn client_for(server: &MockServer, signed: bool) -> FlickrClient {
        let mut config = FlickrConfig {
            api_key: "key".to_string(),
            endpoint: server.url("/services/rest/"),
            ..Default::default()
        };
        if signed {
            config.api_secret = "secret".to_string();
            config.auth_token = "token".to_string();
        }
        FlickrClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_search_pages_over_http() {
        let server = MockServer::start_async().await;
        let first = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/services/rest/")
                    .query_param("method", "flickr.photos.search")
                    .query_param("tags", "sunset,beach")
                    .query_param("page", "1");
                then.status(200).json_body(json!({
                    "photos": {
                        "page": 1, "pages": 2, "perpage": 2, "total": "3",
                        "photo": [
                            {"id": "100", "secret": "s", "server": "9", "farm": 1},
                            {"id": "101", "secret": "s", "server": "9", "farm": 1}
                        ]
                    },
                    "stat": "ok"
                }));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(GET).path("/services/rest/").query_param("page", "2");
                then.status(200).json_body(json!({
                    "photos": {
                        "page": 2, "pages": 2, "perpage": 2, "total": "3",
                        "photo": [{"id": "100", "secret": "s", "server": "9", "farm": 1}]
                    },
                    "stat": "ok"
                }));
            })
            .await;

        let client = client_for(&server, false);
        let query = SearchQuery::new(["sunset", "beach"]);
        let list = collect_tagged_photos(&client, &query, 4500, 2).await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(ids(&list), vec!["100", "101"]);
        assert_eq!(list.photos()[0].farm, "1");
    }

    #[tokio::test]
    async fn test_signed_request_carries_signature() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/services/rest/")
                    .query_param("auth_token", "token")
                    .query_param_exists("api_sig");
                then.status(200).json_body(json!({
                    "photos": {"page": 1, "pages": 1, "photo": []},
                    "stat": "ok"
                }));
            })
            .await;

        let client = client_for(&server, true);
        let page = client
            .search_page(&SearchQuery::new(["cat"]), 1, 10)
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(page.photos.is_empty());
    }

    #[tokio::test]
    async fn test_api_failure_surfaces() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/services/rest/");
                then.status(200)
                    .json_body(json!({"stat": "fail", "code": 100, "message": "Invalid API Key"}));
            })
            .await;

        let client = client_for(&server, false);
        let err = client
            .search_page(&SearchQuery::new(["cat"]), 1, 10)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid API Key"));
    }
}
