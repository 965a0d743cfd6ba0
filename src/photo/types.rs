// 照片描述数据类型

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// 照片描述
///
/// 一条远程照片记录，由元数据枚举生成，下载器和合并工具只读使用。
/// `id` 是唯一的去重键。`farm`/`server` 在远程接口中可能是数字，
/// 统一保存为字符串。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoDescriptor {
    /// 照片ID
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    /// farm 分片标识
    #[serde(deserialize_with = "string_or_number")]
    pub farm: String,

    /// server 分片标识
    #[serde(deserialize_with = "string_or_number")]
    pub server: String,

    /// URL 中携带的访问密钥
    pub secret: String,

    /// 其他属性（owner、title 等），原样透传
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PhotoDescriptor {
    pub fn new(
        id: impl Into<String>,
        farm: impl Into<String>,
        server: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            farm: farm.into(),
            server: server.into(),
            secret: secret.into(),
            extra: Map::new(),
        }
    }

    /// 照片标题（如果有）
    pub fn title(&self) -> Option<&str> {
        self.extra.get("title").and_then(Value::as_str)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
    })
}
