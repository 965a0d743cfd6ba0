// Flickr 接口数据类型

use crate::photo::PhotoDescriptor;
use serde::{Deserialize, Deserializer};

/// flickr.photos.search 响应
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    /// "ok" 或 "fail"
    pub stat: String,

    /// 结果页（stat=ok 时存在）
    #[serde(default)]
    pub photos: Option<PhotoPage>,

    /// 错误码（stat=fail 时存在）
    #[serde(default)]
    pub code: Option<i64>,

    /// 错误信息
    #[serde(default)]
    pub message: Option<String>,
}

impl SearchResponse {
    pub fn is_ok(&self) -> bool {
        self.stat == "ok"
    }
}

/// 一页搜索结果
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhotoPage {
    /// 当前页码（从1开始）
    #[serde(deserialize_with = "lenient_u32")]
    pub page: u32,

    /// 总页数
    #[serde(deserialize_with = "lenient_u32")]
    pub pages: u32,

    /// 本页照片
    #[serde(default, rename = "photo")]
    pub photos: Vec<PhotoDescriptor>,
}

impl PhotoPage {
    /// 是否是最后一页
    pub fn is_last(&self) -> bool {
        self.page >= self.pages
    }
}

/// 兼容数字和数字字符串（接口对 total/pages 的类型并不统一）
fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u32),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
