// Flickr 元数据模块

pub mod client;
pub mod types;

pub use client::{collect_tagged_photos, sign_params, FlickrClient, PhotoSource, SearchQuery};
pub use types::{PhotoPage, SearchResponse};
