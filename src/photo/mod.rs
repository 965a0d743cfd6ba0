// 照片数据模块

pub mod list;
pub mod types;

pub use list::{merge_lists, resolve_list_path, PhotoList};
pub use types::PhotoDescriptor;
