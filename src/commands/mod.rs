// 子命令实现

pub mod list;
pub mod merge;
pub mod snaps;

pub use list::ListArgs;
pub use merge::MergeArgs;
pub use snaps::SnapsArgs;
