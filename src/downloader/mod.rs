pub mod dirs;
pub mod error;
pub mod path;
pub mod pool;
pub mod worker;

pub use dirs::ensure_directories;
pub use error::{SnapError, SnapResult};
pub use path::{bucket_pair, parse_photo_id, PathResolver, SizeVariant};
pub use pool::{partition_ranges, WorkerPool, DEFAULT_WORKER_COUNT};
pub use worker::{DownloadWorker, FetchOutcome, WorkerStats};
