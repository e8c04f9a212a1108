//! Local metadata/image cache with on-demand remote fetch

mod record;
mod resolver;
mod store;

pub use record::{CachedCardRecord, CardMetadata, FetchStatus};
pub use resolver::{CachePolicy, MetadataCache};
pub use store::{init_schema, CacheStats, CacheStore, DB_FILE_NAME, IMAGE_DIR_NAME};
