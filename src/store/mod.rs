mod cache;
mod library;

pub use cache::{CacheStore, MemoryCacheStore, SqliteCacheStore};
pub use library::{
    Collection, LibraryEntry, LibraryStore, MemoryLibraryStore, SqliteLibraryStore,
};
