pub mod config;
pub mod error;
pub mod feed;
pub mod http;
pub mod model;
pub mod playback;
pub mod provider;
pub mod repository;
pub mod store;

// Re-export main types for convenience
pub use config::{ProviderSelection, Secrets};
pub use error::{ApiError, FeedError, RepoError, StoreError};
pub use feed::{fetch_feed, parse_feed};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use model::{Episode, Show};
pub use playback::{
    NowPlayingInfo, PlaybackEngine, PlaybackState, PlayerBackend, PlayerHandle, RemoteCommand,
    RemoteCommandBridge, SimulatedBackend,
};
pub use provider::{
    Credentials, DemoSource, ListenNotesSource, PodcastIndexSource, ShowDataSource,
    DEFAULT_PAGE_SIZE,
};
pub use repository::{CachingRepository, ShowRepository};
pub use store::{
    CacheStore, Collection, LibraryEntry, LibraryStore, MemoryCacheStore, MemoryLibraryStore,
    SqliteCacheStore, SqliteLibraryStore,
};
