use thiserror::Error;

/// Errors that can occur when talking to a podcast metadata API
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Server returned HTTP {code} for {url}")]
    Status {
        url: String,
        code: u16,
        /// Raw response body, kept for diagnostics and never auto-parsed
        body: String,
    },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors that can occur when fetching or parsing RSS feeds
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to fetch feed: {0}")]
    Fetch(#[from] ApiError),

    #[error("Failed to parse RSS feed: {0}")]
    Parse(#[from] rss::Error),
}

/// Errors raised by the embedded stores (cache and library)
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database operation failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store lock poisoned by a panicked writer")]
    Poisoned,
}

/// Top-level errors surfaced by the podcast repository
#[derive(Error, Debug)]
pub enum RepoError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No show with id '{id}'")]
    ShowNotFound { id: String },
}
