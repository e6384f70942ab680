mod demo;
mod listennotes;
mod podcastindex;

pub use demo::DemoSource;
pub use listennotes::ListenNotesSource;
pub use podcastindex::{Credentials, PodcastIndexSource};

use async_trait::async_trait;

use crate::error::RepoError;
use crate::model::Show;

/// Default number of shows requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// A remote (or bundled) source of podcast metadata
///
/// Both upstream providers and the bundled demo dataset satisfy the same
/// three operations. Selection between them is a startup-time configuration
/// decision, not runtime polymorphism. Implementations never swallow
/// errors; every failure propagates to the repository.
#[async_trait]
pub trait ShowDataSource: Send + Sync {
    /// Fetch one page (1-based) of trending shows
    async fn fetch_trending(&self, page: u32, page_size: u32) -> Result<Vec<Show>, RepoError>;

    /// Search shows by free-text query
    async fn search(&self, query: &str, page: u32, page_size: u32)
        -> Result<Vec<Show>, RepoError>;

    /// Fetch one show with its latest episodes, newest first
    async fn fetch_show_detail(&self, id: &str) -> Result<Show, RepoError>;
}

#[async_trait]
impl<T: ShowDataSource + ?Sized> ShowDataSource for Box<T> {
    async fn fetch_trending(&self, page: u32, page_size: u32) -> Result<Vec<Show>, RepoError> {
        (**self).fetch_trending(page, page_size).await
    }

    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Show>, RepoError> {
        (**self).search(query, page, page_size).await
    }

    async fn fetch_show_detail(&self, id: &str) -> Result<Show, RepoError> {
        (**self).fetch_show_detail(id).await
    }
}
