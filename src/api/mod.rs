pub mod client;
pub mod models;

mod songs;
pub mod upload;

use crate::error::AppResult;
use async_trait::async_trait;
use models::{Song, SortOrder, UploadFile, UploadReport};

/// The remote song backend. `SongClient` talks HTTP; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait SongApi: Send + Sync {
    async fn list_songs(&self, limit: u32, page: u32, sort_order: SortOrder)
        -> AppResult<Vec<Song>>;

    async fn search_songs(&self, query: &str) -> AppResult<Vec<Song>>;

    async fn delete_song(&self, id: &str) -> AppResult<()>;

    async fn upload_songs(&self, files: Vec<UploadFile>) -> AppResult<UploadReport>;

    /// Download the binary content behind a song's file URL.
    async fn fetch_song_file(&self, url: &str) -> AppResult<Vec<u8>>;
}
