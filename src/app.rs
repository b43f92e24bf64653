//! Async orchestration around [`PlayerSession`]. Every network operation
//! locks the session to begin, releases it for the request, and locks it
//! again to apply the result, so playback stays responsive while requests
//! are in flight.

use crate::actions::DownloadSink;
use crate::api::models::{SortOrder, UploadFile, UploadReport};
use crate::api::SongApi;
use crate::catalog::PageOutcome;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::session::PlayerSession;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct AppTimings {
    pub search_debounce: Duration,
    pub scroll_debounce: Duration,
    /// Distance from the bottom of the list, in pixels, that counts as "near"
    pub scroll_threshold_px: f64,
    pub progress_interval: Duration,
}

impl AppTimings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            search_debounce: config.search_debounce(),
            scroll_debounce: config.scroll_debounce(),
            scroll_threshold_px: config.scroll_threshold_px,
            progress_interval: config.progress_interval(),
        }
    }
}

impl Default for AppTimings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

#[derive(Clone)]
pub struct PlayerApp {
    session: Arc<Mutex<PlayerSession>>,
    api: Arc<dyn SongApi>,
    downloads: Arc<dyn DownloadSink>,
    timings: AppTimings,
    scroll_generation: Arc<AtomicU64>,
}

impl PlayerApp {
    pub fn new(
        session: PlayerSession,
        api: Arc<dyn SongApi>,
        downloads: Arc<dyn DownloadSink>,
        timings: AppTimings,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            api,
            downloads,
            timings,
            scroll_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn session(&self) -> &Arc<Mutex<PlayerSession>> {
        &self.session
    }

    /// Fetch the next page if the catalog allows it. `Ok(None)` means the
    /// call was not eligible (already loading or nothing left).
    pub async fn load_next_page(&self) -> AppResult<Option<PageOutcome>> {
        let request = {
            let mut session = self.session.lock().await;
            session.begin_next_page()
        };
        let Some(request) = request else {
            return Ok(None);
        };

        log::info!(
            "[load_next_page] page={} limit={} sort={}",
            request.page,
            request.limit,
            request.sort_order.as_str()
        );
        let result = self
            .api
            .list_songs(request.limit, request.page, request.sort_order)
            .await;

        let mut session = self.session.lock().await;
        session.complete_page(request, result).map(Some)
    }

    /// The list was scrolled to `distance_px` from its bottom. Loads the next
    /// page once scrolling has settled near the bottom.
    pub async fn on_scroll(&self, distance_px: f64) -> AppResult<Option<PageOutcome>> {
        let ticket = self.scroll_generation.fetch_add(1, Ordering::SeqCst) + 1;
        if distance_px > self.timings.scroll_threshold_px {
            return Ok(None);
        }
        tokio::time::sleep(self.timings.scroll_debounce).await;
        if self.scroll_generation.load(Ordering::SeqCst) != ticket {
            log::debug!("[on_scroll] superseded by newer scroll");
            return Ok(None);
        }
        self.load_next_page().await
    }

    /// Switch sort order and fetch the first page under the new order.
    pub async fn set_sort_order(&self, order: SortOrder) -> AppResult<Option<PageOutcome>> {
        let request = {
            let mut session = self.session.lock().await;
            session.set_sort_order(order)
        };
        let Some(request) = request else {
            return Ok(None);
        };
        let result = self
            .api
            .list_songs(request.limit, request.page, request.sort_order)
            .await;
        let mut session = self.session.lock().await;
        session.complete_page(request, result).map(Some)
    }

    /// Debounced search. Returns whether this call's results were applied.
    pub async fn search(&self, query: &str) -> AppResult<bool> {
        let ticket = self.session.lock().await.search_input(query);
        tokio::time::sleep(self.timings.search_debounce).await;

        let request = self.session.lock().await.search_ready(ticket);
        let Some(request) = request else {
            return Ok(false);
        };

        log::info!("[search] query={:?}", request.query);
        let result = self.api.search_songs(&request.query).await;
        let mut session = self.session.lock().await;
        session.complete_search(request, result)
    }

    /// Delete `song_id` if `secret` is accepted. `Ok(false)` means another
    /// delete was already running.
    pub async fn confirm_delete(&self, song_id: &str, secret: &str) -> AppResult<bool> {
        let ticket = self.session.lock().await.begin_delete(song_id, secret)?;
        let Some(ticket) = ticket else {
            return Ok(false);
        };

        log::info!("[delete] id={}", ticket.song_id);
        let result = self.api.delete_song(&ticket.song_id).await;
        let mut session = self.session.lock().await;
        session.complete_delete(ticket, result)?;
        Ok(true)
    }

    /// Open the delete prompt for the current song and confirm it.
    pub async fn delete_current(&self, secret: &str) -> AppResult<bool> {
        let song = self.session.lock().await.open_delete_prompt()?;
        self.confirm_delete(&song.id, secret).await
    }

    /// Download the current song. `Ok(None)` means a download was already
    /// running.
    pub async fn download_current(&self) -> AppResult<Option<PathBuf>> {
        let ticket = {
            let mut session = self.session.lock().await;
            let song = session
                .current_song()
                .cloned()
                .ok_or_else(|| AppError::InvalidInput("No song is selected".into()))?;
            session.begin_download(&song)?
        };
        let Some(ticket) = ticket else {
            return Ok(None);
        };

        log::info!("[download] id={} as {}", ticket.song_id, ticket.file_name);
        let result = match self.api.fetch_song_file(&ticket.url).await {
            Ok(bytes) => self.downloads.save(&ticket.file_name, bytes).await,
            Err(e) => Err(e),
        };
        let mut session = self.session.lock().await;
        session.complete_download(ticket, result).map(Some)
    }

    /// Upload a batch. `Ok(None)` means an upload was already running.
    pub async fn upload(&self, files: Vec<UploadFile>) -> AppResult<Option<UploadReport>> {
        if !self.session.lock().await.begin_upload(files.len())? {
            return Ok(None);
        }
        log::info!("[upload] sending {} file(s)", files.len());
        let result = self.api.upload_songs(files).await;
        let mut session = self.session.lock().await;
        session.complete_upload(result).map(Some)
    }

    /// Poll the engine on a fixed cadence for progress and ended events.
    pub fn spawn_progress_loop(&self) -> JoinHandle<()> {
        let session = Arc::clone(&self.session);
        let interval = self.timings.progress_interval;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let mut session = session.lock().await;
                if let Err(e) = session.tick() {
                    log::warn!("[progress] {}", e);
                }
            }
        })
    }
}
