//! The player aggregate. Everything the library view can do goes through
//! `PlayerSession`; asynchronous work is split into `begin_*` and
//! `complete_*` halves so the caller can release the session while a request
//! is in flight.

use crate::actions::{ActionCoordinator, DeleteGate, DeleteTicket, DownloadTicket, SecretCheck};
use crate::api::models::{Song, SortOrder, UploadIssue, UploadReport};
use crate::audio::engine::{AudioOutput, EngineEvent, PlaybackEngine};
use crate::audio::queue::{AdvanceCause, Direction, QueueController, RepeatMode, Transition};
use crate::catalog::{PageOutcome, PageRequest, SearchBox, SearchRequest, SearchTicket, SongCatalog};
use crate::error::{AppError, AppResult};
use crate::events::{
    CatalogPayload, EventSink, Notice, NoticeLevel, PlaybackState, ProgressPayload, SessionEvent,
    TrackChangedPayload,
};
use crate::panel::PanelPresenter;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

pub const END_OF_LIST_NOTICE: &str = "You have reached the end of the list.";
pub const EMPTY_UPLOAD_NOTICE: &str = "Please select at least one file.";

/// Read-only view of the session for status output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub current_song: Option<Song>,
    pub is_playing: bool,
    pub current_time: f64,
    pub duration: f64,
    pub repeat_mode: RepeatMode,
    pub shuffle: bool,
    pub sort_order: SortOrder,
    pub catalog_len: usize,
    pub page: u32,
    pub has_more: bool,
    pub catalog_loading: bool,
    pub panel_open: bool,
    pub panel_trigger: u64,
    pub deleting: bool,
    pub downloading: bool,
    pub uploading: bool,
}

pub struct PlayerSession {
    catalog: SongCatalog,
    search: SearchBox,
    engine: PlaybackEngine,
    queue: QueueController,
    panel: PanelPresenter,
    actions: ActionCoordinator,
    current: Option<Song>,
    is_playing: bool,
    current_time: f64,
    duration: f64,
    /// Song the delete confirmation is open for
    delete_prompt: Option<Song>,
    end_of_list_reported: bool,
    last_notice: Option<Notice>,
    events: Arc<dyn EventSink>,
    rng: StdRng,
}

impl PlayerSession {
    pub fn new(
        page_size: u32,
        output: Box<dyn AudioOutput>,
        secret: Arc<dyn SecretCheck>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            catalog: SongCatalog::new(page_size),
            search: SearchBox::new(),
            engine: PlaybackEngine::new(output),
            queue: QueueController::new(),
            panel: PanelPresenter::new(),
            actions: ActionCoordinator::new(secret),
            current: None,
            is_playing: false,
            current_time: 0.0,
            duration: 0.0,
            delete_prompt: None,
            end_of_list_reported: false,
            last_notice: None,
            events,
            rng: StdRng::from_entropy(),
        }
    }

    /// Fix the shuffle sequence, for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn catalog(&self) -> &SongCatalog {
        &self.catalog
    }

    pub fn search(&self) -> &SearchBox {
        &self.search
    }

    pub fn panel(&self) -> &PanelPresenter {
        &self.panel
    }

    pub fn actions(&self) -> &ActionCoordinator {
        &self.actions
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.current.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.queue.repeat_mode()
    }

    pub fn shuffle(&self) -> bool {
        self.queue.shuffle()
    }

    pub fn delete_prompt(&self) -> Option<&Song> {
        self.delete_prompt.as_ref()
    }

    pub fn last_notice(&self) -> Option<&Notice> {
        self.last_notice.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_song: self.current.clone(),
            is_playing: self.is_playing,
            current_time: self.current_time,
            duration: self.duration,
            repeat_mode: self.queue.repeat_mode(),
            shuffle: self.queue.shuffle(),
            sort_order: self.catalog.sort_order(),
            catalog_len: self.catalog.len(),
            page: self.catalog.page(),
            has_more: self.catalog.has_more(),
            catalog_loading: self.catalog.is_loading(),
            panel_open: self.panel.is_open(),
            panel_trigger: self.panel.open_trigger(),
            deleting: self.actions.is_deleting(),
            downloading: self.actions.is_downloading(),
            uploading: self.actions.is_uploading(),
        }
    }

    // ---- playback ----

    /// Play `song`, or toggle play/pause if it is already the current song.
    pub fn select_song(&mut self, song: &Song) -> AppResult<()> {
        if self.is_current(&song.id) {
            return self.play_pause();
        }
        log::info!("[select_song] id={} title={}", song.id, song.title);
        self.start_song(song.clone())
    }

    /// Select the catalog entry at `index`.
    pub fn select_index(&mut self, index: usize) -> AppResult<()> {
        let song = self
            .catalog
            .get(index)
            .cloned()
            .ok_or_else(|| AppError::InvalidInput(format!("No song at position {}", index + 1)))?;
        self.select_song(&song)
    }

    pub fn play_pause(&mut self) -> AppResult<()> {
        if self.current.is_none() {
            log::debug!("[play_pause] nothing loaded");
            return Ok(());
        }
        if self.is_playing {
            self.engine.pause();
            self.is_playing = false;
            self.emit(SessionEvent::state(PlaybackState::Paused));
        } else {
            self.engine.play()?;
            self.is_playing = true;
            self.emit(SessionEvent::state(PlaybackState::Playing));
        }
        Ok(())
    }

    /// Seek within the current song. Returns the clamped position, or `None`
    /// when nothing is loaded.
    pub fn seek(&mut self, seconds: f64) -> Option<f64> {
        self.current.as_ref()?;
        let position = self.engine.seek(seconds);
        self.current_time = position;
        self.emit_progress();
        Some(position)
    }

    pub fn next(&mut self) -> AppResult<()> {
        self.advance(Direction::Next, AdvanceCause::UserRequest)
    }

    pub fn previous(&mut self) -> AppResult<()> {
        self.advance(Direction::Previous, AdvanceCause::UserRequest)
    }

    pub fn advance(&mut self, direction: Direction, cause: AdvanceCause) -> AppResult<()> {
        if self.current.is_none() {
            log::debug!("[advance] nothing loaded");
            return Ok(());
        }
        let len = self.catalog.len();
        let index = self.current_index();
        let before = self.queue.repeat_mode();
        let transition = self
            .queue
            .resolve(len, index, direction, cause, &mut self.rng);
        log::debug!(
            "[advance] {:?}/{:?} from {:?} of {} => {:?}",
            direction,
            cause,
            index,
            len,
            transition
        );
        if self.queue.repeat_mode() != before {
            self.emit_modes();
        }

        match transition {
            Transition::Play(target) => {
                let Some(song) = self.catalog.get(target).cloned() else {
                    self.clear_current();
                    return Ok(());
                };
                match self.start_song(song) {
                    Err(e @ AppError::NotPlayable(_)) if cause == AdvanceCause::TrackEnded => {
                        // Stay on the finished song rather than skipping on.
                        self.engine.pause();
                        if self.is_playing {
                            self.is_playing = false;
                            self.emit(SessionEvent::state(PlaybackState::Paused));
                        }
                        Err(e)
                    }
                    other => other,
                }
            }
            Transition::Replay => {
                self.engine.replay()?;
                self.current_time = 0.0;
                self.is_playing = true;
                self.emit_progress();
                self.emit(SessionEvent::state(PlaybackState::Playing));
                Ok(())
            }
            Transition::Stop | Transition::Clear => {
                self.clear_current();
                Ok(())
            }
        }
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        let shuffle = self.queue.toggle_shuffle();
        self.emit_modes();
        shuffle
    }

    pub fn cycle_repeat(&mut self) -> RepeatMode {
        let mode = self.queue.cycle_repeat();
        self.emit_modes();
        mode
    }

    /// React to a notification from the engine. Anything raised for a song
    /// that is no longer current is dropped.
    pub fn handle_engine_event(&mut self, event: EngineEvent) -> AppResult<()> {
        if !self.is_current(event.song_id()) {
            log::debug!("[engine_event] ignoring stale {:?}", event);
            return Ok(());
        }
        match event {
            EngineEvent::MetadataLoaded { duration, .. } => {
                self.duration = duration;
                self.current_time = self.clamp_time(self.current_time);
                Ok(())
            }
            EngineEvent::TimeUpdate { position, .. } => {
                self.current_time = self.clamp_time(position);
                self.emit_progress();
                Ok(())
            }
            EngineEvent::Ended { song_id } => {
                log::info!("[engine_event] ended id={}", song_id);
                self.current_time = self.duration;
                self.advance(Direction::Next, AdvanceCause::TrackEnded)
            }
        }
    }

    /// Poll the engine once and apply what it reports.
    pub fn tick(&mut self) -> AppResult<()> {
        let mut first_error = None;
        for event in self.engine.poll() {
            if let Err(e) = self.handle_engine_event(event) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Close the now-playing panel, stopping playback. Refused while a
    /// download is running.
    pub fn request_close_panel(&mut self) -> bool {
        if !self.panel.request_close(self.actions.is_downloading()) {
            self.notify(Notice::info("Please wait for the download to finish."));
            return false;
        }
        self.release_current();
        self.emit(SessionEvent::PanelClosed);
        true
    }

    // ---- catalog ----

    /// Start loading the next page, if one may be loaded now.
    pub fn begin_next_page(&mut self) -> Option<PageRequest> {
        self.catalog.begin_next_page()
    }

    pub fn complete_page(
        &mut self,
        request: PageRequest,
        result: AppResult<Vec<Song>>,
    ) -> AppResult<PageOutcome> {
        match self.catalog.complete_page(request, result) {
            Ok(PageOutcome::Applied { added, has_more }) => {
                log::info!("[catalog] added {} songs, has_more={}", added, has_more);
                self.emit_catalog();
                if !has_more && !self.end_of_list_reported {
                    self.end_of_list_reported = true;
                    self.notify(Notice::info(END_OF_LIST_NOTICE));
                }
                Ok(PageOutcome::Applied { added, has_more })
            }
            Ok(PageOutcome::Discarded) => Ok(PageOutcome::Discarded),
            Err(e) => {
                self.notify(Notice::error(format!("Could not load songs: {}", e)));
                Err(e)
            }
        }
    }

    /// Change sort order. A real change stops playback, empties the catalog
    /// and returns the request for the new first page.
    pub fn set_sort_order(&mut self, order: SortOrder) -> Option<PageRequest> {
        if !self.catalog.set_sort_order(order) {
            return None;
        }
        log::info!("[sort] order={}", order.as_str());
        if self.current.is_some() {
            self.clear_current();
        }
        self.end_of_list_reported = false;
        self.emit_catalog();
        self.catalog.begin_next_page()
    }

    pub fn search_input(&mut self, query: &str) -> SearchTicket {
        self.search.on_input(query)
    }

    /// The debounce interval for `ticket` has passed.
    pub fn search_ready(&mut self, ticket: SearchTicket) -> Option<SearchRequest> {
        let request = self.search.ready(ticket);
        if request.is_none() && self.search.is_current(ticket) {
            self.emit(SessionEvent::SearchResults {
                query: String::new(),
                count: 0,
            });
        }
        request
    }

    pub fn complete_search(
        &mut self,
        request: SearchRequest,
        result: AppResult<Vec<Song>>,
    ) -> AppResult<bool> {
        let query = request.query.clone();
        let result = result.map(|songs| {
            songs
                .into_iter()
                .filter(|song| !self.catalog.is_deleted(&song.id))
                .collect()
        });
        match self.search.complete(request, result) {
            Ok(true) => {
                self.emit(SessionEvent::SearchResults {
                    query,
                    count: self.search.results().len(),
                });
                Ok(true)
            }
            Ok(false) => {
                log::debug!("[search] dropping superseded results for {:?}", query);
                Ok(false)
            }
            Err(e) => {
                self.notify(Notice::error(format!("Search failed: {}", e)));
                Err(e)
            }
        }
    }

    // ---- delete ----

    /// Open the delete confirmation for the current song. Playback pauses
    /// while the prompt is up.
    pub fn open_delete_prompt(&mut self) -> AppResult<Song> {
        let song = self
            .current
            .clone()
            .ok_or_else(|| AppError::InvalidInput("No song is selected".into()))?;
        if self.is_playing {
            self.engine.pause();
            self.is_playing = false;
            self.emit(SessionEvent::state(PlaybackState::Paused));
        }
        self.delete_prompt = Some(song.clone());
        Ok(song)
    }

    /// Dismiss the prompt. Not possible while the delete is being sent.
    pub fn cancel_delete_prompt(&mut self) -> bool {
        if self.actions.is_deleting() {
            return false;
        }
        self.delete_prompt = None;
        true
    }

    /// Check the password for deleting `song_id`. `Ok(None)` means another
    /// delete is still running.
    pub fn begin_delete(&mut self, song_id: &str, secret: &str) -> AppResult<Option<DeleteTicket>> {
        match self.actions.begin_delete(song_id, secret) {
            DeleteGate::Proceed(ticket) => Ok(Some(ticket)),
            DeleteGate::Busy => Ok(None),
            DeleteGate::Rejected => {
                self.close_delete_prompt(song_id);
                let e = AppError::InvalidCredential;
                self.notify(Notice::error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Apply the backend's answer to a delete. On success the song leaves the
    /// catalog and, if it was playing, the session moves on the way an ended
    /// track would.
    pub fn complete_delete(&mut self, ticket: DeleteTicket, result: AppResult<()>) -> AppResult<()> {
        let song_id = ticket.song_id.clone();
        self.actions.finish_delete(ticket);

        if let Err(e) = result {
            self.notify(Notice::error(format!("Could not delete the song: {}", e)));
            return Err(e);
        }

        self.close_delete_prompt(&song_id);
        let was_current = self.is_current(&song_id);
        let successor = if was_current {
            Some(self.resolve_successor_of(&song_id))
        } else {
            None
        };

        self.catalog.remove_song(&song_id);
        self.search.forget(&song_id);
        log::info!("[delete] removed id={}", song_id);

        let outcome = match successor {
            Some(successor) => self.play_successor(successor),
            None => Ok(()),
        };
        self.emit_catalog();
        self.notify(Notice::info("Song deleted successfully."));
        outcome
    }

    fn resolve_successor_of(&mut self, song_id: &str) -> Successor {
        let index = self.catalog.position_of(song_id);
        let before = self.queue.repeat_mode();
        let transition = self.queue.resolve(
            self.catalog.len(),
            index,
            Direction::Next,
            AdvanceCause::TrackEnded,
            &mut self.rng,
        );
        if self.queue.repeat_mode() != before {
            self.emit_modes();
        }
        match (transition, index) {
            (Transition::Play(target), Some(index)) if target != index => self
                .catalog
                .get(target)
                .map(|song| Successor::Song(song.id.clone()))
                .unwrap_or(Successor::Stop),
            (Transition::Play(_), Some(index)) | (Transition::Replay, Some(index)) => {
                Successor::Position(index)
            }
            _ => Successor::Stop,
        }
    }

    fn play_successor(&mut self, successor: Successor) -> AppResult<()> {
        let song = match successor {
            Successor::Song(id) => self.catalog.find(&id).cloned(),
            Successor::Position(_) if self.catalog.is_empty() => None,
            Successor::Position(index) => {
                let index = if index < self.catalog.len() { index } else { 0 };
                self.catalog.get(index).cloned()
            }
            Successor::Stop => None,
        };
        let Some(song) = song else {
            self.clear_current();
            return Ok(());
        };
        let result = self.start_song(song);
        if result.is_err() {
            // The deleted song cannot stay current.
            self.clear_current();
        }
        result
    }

    fn close_delete_prompt(&mut self, song_id: &str) {
        if self.delete_prompt.as_ref().is_some_and(|s| s.id == song_id) {
            self.delete_prompt = None;
        }
    }

    // ---- download / upload ----

    /// Start downloading `song`. `Ok(None)` means a download is already running.
    pub fn begin_download(&mut self, song: &Song) -> AppResult<Option<DownloadTicket>> {
        match self.actions.begin_download(song) {
            Ok(ticket) => Ok(ticket),
            Err(e) => {
                self.notify(Notice::error(e.to_string()));
                Err(e)
            }
        }
    }

    pub fn complete_download(
        &mut self,
        ticket: DownloadTicket,
        result: AppResult<PathBuf>,
    ) -> AppResult<PathBuf> {
        let song_id = ticket.song_id.clone();
        self.actions.finish_download(ticket);
        match result {
            Ok(path) => {
                log::info!("[download] id={} saved to {}", song_id, path.display());
                self.notify(Notice::info(format!("Downloaded to {}", path.display())));
                Ok(path)
            }
            Err(e) => {
                self.notify(Notice::error(format!("Download failed: {}", e)));
                Err(e)
            }
        }
    }

    /// Gate an upload of `file_count` files. `Ok(false)` means an upload is
    /// already running.
    pub fn begin_upload(&mut self, file_count: usize) -> AppResult<bool> {
        if file_count == 0 {
            self.notify(Notice::error(EMPTY_UPLOAD_NOTICE));
            return Err(AppError::InvalidInput(EMPTY_UPLOAD_NOTICE.into()));
        }
        Ok(self.actions.begin_upload())
    }

    pub fn complete_upload(&mut self, result: AppResult<UploadReport>) -> AppResult<UploadReport> {
        self.actions.finish_upload();
        match result {
            Ok(report) => {
                for issue in &report.issues {
                    match issue {
                        UploadIssue::Conflict(message) => {
                            self.notify(Notice::error(format!("Already exists: {}", message)))
                        }
                        UploadIssue::Failed(message) => self.notify(Notice::error(message.clone())),
                    }
                }
                let uploaded = report.files_sent.saturating_sub(report.issues.len());
                if uploaded > 0 {
                    self.notify(Notice::info(format!("Uploaded {} file(s).", uploaded)));
                }
                Ok(report)
            }
            Err(AppError::Conflict(message)) => {
                self.notify(Notice::error(message.clone()));
                Err(AppError::Conflict(message))
            }
            Err(e) => {
                self.notify(Notice::error(format!("Upload failed: {}", e)));
                Err(e)
            }
        }
    }

    // ---- internals ----

    fn is_current(&self, song_id: &str) -> bool {
        self.current.as_ref().is_some_and(|s| s.id == song_id)
    }

    fn current_index(&self) -> Option<usize> {
        self.current
            .as_ref()
            .and_then(|s| self.catalog.position_of(&s.id))
    }

    /// Make `song` current and play it from 0. On failure nothing changes.
    fn start_song(&mut self, song: Song) -> AppResult<()> {
        if let Err(e) = self.engine.load_and_play(&song) {
            log::warn!("[play] id={} failed: {}", song.id, e);
            self.notify(Notice::error(e.to_string()));
            return Err(e);
        }
        self.current_time = 0.0;
        self.duration = self.engine.duration();
        self.is_playing = true;
        self.emit(SessionEvent::TrackChanged(TrackChangedPayload {
            song_id: song.id.clone(),
            title: song.title.clone(),
            duration: self.duration,
        }));
        self.current = Some(song);
        self.emit(SessionEvent::state(PlaybackState::Playing));
        if let Some(trigger) = self.panel.song_shown() {
            self.emit(SessionEvent::PanelOpened { trigger });
        }
        Ok(())
    }

    /// Stop and forget the current song without touching the panel.
    fn release_current(&mut self) {
        self.engine.unload();
        let had_song = self.current.take().is_some();
        self.is_playing = false;
        self.current_time = 0.0;
        self.duration = 0.0;
        if had_song {
            self.emit(SessionEvent::state(PlaybackState::Stopped));
        }
    }

    fn clear_current(&mut self) {
        self.release_current();
        if self.panel.song_cleared() {
            self.emit(SessionEvent::PanelClosed);
        }
    }

    fn clamp_time(&self, position: f64) -> f64 {
        let position = if position.is_finite() { position.max(0.0) } else { 0.0 };
        if self.duration > 0.0 {
            position.min(self.duration)
        } else {
            position
        }
    }

    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => log::info!("[notice] {}", notice.message),
            NoticeLevel::Error => log::warn!("[notice] {}", notice.message),
        }
        self.last_notice = Some(notice.clone());
        self.emit(SessionEvent::Notice(notice));
    }

    fn emit(&self, event: SessionEvent) {
        self.events.emit(event);
    }

    fn emit_progress(&self) {
        let fraction = if self.duration > 0.0 {
            self.current_time / self.duration
        } else {
            0.0
        };
        self.emit(SessionEvent::Progress(ProgressPayload {
            position: self.current_time,
            duration: self.duration,
            position_fraction: fraction,
        }));
    }

    fn emit_modes(&self) {
        self.emit(SessionEvent::ModesChanged {
            repeat: self.queue.repeat_mode(),
            shuffle: self.queue.shuffle(),
        });
    }

    fn emit_catalog(&self) {
        self.emit(SessionEvent::CatalogChanged(CatalogPayload {
            len: self.catalog.len(),
            page: self.catalog.page(),
            has_more: self.catalog.has_more(),
        }));
    }
}

/// Who plays after the current song is deleted.
enum Successor {
    Song(String),
    /// Whatever ends up at this index once the deleted song is gone
    Position(usize),
    Stop,
}
