//! The library's song list: paged in from the backend, deduplicated by id,
//! invalidated when the sort order changes. Also holds the debounced search
//! box, which is a separate non-paginated lookup.

use crate::api::models::{Song, SortOrder};
use crate::error::AppResult;
use std::collections::{HashMap, HashSet};

/// A page fetch that has been started. Results are only applied if the
/// catalog has not been reset since the request was issued.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
    pub sort_order: SortOrder,
    generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    Applied { added: usize, has_more: bool },
    /// The catalog was reset while the request was in flight.
    Discarded,
}

pub struct SongCatalog {
    songs: Vec<Song>,
    positions: HashMap<String, usize>,
    /// Ids deleted this session. Responses already in flight may still carry them.
    deleted: HashSet<String>,
    sort_order: SortOrder,
    page: u32,
    page_size: u32,
    has_more: bool,
    loading: bool,
    generation: u64,
    last_error: Option<String>,
}

impl SongCatalog {
    pub fn new(page_size: u32) -> Self {
        Self {
            songs: Vec::new(),
            positions: HashMap::new(),
            deleted: HashSet::new(),
            sort_order: SortOrder::Asc,
            page: 1,
            page_size: page_size.max(1),
            has_more: true,
            loading: false,
            generation: 0,
            last_error: None,
        }
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Song> {
        self.songs.get(index)
    }

    pub fn find(&self, id: &str) -> Option<&Song> {
        self.position_of(id).and_then(|i| self.songs.get(i))
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn is_deleted(&self, id: &str) -> bool {
        self.deleted.contains(id)
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether a `begin_next_page` call would start a fetch.
    pub fn can_load_more(&self) -> bool {
        !self.loading && self.has_more
    }

    /// Start fetching the next page. Returns `None` (a no-op) while a fetch is
    /// outstanding or once pagination is exhausted.
    pub fn begin_next_page(&mut self) -> Option<PageRequest> {
        if !self.can_load_more() {
            log::debug!(
                "[catalog] next page not eligible (loading={}, has_more={})",
                self.loading,
                self.has_more
            );
            return None;
        }
        self.loading = true;
        Some(PageRequest {
            page: self.page,
            limit: self.page_size,
            sort_order: self.sort_order,
            generation: self.generation,
        })
    }

    /// Apply the result of a fetch started by `begin_next_page`.
    ///
    /// On failure the songs and cursor are left as they were and the error is
    /// returned after the loading flag is cleared.
    pub fn complete_page(
        &mut self,
        request: PageRequest,
        result: AppResult<Vec<Song>>,
    ) -> AppResult<PageOutcome> {
        if self.is_stale(&request) {
            log::debug!(
                "[catalog] discarding stale page {} ({})",
                request.page,
                request.sort_order.as_str()
            );
            return Ok(PageOutcome::Discarded);
        }

        self.loading = false;
        match result {
            Ok(songs) => {
                let count = songs.len();
                let added = self.merge(songs);
                self.has_more = count >= request.limit as usize;
                self.page = request.page + 1;
                self.last_error = None;
                Ok(PageOutcome::Applied {
                    added,
                    has_more: self.has_more,
                })
            }
            Err(e) => {
                log::warn!("[catalog] page {} failed: {}", request.page, e);
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn is_stale(&self, request: &PageRequest) -> bool {
        request.generation != self.generation || request.sort_order != self.sort_order
    }

    /// Merge songs by id. A song already present keeps its position but takes
    /// the newer fields; deleted ids are skipped. Returns how many ids were new.
    pub fn merge(&mut self, incoming: Vec<Song>) -> usize {
        let mut added = 0;
        for song in incoming {
            if self.deleted.contains(&song.id) {
                log::debug!("[catalog] skipping deleted id={}", song.id);
                continue;
            }
            let existing = self.positions.get(&song.id).copied();
            match existing {
                Some(index) => self.songs[index] = song,
                None => {
                    self.positions.insert(song.id.clone(), self.songs.len());
                    self.songs.push(song);
                    added += 1;
                }
            }
        }
        added
    }

    /// Switch sort order. A change drops every song and resets the cursor;
    /// returns whether anything changed.
    pub fn set_sort_order(&mut self, order: SortOrder) -> bool {
        if order == self.sort_order {
            return false;
        }
        self.sort_order = order;
        self.songs.clear();
        self.positions.clear();
        self.page = 1;
        self.has_more = true;
        self.loading = false;
        self.last_error = None;
        self.generation += 1;
        true
    }

    /// Remove a song and keep it out of later merges. Already-fetched pages
    /// are not re-fetched.
    pub fn remove_song(&mut self, id: &str) -> Option<Song> {
        self.deleted.insert(id.to_string());
        let index = self.positions.remove(id)?;
        let removed = self.songs.remove(index);
        for position in self.positions.values_mut() {
            if *position > index {
                *position -= 1;
            }
        }
        Some(removed)
    }
}

/// Handle for one keystroke's worth of search input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    generation: u64,
}

/// Debounced search state. Every keystroke issues a ticket; only the newest
/// ticket may go to the network, and only the newest request may set results.
#[derive(Default)]
pub struct SearchBox {
    generation: u64,
    query: String,
    results: Vec<Song>,
    last_error: Option<String>,
}

impl SearchBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[Song] {
        &self.results
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Drop a deleted song from the current results.
    pub fn forget(&mut self, id: &str) {
        self.results.retain(|song| song.id != id);
    }

    pub fn on_input(&mut self, query: &str) -> SearchTicket {
        self.generation += 1;
        self.query = query.to_string();
        SearchTicket(self.generation)
    }

    /// Called once the debounce interval has elapsed for `ticket`. Returns the
    /// request to send, or `None` if newer input arrived or the query is empty
    /// (in which case results are cleared locally).
    pub fn ready(&mut self, ticket: SearchTicket) -> Option<SearchRequest> {
        if ticket.0 != self.generation {
            return None;
        }
        let query = self.query.trim();
        if query.is_empty() {
            self.results.clear();
            self.last_error = None;
            return None;
        }
        Some(SearchRequest {
            query: query.to_string(),
            generation: self.generation,
        })
    }

    pub fn is_current(&self, ticket: SearchTicket) -> bool {
        ticket.0 == self.generation
    }

    /// Returns `Ok(true)` if the results were applied, `Ok(false)` if the
    /// request was superseded.
    pub fn complete(
        &mut self,
        request: SearchRequest,
        result: AppResult<Vec<Song>>,
    ) -> AppResult<bool> {
        if request.generation != self.generation {
            return Ok(false);
        }
        match result {
            Ok(songs) => {
                self.results = songs;
                self.last_error = None;
                Ok(true)
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }
}
