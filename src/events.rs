use crate::audio::queue::RepeatMode;
use serde::Serialize;

pub const PLAYBACK_PROGRESS: &str = "playback:progress";
pub const PLAYBACK_TRACK_CHANGED: &str = "playback:track-changed";
pub const PLAYBACK_STATE_CHANGED: &str = "playback:state-changed";
pub const PLAYBACK_MODES_CHANGED: &str = "playback:modes-changed";
pub const PANEL_OPENED: &str = "panel:opened";
pub const PANEL_CLOSED: &str = "panel:closed";
pub const CATALOG_CHANGED: &str = "catalog:changed";
pub const SEARCH_RESULTS: &str = "search:results";
pub const NOTICE: &str = "notice";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPayload {
    pub position: f64,
    pub duration: f64,
    pub position_fraction: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackChangedPayload {
    pub song_id: String,
    pub title: String,
    pub duration: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StateChangedPayload {
    pub state: PlaybackState,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPayload {
    pub len: usize,
    pub page: u32,
    pub has_more: bool,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A message meant for the user.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum SessionEvent {
    Progress(ProgressPayload),
    TrackChanged(TrackChangedPayload),
    StateChanged(StateChangedPayload),
    ModesChanged { repeat: RepeatMode, shuffle: bool },
    PanelOpened { trigger: u64 },
    PanelClosed,
    CatalogChanged(CatalogPayload),
    SearchResults { query: String, count: usize },
    Notice(Notice),
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Progress(_) => PLAYBACK_PROGRESS,
            SessionEvent::TrackChanged(_) => PLAYBACK_TRACK_CHANGED,
            SessionEvent::StateChanged(_) => PLAYBACK_STATE_CHANGED,
            SessionEvent::ModesChanged { .. } => PLAYBACK_MODES_CHANGED,
            SessionEvent::PanelOpened { .. } => PANEL_OPENED,
            SessionEvent::PanelClosed => PANEL_CLOSED,
            SessionEvent::CatalogChanged(_) => CATALOG_CHANGED,
            SessionEvent::SearchResults { .. } => SEARCH_RESULTS,
            SessionEvent::Notice(_) => NOTICE,
        }
    }

    pub fn state(state: PlaybackState) -> Self {
        SessionEvent::StateChanged(StateChangedPayload { state })
    }
}

/// Where the session reports what the presentation layer should show.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SessionEvent);
}

/// Drops everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: SessionEvent) {}
}

impl EventSink for tokio::sync::mpsc::UnboundedSender<SessionEvent> {
    fn emit(&self, event: SessionEvent) {
        if self.send(event).is_err() {
            log::debug!("event receiver dropped");
        }
    }
}
