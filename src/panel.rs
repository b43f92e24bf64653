/// Visibility of the now-playing panel.
///
/// `open_trigger` counts hidden-to-shown transitions only; the presentation
/// layer replays its entrance animation when the number changes, so showing an
/// already visible panel must not bump it.
#[derive(Debug, Default)]
pub struct PanelPresenter {
    open: bool,
    open_trigger: u64,
}

impl PanelPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open_trigger(&self) -> u64 {
        self.open_trigger
    }

    /// A song became current. Returns the new trigger value if this opened
    /// the panel.
    pub fn song_shown(&mut self) -> Option<u64> {
        if self.open {
            return None;
        }
        self.open = true;
        self.open_trigger += 1;
        Some(self.open_trigger)
    }

    /// There is no current song any more.
    pub fn song_cleared(&mut self) -> bool {
        std::mem::replace(&mut self.open, false)
    }

    /// Closing waits for nothing: while a download is running it is simply
    /// refused, and the caller has to ask again later.
    pub fn request_close(&mut self, downloading: bool) -> bool {
        if downloading {
            log::info!("[panel] close refused while a download is in progress");
            return false;
        }
        self.song_cleared();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_counts_openings_not_refreshes() {
        let mut panel = PanelPresenter::new();
        assert_eq!(panel.song_shown(), Some(1));
        assert_eq!(panel.song_shown(), None);
        assert_eq!(panel.open_trigger(), 1);

        panel.song_cleared();
        assert_eq!(panel.song_shown(), Some(2));
    }

    #[test]
    fn close_refused_while_downloading() {
        let mut panel = PanelPresenter::new();
        panel.song_shown();
        assert!(!panel.request_close(true));
        assert!(panel.is_open());
        assert!(panel.request_close(false));
        assert!(!panel.is_open());
    }
}
