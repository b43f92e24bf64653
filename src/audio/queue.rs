use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Wrap around the catalog
    #[default]
    All,
    /// Replay the current song when it ends
    One,
    /// Stop after the last song, then fall back to `All`
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceCause {
    UserRequest,
    TrackEnded,
}

/// What the player should do after an advance request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Load and play the catalog entry at this index.
    Play(usize),
    /// Restart the current song from 0.
    Replay,
    /// The list ran out under repeat-off.
    Stop,
    /// The current song is no longer in the catalog.
    Clear,
}

/// Decides which catalog entry plays next. It holds only the listening modes;
/// the order comes from the catalog at the moment of each decision.
#[derive(Debug, Default)]
pub struct QueueController {
    repeat_mode: RepeatMode,
    shuffle: bool,
}

impl QueueController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        self.shuffle
    }

    pub fn cycle_repeat(&mut self) -> RepeatMode {
        self.repeat_mode = match self.repeat_mode {
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
            RepeatMode::Off => RepeatMode::All,
        };
        self.repeat_mode
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat_mode = mode;
    }

    /// Resolve an advance request against a catalog of `len` songs where the
    /// current song sits at `current` (`None` if it is no longer listed).
    ///
    /// `Previous` is always the literal predecessor with wraparound. Forward
    /// moves honor repeat and shuffle; an ended track under repeat-off at the
    /// last index stops and re-arms `RepeatMode::All`.
    pub fn resolve<R: Rng>(
        &mut self,
        len: usize,
        current: Option<usize>,
        direction: Direction,
        cause: AdvanceCause,
        rng: &mut R,
    ) -> Transition {
        let Some(current) = current.filter(|&i| i < len) else {
            return Transition::Clear;
        };

        if direction == Direction::Previous {
            return Transition::Play((current + len - 1) % len);
        }

        if cause == AdvanceCause::TrackEnded {
            match self.repeat_mode {
                RepeatMode::One => return Transition::Replay,
                RepeatMode::Off if current + 1 >= len => {
                    log::info!("[queue] end of list under repeat-off, stopping");
                    self.repeat_mode = RepeatMode::All;
                    return Transition::Stop;
                }
                _ => {}
            }
        }

        if self.shuffle {
            Transition::Play(rng.gen_range(0..len))
        } else {
            Transition::Play((current + 1) % len)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn cycle_repeat_rotates_all_one_off() {
        let mut queue = QueueController::new();
        assert_eq!(queue.repeat_mode(), RepeatMode::All);
        assert_eq!(queue.cycle_repeat(), RepeatMode::One);
        assert_eq!(queue.cycle_repeat(), RepeatMode::Off);
        assert_eq!(queue.cycle_repeat(), RepeatMode::All);
    }

    #[test]
    fn next_wraps_around() {
        let mut queue = QueueController::new();
        let t = queue.resolve(3, Some(2), Direction::Next, AdvanceCause::UserRequest, &mut rng());
        assert_eq!(t, Transition::Play(0));
    }

    #[test]
    fn previous_wraps_to_last() {
        let mut queue = QueueController::new();
        let t = queue.resolve(3, Some(0), Direction::Previous, AdvanceCause::UserRequest, &mut rng());
        assert_eq!(t, Transition::Play(2));
    }

    #[test]
    fn previous_ignores_every_mode() {
        for repeat in [RepeatMode::All, RepeatMode::One, RepeatMode::Off] {
            for shuffle in [false, true] {
                for cause in [AdvanceCause::UserRequest, AdvanceCause::TrackEnded] {
                    let mut queue = QueueController::new();
                    queue.set_repeat_mode(repeat);
                    if shuffle {
                        queue.toggle_shuffle();
                    }
                    let t = queue.resolve(3, Some(1), Direction::Previous, cause, &mut rng());
                    assert_eq!(t, Transition::Play(0), "{:?} shuffle={}", repeat, shuffle);
                }
            }
        }
    }

    #[test]
    fn repeat_one_replays_on_end_only() {
        let mut queue = QueueController::new();
        queue.set_repeat_mode(RepeatMode::One);
        let ended = queue.resolve(3, Some(1), Direction::Next, AdvanceCause::TrackEnded, &mut rng());
        assert_eq!(ended, Transition::Replay);
        let skipped = queue.resolve(3, Some(1), Direction::Next, AdvanceCause::UserRequest, &mut rng());
        assert_eq!(skipped, Transition::Play(2));
    }

    #[test]
    fn repeat_off_stops_at_end_and_rearms() {
        let mut queue = QueueController::new();
        queue.set_repeat_mode(RepeatMode::Off);

        let middle = queue.resolve(3, Some(0), Direction::Next, AdvanceCause::TrackEnded, &mut rng());
        assert_eq!(middle, Transition::Play(1));
        assert_eq!(queue.repeat_mode(), RepeatMode::Off);

        let last = queue.resolve(3, Some(2), Direction::Next, AdvanceCause::TrackEnded, &mut rng());
        assert_eq!(last, Transition::Stop);
        assert_eq!(queue.repeat_mode(), RepeatMode::All);
    }

    #[test]
    fn repeat_off_user_next_still_wraps() {
        let mut queue = QueueController::new();
        queue.set_repeat_mode(RepeatMode::Off);
        let t = queue.resolve(3, Some(2), Direction::Next, AdvanceCause::UserRequest, &mut rng());
        assert_eq!(t, Transition::Play(0));
        assert_eq!(queue.repeat_mode(), RepeatMode::Off);
    }

    #[test]
    fn shuffle_stays_in_bounds() {
        let mut queue = QueueController::new();
        queue.toggle_shuffle();
        let mut rng = rng();
        for _ in 0..200 {
            match queue.resolve(5, Some(3), Direction::Next, AdvanceCause::UserRequest, &mut rng) {
                Transition::Play(i) => assert!(i < 5),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn missing_current_clears() {
        let mut queue = QueueController::new();
        assert_eq!(
            queue.resolve(3, None, Direction::Next, AdvanceCause::UserRequest, &mut rng()),
            Transition::Clear
        );
        assert_eq!(
            queue.resolve(0, Some(0), Direction::Previous, AdvanceCause::UserRequest, &mut rng()),
            Transition::Clear
        );
    }
}
