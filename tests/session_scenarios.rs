//! End-to-end behavior of the player session against the simulated output.

use songdeck_lib::actions::ConfiguredSecret;
use songdeck_lib::api::models::{Song, SortOrder};
use songdeck_lib::audio::queue::RepeatMode;
use songdeck_lib::audio::simulated::{SimulatedHandle, SimulatedOutput};
use songdeck_lib::catalog::PageOutcome;
use songdeck_lib::error::AppError;
use songdeck_lib::events::{EventSink, NullSink, SessionEvent};
use songdeck_lib::session::PlayerSession;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Recorder(Mutex<Vec<SessionEvent>>);

impl EventSink for Recorder {
    fn emit(&self, event: SessionEvent) {
        self.0.lock().unwrap().push(event);
    }
}

fn song(id: &str, title: &str) -> Song {
    Song::new(id, title)
        .with_file_url(format!("https://cdn.example.com/{}.mp3", id))
        .with_duration(200.0)
}

fn new_session(page_size: u32) -> (PlayerSession, SimulatedHandle) {
    let output = SimulatedOutput::new();
    let handle = output.handle();
    let session = PlayerSession::new(
        page_size,
        Box::new(output),
        Arc::new(ConfiguredSecret::new(Some("letmein".into()))),
        Arc::new(NullSink),
    )
    .with_seed(42);
    (session, handle)
}

fn load_page(session: &mut PlayerSession, songs: Vec<Song>) {
    let request = session.begin_next_page().expect("page should be eligible");
    session.complete_page(request, Ok(songs)).unwrap();
}

fn with_songs(titles: &[&str]) -> (PlayerSession, SimulatedHandle) {
    let (mut session, handle) = new_session(50);
    let songs = titles
        .iter()
        .enumerate()
        .map(|(i, title)| song(&(i + 1).to_string(), title))
        .collect();
    load_page(&mut session, songs);
    (session, handle)
}

fn current_title(session: &PlayerSession) -> Option<String> {
    session.current_song().map(|s| s.title.clone())
}

mod navigation {
    use super::*;

    #[test]
    fn next_walks_forward_and_wraps() {
        let (mut session, _) = with_songs(&["A", "B"]);

        session.select_index(0).unwrap();
        assert_eq!(current_title(&session).as_deref(), Some("A"));
        assert!(session.is_playing());

        session.next().unwrap();
        assert_eq!(current_title(&session).as_deref(), Some("B"));

        session.next().unwrap();
        assert_eq!(current_title(&session).as_deref(), Some("A"));
    }

    #[test]
    fn previous_is_the_literal_predecessor_in_every_mode() {
        for repeat_steps in 0..3 {
            for shuffle in [false, true] {
                let (mut session, _) = with_songs(&["A", "B", "C"]);
                for _ in 0..repeat_steps {
                    session.cycle_repeat();
                }
                if shuffle {
                    session.toggle_shuffle();
                }
                session.select_index(1).unwrap();
                session.previous().unwrap();
                assert_eq!(
                    current_title(&session).as_deref(),
                    Some("A"),
                    "repeat={:?} shuffle={}",
                    session.repeat_mode(),
                    shuffle
                );
            }
        }
    }

    #[test]
    fn song_change_resets_position() {
        let (mut session, _) = with_songs(&["A", "B"]);
        session.select_index(0).unwrap();
        session.seek(90.0);
        assert_eq!(session.current_time(), 90.0);
        session.next().unwrap();
        assert_eq!(session.current_time(), 0.0);
    }

    #[test]
    fn shuffle_only_picks_listed_songs() {
        let (mut session, _) = with_songs(&["A", "B", "C", "D"]);
        session.toggle_shuffle();
        session.select_index(0).unwrap();
        for _ in 0..50 {
            session.next().unwrap();
            let id = session.current_song().unwrap().id.clone();
            assert!(session.catalog().find(&id).is_some());
        }
    }
}

mod ended_track {
    use super::*;

    #[test]
    fn repeat_one_replays_without_changing_song() {
        let (mut session, handle) = with_songs(&["A", "B"]);
        session.cycle_repeat();
        assert_eq!(session.repeat_mode(), RepeatMode::One);
        session.select_index(0).unwrap();
        session.seek(150.0);

        handle.finish();
        session.tick().unwrap();

        assert_eq!(current_title(&session).as_deref(), Some("A"));
        assert_eq!(session.current_time(), 0.0);
        assert!(session.is_playing());
        assert_eq!(handle.loads().len(), 1, "replay does not reload the source");
    }

    #[test]
    fn repeat_off_at_last_song_stops_and_rearms_repeat_all() {
        let (mut session, handle) = with_songs(&["A", "B"]);
        session.cycle_repeat();
        session.cycle_repeat();
        assert_eq!(session.repeat_mode(), RepeatMode::Off);
        session.select_index(1).unwrap();

        handle.finish();
        session.tick().unwrap();

        assert!(session.current_song().is_none());
        assert!(!session.is_playing());
        assert!(!session.panel().is_open());
        assert_eq!(session.repeat_mode(), RepeatMode::All);
    }

    #[test]
    fn repeat_off_before_the_end_advances_normally() {
        let (mut session, handle) = with_songs(&["A", "B"]);
        session.cycle_repeat();
        session.cycle_repeat();
        session.select_index(0).unwrap();

        handle.finish();
        session.tick().unwrap();

        assert_eq!(current_title(&session).as_deref(), Some("B"));
        assert_eq!(session.repeat_mode(), RepeatMode::Off);
    }

    #[test]
    fn ended_under_repeat_all_moves_to_next_song() {
        let (mut session, handle) = with_songs(&["A", "B", "C"]);
        session.select_index(2).unwrap();
        handle.finish();
        session.tick().unwrap();
        assert_eq!(current_title(&session).as_deref(), Some("A"));
    }
}

mod catalog {
    use super::*;

    #[test]
    fn overlapping_pages_keep_each_id_once() {
        let (mut session, _) = new_session(3);
        load_page(
            &mut session,
            vec![song("1", "A"), song("2", "B"), song("3", "C")],
        );
        load_page(
            &mut session,
            vec![song("3", "C (remaster)"), song("4", "D"), song("5", "E")],
        );
        let ids: Vec<_> = session
            .catalog()
            .songs()
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
        assert_eq!(session.catalog().find("3").unwrap().title, "C (remaster)");
    }

    #[test]
    fn stale_page_is_discarded_after_sort_change() {
        let (mut session, _) = new_session(2);
        load_page(&mut session, vec![song("1", "A"), song("2", "B")]);

        let asc_page_two = session.begin_next_page().unwrap();
        assert_eq!(asc_page_two.page, 2);
        assert_eq!(asc_page_two.sort_order, SortOrder::Asc);

        let desc_page_one = session.set_sort_order(SortOrder::Desc).unwrap();
        let outcome = session
            .complete_page(asc_page_two, Ok(vec![song("3", "C"), song("4", "D")]))
            .unwrap();
        assert_eq!(outcome, PageOutcome::Discarded);

        session
            .complete_page(desc_page_one, Ok(vec![song("9", "Z"), song("8", "Y")]))
            .unwrap();
        let titles: Vec<_> = session
            .catalog()
            .songs()
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Z", "Y"]);
    }

    #[test]
    fn sort_change_during_download_stops_playback_but_download_finishes() {
        let (mut session, _) = with_songs(&["A", "B"]);
        session.select_index(0).unwrap();
        let current = session.current_song().cloned().unwrap();
        let ticket = session.begin_download(&current).unwrap().unwrap();

        session.set_sort_order(SortOrder::Desc);
        assert!(session.current_song().is_none());
        assert!(!session.panel().is_open());
        assert!(session.actions().is_downloading());

        let saved = session
            .complete_download(ticket, Ok(std::path::PathBuf::from("/tmp/A.mp3")))
            .unwrap();
        assert_eq!(saved, std::path::PathBuf::from("/tmp/A.mp3"));
        assert!(!session.actions().is_downloading());
    }

    #[test]
    fn failed_page_reports_and_keeps_state() {
        let (mut session, _) = new_session(2);
        load_page(&mut session, vec![song("1", "A"), song("2", "B")]);
        let request = session.begin_next_page().unwrap();
        let result = session.complete_page(
            request,
            Err(AppError::Api {
                status: 502,
                message: "gateway".into(),
            }),
        );
        assert!(result.is_err());
        assert_eq!(session.catalog().len(), 2);
        assert!(!session.catalog().is_loading());
        assert!(session.begin_next_page().is_some(), "retry is allowed");
        assert!(session.last_notice().unwrap().message.contains("gateway"));
    }
}

mod deletion {
    use super::*;

    #[test]
    fn wrong_password_changes_nothing() {
        let (mut session, _) = with_songs(&["A", "B"]);
        session.select_index(0).unwrap();

        let result = session.begin_delete("1", "guess");
        assert!(matches!(result, Err(AppError::InvalidCredential)));
        assert_eq!(session.catalog().len(), 2);
        assert!(!session.actions().is_deleting());
        assert_eq!(current_title(&session).as_deref(), Some("A"));
        assert_eq!(
            session.last_notice().unwrap().message,
            AppError::InvalidCredential.to_string()
        );
    }

    #[test]
    fn deleting_current_song_matches_ended_next() {
        let (mut ended, ended_handle) = with_songs(&["A", "B", "C"]);
        ended.select_index(1).unwrap();
        ended_handle.finish();
        ended.tick().unwrap();

        let (mut deleted, _) = with_songs(&["A", "B", "C"]);
        deleted.select_index(1).unwrap();
        let ticket = deleted.begin_delete("2", "letmein").unwrap().unwrap();
        deleted.complete_delete(ticket, Ok(())).unwrap();

        assert_eq!(current_title(&deleted), current_title(&ended));
        assert!(deleted.catalog().find("2").is_none());
        assert_eq!(deleted.catalog().len(), 2);
    }

    #[test]
    fn deleting_last_song_under_repeat_off_stops() {
        let (mut session, _) = with_songs(&["A", "B"]);
        session.cycle_repeat();
        session.cycle_repeat();
        session.select_index(1).unwrap();
        let ticket = session.begin_delete("2", "letmein").unwrap().unwrap();
        session.complete_delete(ticket, Ok(())).unwrap();
        assert!(session.current_song().is_none());
        assert_eq!(session.repeat_mode(), RepeatMode::All);
    }

    #[test]
    fn deleting_another_song_leaves_playback_alone() {
        let (mut session, handle) = with_songs(&["A", "B", "C"]);
        session.select_index(0).unwrap();
        let ticket = session.begin_delete("3", "letmein").unwrap().unwrap();
        session.complete_delete(ticket, Ok(())).unwrap();
        assert_eq!(current_title(&session).as_deref(), Some("A"));
        assert!(session.is_playing());
        assert_eq!(handle.loads().len(), 1);
    }

    #[test]
    fn page_fetched_before_delete_does_not_bring_song_back() {
        let (mut session, _) = new_session(2);
        load_page(&mut session, vec![song("a", "A"), song("b", "B")]);
        let page_two = session.begin_next_page().unwrap();

        let ticket = session.begin_delete("b", "letmein").unwrap().unwrap();
        session.complete_delete(ticket, Ok(())).unwrap();
        session
            .complete_page(page_two, Ok(vec![song("b", "B"), song("c", "C")]))
            .unwrap();

        let ids: Vec<_> = session
            .catalog()
            .songs()
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn search_answered_after_delete_omits_the_song() {
        let (mut session, _) = with_songs(&["Blue", "Blues"]);
        let ticket = session.search_input("blue");
        let request = session.search_ready(ticket).unwrap();

        let delete = session.begin_delete("1", "letmein").unwrap().unwrap();
        session.complete_delete(delete, Ok(())).unwrap();
        let applied = session
            .complete_search(request, Ok(vec![song("1", "Blue"), song("2", "Blues")]))
            .unwrap();

        assert!(applied);
        let ids: Vec<_> = session
            .search()
            .results()
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, vec!["2"]);
    }

    #[test]
    fn second_delete_while_first_in_flight_is_a_noop() {
        let (mut session, _) = with_songs(&["A", "B"]);
        let first = session.begin_delete("1", "letmein").unwrap();
        assert!(first.is_some());
        assert!(session.begin_delete("2", "letmein").unwrap().is_none());
        assert!(session.actions().is_deleting());
    }
}

#[test]
fn events_follow_a_listening_session() {
    let output = SimulatedOutput::new();
    let recorder = Arc::new(Recorder::default());
    let mut session = PlayerSession::new(
        10,
        Box::new(output),
        Arc::new(ConfiguredSecret::new(None)),
        recorder.clone(),
    );
    load_page(&mut session, vec![song("1", "A"), song("2", "B")]);
    session.select_index(0).unwrap();
    session.play_pause().unwrap();
    session.request_close_panel();

    let names: Vec<_> = recorder
        .0
        .lock()
        .unwrap()
        .iter()
        .map(|e| e.name())
        .collect();
    assert_eq!(
        names,
        vec![
            "catalog:changed",
            "notice",
            "playback:track-changed",
            "playback:state-changed",
            "panel:opened",
            "playback:state-changed",
            "playback:state-changed",
            "panel:closed",
        ]
    );
}
