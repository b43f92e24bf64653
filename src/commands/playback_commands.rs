use super::format_time;
use crate::app::PlayerApp;
use crate::audio::queue::RepeatMode;
use crate::error::AppResult;

pub async fn play(app: &PlayerApp, position: usize) -> AppResult<String> {
    log::info!("[play] position={}", position);
    let mut session = app.session().lock().await;
    session.select_index(position.saturating_sub(1))?;
    Ok(now_playing(
        session.current_song().map(|s| s.title.as_str()),
        session.is_playing(),
    ))
}

pub async fn toggle(app: &PlayerApp) -> AppResult<String> {
    let mut session = app.session().lock().await;
    session.play_pause()?;
    Ok(now_playing(
        session.current_song().map(|s| s.title.as_str()),
        session.is_playing(),
    ))
}

pub async fn next(app: &PlayerApp) -> AppResult<String> {
    let mut session = app.session().lock().await;
    session.next()?;
    Ok(now_playing(
        session.current_song().map(|s| s.title.as_str()),
        session.is_playing(),
    ))
}

pub async fn prev(app: &PlayerApp) -> AppResult<String> {
    let mut session = app.session().lock().await;
    session.previous()?;
    Ok(now_playing(
        session.current_song().map(|s| s.title.as_str()),
        session.is_playing(),
    ))
}

pub async fn seek(app: &PlayerApp, seconds: f64) -> String {
    let mut session = app.session().lock().await;
    match session.seek(seconds) {
        Some(position) => format!(
            "At {} / {}",
            format_time(position),
            format_time(session.duration())
        ),
        None => "Nothing is playing.".to_string(),
    }
}

pub async fn shuffle(app: &PlayerApp) -> String {
    let on = app.session().lock().await.toggle_shuffle();
    format!("Shuffle {}", if on { "on" } else { "off" })
}

pub async fn repeat(app: &PlayerApp) -> String {
    let mode = app.session().lock().await.cycle_repeat();
    format!("Repeat {}", repeat_label(mode))
}

pub async fn close(app: &PlayerApp) -> String {
    if app.session().lock().await.request_close_panel() {
        "Player closed.".to_string()
    } else {
        "A download is in progress, try again when it finishes.".to_string()
    }
}

pub async fn status(app: &PlayerApp) -> String {
    let snapshot = app.session().lock().await.snapshot();
    let track = match &snapshot.current_song {
        Some(song) => format!(
            "{} {} [{} / {}]",
            if snapshot.is_playing { "Playing" } else { "Paused" },
            song.title,
            format_time(snapshot.current_time),
            format_time(snapshot.duration)
        ),
        None => "Stopped".to_string(),
    };
    let mut busy = Vec::new();
    if snapshot.catalog_loading {
        busy.push("loading");
    }
    if snapshot.deleting {
        busy.push("deleting");
    }
    if snapshot.downloading {
        busy.push("downloading");
    }
    if snapshot.uploading {
        busy.push("uploading");
    }
    format!(
        "{}\nrepeat {}, shuffle {}, sort {}\n{} song(s) loaded{}{}",
        track,
        repeat_label(snapshot.repeat_mode),
        if snapshot.shuffle { "on" } else { "off" },
        snapshot.sort_order.as_str(),
        snapshot.catalog_len,
        if snapshot.has_more { "" } else { ", end of list" },
        if busy.is_empty() {
            String::new()
        } else {
            format!("\nbusy: {}", busy.join(", "))
        }
    )
}

fn repeat_label(mode: RepeatMode) -> &'static str {
    match mode {
        RepeatMode::All => "all",
        RepeatMode::One => "one",
        RepeatMode::Off => "off",
    }
}

fn now_playing(title: Option<&str>, playing: bool) -> String {
    match (title, playing) {
        (Some(title), true) => format!("Playing {}", title),
        (Some(title), false) => format!("Paused {}", title),
        (None, _) => "Stopped".to_string(),
    }
}
