use super::format_song_line;
use crate::api::models::SortOrder;
use crate::app::PlayerApp;
use crate::catalog::PageOutcome;
use crate::error::AppResult;
use crate::session::END_OF_LIST_NOTICE;

pub async fn list(app: &PlayerApp) -> String {
    let session = app.session().lock().await;
    let catalog = session.catalog();
    if catalog.is_empty() {
        return if catalog.is_loading() {
            "Loading songs...".to_string()
        } else {
            "No songs loaded. Try `more`.".to_string()
        };
    }
    let current = session.current_song().map(|s| s.id.as_str());
    let mut lines: Vec<String> = catalog
        .songs()
        .iter()
        .enumerate()
        .map(|(i, song)| format_song_line(i + 1, song, current == Some(song.id.as_str())))
        .collect();
    if !catalog.has_more() {
        lines.push(END_OF_LIST_NOTICE.to_string());
    }
    lines.join("\n")
}

fn describe_outcome(outcome: Option<PageOutcome>) -> String {
    match outcome {
        Some(PageOutcome::Applied { added, has_more }) => {
            let mut text = format!("Loaded {} new song(s).", added);
            if !has_more {
                text.push(' ');
                text.push_str(END_OF_LIST_NOTICE);
            }
            text
        }
        Some(PageOutcome::Discarded) => "Sort order changed, results dropped.".to_string(),
        None => "Nothing to load right now.".to_string(),
    }
}

pub async fn more(app: &PlayerApp) -> AppResult<String> {
    let outcome = app.load_next_page().await?;
    Ok(describe_outcome(outcome))
}

pub async fn sort(app: &PlayerApp, order: Option<SortOrder>) -> AppResult<String> {
    let order = match order {
        Some(order) => order,
        None => app.session().lock().await.catalog().sort_order().toggled(),
    };
    log::info!("[sort] requested {}", order.as_str());
    match app.set_sort_order(order).await? {
        None => Ok(format!("Already sorted {}.", order.as_str())),
        outcome => Ok(format!(
            "Sorted {}. {}",
            order.as_str(),
            describe_outcome(outcome)
        )),
    }
}

pub async fn search(app: &PlayerApp, query: &str) -> AppResult<String> {
    if !app.search(query).await? {
        return Ok(if query.trim().is_empty() {
            "Search cleared.".to_string()
        } else {
            "Search superseded by newer input.".to_string()
        });
    }
    let session = app.session().lock().await;
    let results = session.search().results();
    if results.is_empty() {
        return Ok(format!("No songs match {:?}.", query.trim()));
    }
    Ok(results
        .iter()
        .enumerate()
        .map(|(i, song)| format_song_line(i + 1, song, false))
        .collect::<Vec<_>>()
        .join("\n"))
}
