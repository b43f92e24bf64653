pub mod action_commands;
pub mod library_commands;
pub mod playback_commands;

use crate::api::models::{Song, SortOrder};
use crate::app::PlayerApp;
use crate::error::{AppError, AppResult};
use std::path::PathBuf;
use std::str::FromStr;

pub const HELP: &str = "\
commands:
  list                 show loaded songs
  more                 load the next page
  play <n>             play song n (again to pause/resume)
  toggle               pause or resume
  next | prev          skip forward or back
  seek <seconds>       jump within the current song
  shuffle              toggle shuffle
  repeat               cycle repeat all -> one -> off
  sort [asc|desc]      change sort order (flip without argument)
  search <query>       search the library
  delete <password>    delete the current song
  download             save the current song
  upload <path>...     upload audio files
  close                close the player
  status               show player state
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    More,
    /// 1-based position in the list
    Play(usize),
    Toggle,
    Next,
    Prev,
    Seek(f64),
    Shuffle,
    Repeat,
    /// `None` flips the current order
    Sort(Option<SortOrder>),
    Search(String),
    Delete(String),
    Download,
    Upload(Vec<PathBuf>),
    Close,
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = AppError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "list" | "ls" => Command::List,
            "more" => Command::More,
            "play" => {
                let n: usize = rest
                    .parse()
                    .map_err(|_| AppError::InvalidInput("usage: play <n>".into()))?;
                if n == 0 {
                    return Err(AppError::InvalidInput("Songs are numbered from 1".into()));
                }
                Command::Play(n)
            }
            "toggle" | "pause" | "resume" => Command::Toggle,
            "next" => Command::Next,
            "prev" | "previous" => Command::Prev,
            "seek" => {
                let seconds: f64 = rest
                    .parse()
                    .map_err(|_| AppError::InvalidInput("usage: seek <seconds>".into()))?;
                Command::Seek(seconds)
            }
            "shuffle" => Command::Shuffle,
            "repeat" => Command::Repeat,
            "sort" if rest.is_empty() => Command::Sort(None),
            "sort" => Command::Sort(Some(rest.parse()?)),
            "search" => Command::Search(rest.to_string()),
            "delete" => {
                if rest.is_empty() {
                    return Err(AppError::InvalidInput("usage: delete <password>".into()));
                }
                Command::Delete(rest.to_string())
            }
            "download" => Command::Download,
            "upload" => Command::Upload(rest.split_whitespace().map(PathBuf::from).collect()),
            "close" => Command::Close,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "" => return Err(AppError::InvalidInput("Type `help` for commands".into())),
            other => {
                return Err(AppError::InvalidInput(format!(
                    "Unknown command `{}`, type `help`",
                    other
                )))
            }
        };
        Ok(command)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Quit,
}

pub async fn execute(app: &PlayerApp, command: Command) -> AppResult<Reply> {
    log::debug!("[command] {:?}", command);
    let text = match command {
        Command::List => library_commands::list(app).await,
        Command::More => library_commands::more(app).await?,
        Command::Sort(order) => library_commands::sort(app, order).await?,
        Command::Search(query) => library_commands::search(app, &query).await?,
        Command::Play(n) => playback_commands::play(app, n).await?,
        Command::Toggle => playback_commands::toggle(app).await?,
        Command::Next => playback_commands::next(app).await?,
        Command::Prev => playback_commands::prev(app).await?,
        Command::Seek(seconds) => playback_commands::seek(app, seconds).await,
        Command::Shuffle => playback_commands::shuffle(app).await,
        Command::Repeat => playback_commands::repeat(app).await,
        Command::Close => playback_commands::close(app).await,
        Command::Status => playback_commands::status(app).await,
        Command::Delete(secret) => action_commands::delete(app, &secret).await?,
        Command::Download => action_commands::download(app).await?,
        Command::Upload(paths) => action_commands::upload(app, &paths).await?,
        Command::Help => HELP.to_string(),
        Command::Quit => return Ok(Reply::Quit),
    };
    Ok(Reply::Text(text))
}

/// `m:ss`
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() { seconds.max(0.0) as u64 } else { 0 };
    format!("{}:{:02}", total / 60, total % 60)
}

pub(crate) fn format_song_line(position: usize, song: &Song, current: bool) -> String {
    let marker = if current { '>' } else { ' ' };
    let source = if song.is_playable() { "" } else { " [no audio]" };
    format!(
        "{} {:>3}. {} ({}){}",
        marker,
        position,
        song.title,
        format_time(song.duration_seconds),
        source
    )
}
