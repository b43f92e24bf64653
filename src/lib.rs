pub mod actions;
pub mod api;
pub mod app;
pub mod audio;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod panel;
pub mod session;

use actions::{ConfiguredSecret, DirectorySink};
use api::client::SongClient;
use app::{AppTimings, PlayerApp};
use audio::simulated::SimulatedOutput;
use commands::Reply;
use config::AppConfig;
use error::AppResult;
use events::{NoticeLevel, SessionEvent};
use session::PlayerSession;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run() -> AppResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("songdeck=info"))
        .init();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config: {}. Using defaults.", e);
        let default_config = AppConfig::default();
        // Save defaults so the config file exists for next launch
        if let Err(save_err) = default_config.save() {
            log::error!("Failed to save default config: {}", save_err);
        }
        default_config
    });
    config.apply_env_overrides();
    config.validate()?;

    let client = Arc::new(SongClient::new(&config)?);
    log::info!("Using song API at {}", client.base_url());
    let downloads = Arc::new(DirectorySink::new(config.resolved_download_dir()?));
    log::info!("Downloads go to {}", downloads.dir().display());

    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel::<SessionEvent>();
    let session = PlayerSession::new(
        config.page_size,
        Box::new(SimulatedOutput::new()),
        Arc::new(ConfiguredSecret::new(config.deletion_secret.clone())),
        Arc::new(events_tx),
    );
    let app = PlayerApp::new(session, client, downloads, AppTimings::from_config(&config));

    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                SessionEvent::TrackChanged(track) => println!("~ now playing: {}", track.title),
                SessionEvent::Notice(notice) => match notice.level {
                    NoticeLevel::Info => println!("~ {}", notice.message),
                    NoticeLevel::Error => eprintln!("! {}", notice.message),
                },
                other => log::debug!("[event] {}", other.name()),
            }
        }
    });

    let progress = app.spawn_progress_loop();

    if let Err(e) = app.load_next_page().await {
        log::warn!("Initial page failed: {}", e);
    }
    println!("{}", commands::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match line.parse() {
            Ok(command) => command,
            Err(e) => {
                eprintln!("! {}", e);
                continue;
            }
        };
        match commands::execute(&app, command).await {
            Ok(Reply::Text(text)) => println!("{}", text),
            Ok(Reply::Quit) => break,
            Err(e) => eprintln!("! {}", e),
        }
    }

    progress.abort();
    log::info!("Bye");
    Ok(())
}
