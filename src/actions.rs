//! Delete, download and upload gating. Each action has its own busy flag, so
//! one running action never blocks a different one.

use crate::api::models::Song;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Decides whether a provided deletion password is acceptable.
pub trait SecretCheck: Send + Sync {
    fn is_valid_secret(&self, provided: &str) -> bool;
}

impl<F> SecretCheck for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_valid_secret(&self, provided: &str) -> bool {
        self(provided)
    }
}

/// Compares against the configured password. With no password configured,
/// nothing can be deleted.
pub struct ConfiguredSecret(Option<String>);

impl ConfiguredSecret {
    pub fn new(secret: Option<String>) -> Self {
        Self(secret.filter(|s| !s.is_empty()))
    }
}

impl SecretCheck for ConfiguredSecret {
    fn is_valid_secret(&self, provided: &str) -> bool {
        matches!(&self.0, Some(secret) if secret == provided)
    }
}

/// The environment's save/export facility for downloaded songs.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    async fn save(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<PathBuf>;
}

/// Saves downloads into a directory, creating it on first use.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DownloadSink for DirectorySink {
    async fn save(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, bytes).await?;
        log::info!("[download] saved {}", path.display());
        Ok(path)
    }
}

/// Proof that `begin_delete` passed the gate; hand it back to `finish_delete`.
#[derive(Debug)]
pub struct DeleteTicket {
    pub song_id: String,
}

#[derive(Debug)]
pub enum DeleteGate {
    Proceed(DeleteTicket),
    /// The password did not match; no request may be sent.
    Rejected,
    /// Another delete is still in flight.
    Busy,
}

#[derive(Debug)]
pub struct DownloadTicket {
    pub song_id: String,
    pub url: String,
    pub file_name: String,
}

pub struct ActionCoordinator {
    secret: Arc<dyn SecretCheck>,
    deleting: bool,
    downloading: bool,
    uploading: bool,
}

impl ActionCoordinator {
    pub fn new(secret: Arc<dyn SecretCheck>) -> Self {
        Self {
            secret,
            deleting: false,
            downloading: false,
            uploading: false,
        }
    }

    pub fn is_deleting(&self) -> bool {
        self.deleting
    }

    pub fn is_downloading(&self) -> bool {
        self.downloading
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    /// Check the password for a delete of `song_id`. The busy flag is held
    /// only while the check runs unless the gate opens.
    pub fn begin_delete(&mut self, song_id: &str, provided_secret: &str) -> DeleteGate {
        if self.deleting {
            log::debug!("[delete] already in flight, ignoring {}", song_id);
            return DeleteGate::Busy;
        }
        self.deleting = true;
        if !self.secret.is_valid_secret(provided_secret) {
            log::warn!("[delete] invalid password for {}", song_id);
            self.deleting = false;
            return DeleteGate::Rejected;
        }
        DeleteGate::Proceed(DeleteTicket {
            song_id: song_id.to_string(),
        })
    }

    pub fn finish_delete(&mut self, _ticket: DeleteTicket) {
        self.deleting = false;
    }

    /// Start downloading `song`. `Ok(None)` means a download is already running.
    pub fn begin_download(&mut self, song: &Song) -> AppResult<Option<DownloadTicket>> {
        if self.downloading {
            log::debug!("[download] already in flight, ignoring {}", song.id);
            return Ok(None);
        }
        let url = song
            .playable_url()
            .ok_or_else(|| AppError::NotPlayable(song.title.clone()))?
            .to_string();
        self.downloading = true;
        Ok(Some(DownloadTicket {
            song_id: song.id.clone(),
            file_name: download_file_name(&song.title, &url),
            url,
        }))
    }

    pub fn finish_download(&mut self, _ticket: DownloadTicket) {
        self.downloading = false;
    }

    /// Returns false if an upload is already running.
    pub fn begin_upload(&mut self) -> bool {
        if self.uploading {
            return false;
        }
        self.uploading = true;
        true
    }

    pub fn finish_upload(&mut self) {
        self.uploading = false;
    }
}

/// File name for a downloaded song: its title, made safe for a filesystem,
/// with the source's extension appended when the title has none.
pub fn download_file_name(title: &str, url: &str) -> String {
    let mut name: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if name.is_empty() || name.chars().all(|c| c == '.') {
        name = "song".to_string();
    }

    let extension = url::Url::parse(url).ok().and_then(|u| {
        Path::new(u.path())
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    });
    match extension {
        Some(ext) if Path::new(&name).extension().is_none() => format!("{}.{}", name, ext),
        _ => name,
    }
}
