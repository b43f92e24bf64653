use serde::{Deserialize, Serialize};

/// Response envelope the song backend wraps every payload in.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: u16,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// The backend reports failures in-band as well as through HTTP status.
    pub fn into_data(self) -> Result<T, crate::error::AppError> {
        if self.status != 200 {
            let message = if self.message.is_empty() {
                "Request failed".to_string()
            } else {
                self.message
            };
            return Err(crate::error::AppError::Api {
                status: self.status,
                message,
            });
        }
        self.data.ok_or_else(|| crate::error::AppError::Api {
            status: self.status,
            message: "Response carried no data".into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default, rename = "duration")]
    pub duration_seconds: f64,
}

impl Song {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            file_url: None,
            duration_seconds: 0.0,
        }
    }

    pub fn with_file_url(mut self, url: impl Into<String>) -> Self {
        self.file_url = Some(url.into());
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = seconds;
        self
    }

    /// The source to hand to the audio output, if the song has one.
    pub fn playable_url(&self) -> Option<&str> {
        self.file_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn is_playable(&self) -> bool {
        self.playable_url().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = crate::error::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            other => Err(crate::error::AppError::InvalidInput(format!(
                "Unknown sort order: {}",
                other
            ))),
        }
    }
}

/// One file of an upload batch.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "camelCase")]
pub enum UploadIssue {
    /// The backend already has this file.
    Conflict(String),
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    pub files_sent: usize,
    pub issues: Vec<UploadIssue>,
}

impl UploadReport {
    pub fn conflicts(&self) -> impl Iterator<Item = &str> {
        self.issues.iter().filter_map(|issue| match issue {
            UploadIssue::Conflict(message) => Some(message.as_str()),
            UploadIssue::Failed(_) => None,
        })
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}
