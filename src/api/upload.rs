//! Multipart batch upload and interpretation of the backend's per-file report.

use crate::api::models::{UploadFile, UploadIssue, UploadReport};
use crate::error::{AppError, AppResult};
use reqwest::multipart::{Form, Part};
use std::path::Path;

/// Multipart field the backend collects files from.
const UPLOAD_FIELD: &str = "songs";

pub fn build_upload_form(files: Vec<UploadFile>) -> AppResult<Form> {
    if files.is_empty() {
        return Err(AppError::InvalidInput(
            "Please select at least one file.".into(),
        ));
    }

    let mut form = Form::new();
    for file in files {
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.mime_type)?;
        form = form.part(UPLOAD_FIELD, part);
    }
    Ok(form)
}

/// Turn the response body into a report. Per-file problems arrive as strings
/// under `data.errors` (or a top-level `errors`); ones mentioning an existing
/// file count as conflicts.
pub fn parse_upload_report(body: &serde_json::Value, files_sent: usize) -> UploadReport {
    let errors = body
        .get("data")
        .and_then(|d| d.get("errors"))
        .or_else(|| body.get("errors"))
        .and_then(|v| v.as_array());

    let issues = errors
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .map(classify_issue)
                .collect()
        })
        .unwrap_or_default();

    UploadReport { files_sent, issues }
}

fn classify_issue(message: &str) -> UploadIssue {
    let lower = message.to_ascii_lowercase();
    if lower.contains("exist") || lower.contains("duplicate") {
        UploadIssue::Conflict(message.to_string())
    } else {
        UploadIssue::Failed(message.to_string())
    }
}

pub fn mime_type_for_file(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("wav") => "audio/wav",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("aac") => "audio/aac",
        Some("opus") => "audio/opus",
        Some("webm") => "audio/webm",
        _ => "application/octet-stream",
    }
}

/// Read files from disk into an upload batch.
pub async fn read_upload_files(paths: &[std::path::PathBuf]) -> AppResult<Vec<UploadFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("song")
            .to_string();
        files.push(UploadFile {
            file_name,
            mime_type: mime_type_for_file(path).to_string(),
            bytes,
        });
    }
    Ok(files)
}
