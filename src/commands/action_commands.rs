use crate::api::upload::read_upload_files;
use crate::app::PlayerApp;
use crate::error::AppResult;
use std::path::PathBuf;

pub async fn delete(app: &PlayerApp, secret: &str) -> AppResult<String> {
    if app.delete_current(secret).await? {
        Ok("Song deleted.".to_string())
    } else {
        Ok("A delete is already in progress.".to_string())
    }
}

pub async fn download(app: &PlayerApp) -> AppResult<String> {
    match app.download_current().await? {
        Some(path) => Ok(format!("Saved {}", path.display())),
        None => Ok("A download is already in progress.".to_string()),
    }
}

pub async fn upload(app: &PlayerApp, paths: &[PathBuf]) -> AppResult<String> {
    let files = read_upload_files(paths).await?;
    let Some(report) = app.upload(files).await? else {
        return Ok("An upload is already in progress.".to_string());
    };
    let conflicts = report.conflicts().count();
    let failed = report.issues.len() - conflicts;
    Ok(format!(
        "Sent {} file(s): {} already existed, {} failed.",
        report.files_sent, conflicts, failed
    ))
}
