use crate::api::client::SongClient;
use crate::api::models::{ApiEnvelope, Song, SortOrder, UploadFile, UploadReport};
use crate::api::upload::{build_upload_form, parse_upload_report};
use crate::api::SongApi;
use crate::error::AppResult;
use async_trait::async_trait;

#[async_trait]
impl SongApi for SongClient {
    async fn list_songs(
        &self,
        limit: u32,
        page: u32,
        sort_order: SortOrder,
    ) -> AppResult<Vec<Song>> {
        let limit = limit.to_string();
        let page = page.to_string();
        let response = self
            .get_with_query(
                "/song",
                &[
                    ("limit", limit.as_str()),
                    ("page", page.as_str()),
                    ("sortOrder", sort_order.as_str()),
                ],
            )
            .await?;

        let envelope: ApiEnvelope<Vec<Song>> = response.json().await?;
        let songs = envelope.into_data()?;
        log::debug!(
            "[list_songs] page={} sort={} -> {} songs",
            page,
            sort_order.as_str(),
            songs.len()
        );
        Ok(songs)
    }

    async fn search_songs(&self, query: &str) -> AppResult<Vec<Song>> {
        let response = self
            .get_with_query("/song/search", &[("searchQuery", query)])
            .await?;
        let envelope: ApiEnvelope<Vec<Song>> = response.json().await?;
        let songs = envelope.into_data()?;
        log::debug!("[search_songs] '{}' -> {} songs", query, songs.len());
        Ok(songs)
    }

    async fn delete_song(&self, id: &str) -> AppResult<()> {
        let path = format!("/song/{}", urlencoding::encode(id));
        let response = self.delete(&path).await?;
        let envelope: ApiEnvelope<serde_json::Value> = response.json().await?;
        if envelope.status != 200 {
            return Err(crate::error::AppError::Api {
                status: envelope.status,
                message: envelope.message,
            });
        }
        log::info!("[delete_song] deleted {}", id);
        Ok(())
    }

    async fn upload_songs(&self, files: Vec<UploadFile>) -> AppResult<UploadReport> {
        let files_sent = files.len();
        let form = build_upload_form(files)?;
        let response = self.post_multipart("/song/upload", form).await?;
        let body: serde_json::Value = response.json().await?;
        let report = parse_upload_report(&body, files_sent);
        log::info!(
            "[upload_songs] sent {} files, {} issues",
            report.files_sent,
            report.issues.len()
        );
        Ok(report)
    }

    async fn fetch_song_file(&self, url: &str) -> AppResult<Vec<u8>> {
        log::info!("[fetch_song_file] {}", url);
        let response = self.get_absolute(url).await?;

        use futures_util::StreamExt;
        let mut stream = response.bytes_stream();
        let mut bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            bytes.extend_from_slice(&chunk?);
        }
        log::info!("[fetch_song_file] complete: {} bytes", bytes.len());
        Ok(bytes)
    }
}
