//! Test doubles shared by the unit tests of this crate.

use crate::error::Result;
use crate::models::{BulkDeleteOutcome, Page, Track, TrackDraft, TrackFile};
use crate::query::QueryState;
use crate::tracks::TrackApi;
use crate::transport::Outcome;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mockall::mock;
use tokio_util::sync::CancellationToken;

mock! {
    pub Api {}

    #[async_trait]
    impl TrackApi for Api {
        async fn fetch_page(&self, query: &QueryState, cancel: &CancellationToken) -> Outcome<Page<Track>>;
        async fn get_by_slug(&self, slug: &str) -> Result<Track>;
        async fn get_by_id(&self, id: &str) -> Result<Track>;
        async fn create(&self, draft: &TrackDraft) -> Result<Track>;
        async fn update(&self, id: &str, draft: &TrackDraft) -> Result<Track>;
        async fn delete(&self, id: &str) -> Result<()>;
        async fn upload_file(&self, id: &str, file: TrackFile) -> Result<Track>;
        async fn remove_file(&self, id: &str) -> Result<Track>;
        async fn bulk_delete(&self, ids: &[String]) -> Result<BulkDeleteOutcome>;
    }
}

pub fn track(id: &str, title: &str, genres: &[&str]) -> Track {
    Track {
        id: id.to_string(),
        slug: id.to_string(),
        title: title.to_string(),
        artist: "Artist".to_string(),
        album: None,
        genres: genres.iter().map(|g| g.to_string()).collect(),
        cover_image: None,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        audio_file: None,
    }
}
