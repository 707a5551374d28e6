//! Track endpoints.
//!
//! [`TrackApi`] is the seam the query and mutation layers talk to;
//! [`TrackClient`] implements it over the HTTP transport.

use crate::error::{AppError, Result};
use crate::models::{BulkDeleteOutcome, Page, Track, TrackDraft, TrackFile};
use crate::query::QueryState;
use crate::resource::ResourceClient;
use crate::transport::{ApiRequest, Outcome, Transport};
use async_trait::async_trait;
use bridge_traits::MultipartPart;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

pub const TRACKS_RESOURCE: &str = "tracks";

/// Multipart field carrying the audio file on upload.
pub const UPLOAD_FIELD: &str = "file";

/// Operations on the track collection.
#[async_trait]
pub trait TrackApi: Send + Sync {
    /// `GET /api/tracks` for the given query; abandoned when `cancel` fires.
    async fn fetch_page(&self, query: &QueryState, cancel: &CancellationToken)
        -> Outcome<Page<Track>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Track>;

    async fn get_by_id(&self, id: &str) -> Result<Track>;

    async fn create(&self, draft: &TrackDraft) -> Result<Track>;

    async fn update(&self, id: &str, draft: &TrackDraft) -> Result<Track>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Attach an audio file (multipart field `file`).
    async fn upload_file(&self, id: &str, file: TrackFile) -> Result<Track>;

    /// Detach the audio file. Succeeds when the file is already gone.
    async fn remove_file(&self, id: &str) -> Result<Track>;

    /// Delete many tracks in one request. The outcome covers every requested id.
    async fn bulk_delete(&self, ids: &[String]) -> Result<BulkDeleteOutcome>;
}

#[derive(Serialize)]
struct BulkDeleteRequest<'a> {
    ids: &'a [String],
}

/// HTTP implementation of [`TrackApi`].
#[derive(Debug, Clone)]
pub struct TrackClient {
    resource: ResourceClient<Track>,
}

impl TrackClient {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self {
            resource: ResourceClient::new(transport, TRACKS_RESOURCE),
        }
    }

    fn transport(&self) -> &Transport {
        self.resource.transport()
    }
}

#[async_trait]
impl TrackApi for TrackClient {
    #[instrument(skip(self, cancel), fields(page = query.page, limit = query.limit))]
    async fn fetch_page(
        &self,
        query: &QueryState,
        cancel: &CancellationToken,
    ) -> Outcome<Page<Track>> {
        self.resource.query(query.to_params(), Some(cancel)).await
    }

    #[instrument(skip(self))]
    async fn get_by_slug(&self, slug: &str) -> Result<Track> {
        self.transport()
            .send(ApiRequest::get([TRACKS_RESOURCE, slug]))
            .await
    }

    async fn get_by_id(&self, id: &str) -> Result<Track> {
        self.resource.get_by_id(id).await
    }

    async fn create(&self, draft: &TrackDraft) -> Result<Track> {
        self.resource.create(draft).await
    }

    async fn update(&self, id: &str, draft: &TrackDraft) -> Result<Track> {
        self.resource.update(id, draft).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.resource.delete(id).await
    }

    #[instrument(skip(self, file), fields(file_name = %file.file_name, size = file.size()))]
    async fn upload_file(&self, id: &str, file: TrackFile) -> Result<Track> {
        let part = MultipartPart::file(UPLOAD_FIELD, file.file_name, file.content_type, file.data);
        let request = ApiRequest::post([TRACKS_RESOURCE, id, "upload"]).multipart(vec![part]);
        self.transport().send(request).await
    }

    #[instrument(skip(self))]
    async fn remove_file(&self, id: &str) -> Result<Track> {
        let request = ApiRequest::delete([TRACKS_RESOURCE, id, "file"]);
        match self.transport().send::<Track>(request).await {
            Err(AppError::NotFound { .. }) => {
                debug!("File already absent, confirming the track exists");
                let mut track = self.get_by_id(id).await?;
                track.audio_file = None;
                Ok(track)
            }
            other => other,
        }
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn bulk_delete(&self, ids: &[String]) -> Result<BulkDeleteOutcome> {
        let request = ApiRequest::post([TRACKS_RESOURCE, "delete"]).json(&BulkDeleteRequest { ids })?;
        let reported: BulkDeleteOutcome = self.transport().send(request).await?;
        let outcome = BulkDeleteOutcome::reconcile(ids, reported);
        info!(
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "Bulk delete finished"
        );
        Ok(outcome)
    }
}
