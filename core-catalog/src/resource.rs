//! Generic CRUD client for one `/api/{resource}` collection.

use crate::error::Result;
use crate::transport::{ApiRequest, Outcome, Transport};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

pub struct ResourceClient<T> {
    transport: Arc<Transport>,
    resource: String,
    _item: PhantomData<fn() -> T>,
}

impl<T> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            resource: self.resource.clone(),
            _item: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ResourceClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceClient")
            .field("resource", &self.resource)
            .finish()
    }
}

impl<T: DeserializeOwned> ResourceClient<T> {
    pub fn new(transport: Arc<Transport>, resource: impl Into<String>) -> Self {
        Self {
            transport,
            resource: resource.into(),
            _item: PhantomData,
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    /// `GET /api/{resource}` decoded as `R`, for collections that wrap their items.
    pub async fn query<R: DeserializeOwned>(
        &self,
        params: Vec<(String, String)>,
        cancel: Option<&CancellationToken>,
    ) -> Outcome<R> {
        let request = ApiRequest::get([self.resource.as_str()]).query_pairs(params);
        self.transport.request(request, cancel).await
    }

    /// `GET /api/{resource}`
    #[instrument(skip(self, params, cancel), fields(resource = %self.resource))]
    pub async fn list(
        &self,
        params: Vec<(String, String)>,
        cancel: Option<&CancellationToken>,
    ) -> Outcome<Vec<T>> {
        self.query(params, cancel).await
    }

    /// `GET /api/{resource}/{id}`
    #[instrument(skip(self), fields(resource = %self.resource))]
    pub async fn get_by_id(&self, id: &str) -> Result<T> {
        self.transport
            .send(ApiRequest::get([self.resource.as_str(), id]))
            .await
    }

    /// `POST /api/{resource}`
    #[instrument(skip(self, dto), fields(resource = %self.resource))]
    pub async fn create<D: Serialize + Sync>(&self, dto: &D) -> Result<T> {
        let request = ApiRequest::post([self.resource.as_str()]).json(dto)?;
        self.transport.send(request).await
    }

    /// `PUT /api/{resource}/{id}`
    #[instrument(skip(self, dto), fields(resource = %self.resource))]
    pub async fn update<D: Serialize + Sync>(&self, id: &str, dto: &D) -> Result<T> {
        let request = ApiRequest::put([self.resource.as_str(), id]).json(dto)?;
        self.transport.send(request).await
    }

    /// `DELETE /api/{resource}/{id}`; the response body is ignored.
    #[instrument(skip(self), fields(resource = %self.resource))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.transport
            .send::<serde_json::Value>(ApiRequest::delete([self.resource.as_str(), id]))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
    use mockall::mock;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn genres(mock: MockHttpClient) -> ResourceClient<String> {
        let transport = Arc::new(Transport::new(Arc::new(mock), "http://localhost:8000"));
        ResourceClient::new(transport, "genres")
    }

    #[tokio::test]
    async fn test_list_strings() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(1).returning(|req| {
            assert_eq!(req.url, "http://localhost:8000/api/genres");
            Ok(HttpResponse::new(200, r#"["Rock","Jazz"]"#))
        });

        let outcome = genres(mock).list(Vec::new(), None).await;
        assert_eq!(
            outcome,
            Outcome::Settled(Ok(vec!["Rock".to_string(), "Jazz".to_string()]))
        );
    }

    #[tokio::test]
    async fn test_get_by_id_not_found_names_resource() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(404, r#"{"error":"Genre not found"}"#)));

        let err = genres(mock).get_by_id("polka").await.unwrap_err();
        assert!(matches!(err, crate::AppError::NotFound { ref resource, .. } if resource == "genres"));
    }

    #[tokio::test]
    async fn test_delete_accepts_empty_body() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(1).returning(|req| {
            assert_eq!(req.method, HttpMethod::Delete);
            assert_eq!(req.url, "http://localhost:8000/api/genres/polka");
            Ok(HttpResponse::new(204, ""))
        });

        assert!(genres(mock).delete("polka").await.is_ok());
    }
}
