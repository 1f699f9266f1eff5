use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};
use url::Url;

use super::PromotionStore;
use crate::config::AppConfig;
use crate::errors::{ApiErrorBody, ServiceError, ServiceResult};
use crate::models::{
    ListQuery, Pagination, Promotion, PromotionInput, PromotionPage, PromotionPatch,
};

const PROMOTIONS_SEGMENT: &str = "promotions";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    Structured(ApiErrorBody),
    Text(String),
    Other(Value),
}

/// `{success, data, pagination, message, error}` wrapper used by every endpoint.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    #[serde(default)]
    pagination: Option<Pagination>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<ErrorPayload>,
}

impl<T> ApiEnvelope<T> {
    fn into_error(self, status: StatusCode) -> ServiceError {
        let (structured, text) = match self.error {
            Some(ErrorPayload::Structured(body)) => (Some(body), None),
            Some(ErrorPayload::Text(text)) => (None, Some(text)),
            Some(ErrorPayload::Other(_)) | None => (None, None),
        };
        ServiceError::from_api_failure(Some(status.as_u16()), structured, self.message.or(text))
    }

    fn into_data(self, operation: &str) -> ServiceResult<T> {
        self.data.ok_or_else(|| {
            ServiceError::InvalidResponse(format!("{} response carried no data", operation))
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShareCount {
    share_count: u64,
}

/// REST client for `{API_BASE_URL}/promotions`.
#[derive(Debug, Clone)]
pub struct HttpPromotionStore {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpPromotionStore {
    /// Builds a store with its own client and request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::ConfigError(format!("failed to build HTTP client: {}", e)))?;

        Self::with_client(base_url, client)
    }

    /// Builds a store from an existing client (useful for testing).
    pub fn with_client(base_url: &str, client: Client) -> ServiceResult<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::ConfigError(format!(
                "API base URL {} cannot carry a path",
                base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    pub fn from_config(config: &AppConfig, token: Option<String>) -> ServiceResult<Self> {
        Ok(Self::new(&config.api_base_url, config.request_timeout())?.with_token(token))
    }

    /// Bearer token attached to mutating calls. Blank tokens are ignored.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> ServiceResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                ServiceError::ConfigError(format!(
                    "API base URL {} cannot carry a path",
                    self.base_url
                ))
            })?;
            path.pop_if_empty().push(PROMOTIONS_SEGMENT);
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> ServiceResult<RequestBuilder> {
        match &self.token {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Err(ServiceError::Unauthorized(
                "a signed-in session is required to change promotions".to_string(),
            )),
        }
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> ServiceResult<ApiEnvelope<T>> {
        let response = request.send().await.map_err(|e| {
            warn!(operation, error = %e, "promotions request could not complete");
            ServiceError::NetworkError(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::NetworkError(e.to_string()))?;

        let envelope: ApiEnvelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(err) if status.is_success() => {
                error!(operation, error = %err, "unreadable promotions response");
                return Err(ServiceError::InvalidResponse(format!(
                    "{} returned an unreadable body: {}",
                    operation, err
                )));
            }
            Err(_) => {
                let message = if body.trim().is_empty() {
                    status.to_string()
                } else {
                    body
                };
                return Err(ServiceError::from_api_failure(
                    Some(status.as_u16()),
                    None,
                    Some(message),
                ));
            }
        };

        // success: false is a failure whatever the HTTP status says
        if !envelope.success {
            let err = envelope.into_error(status);
            warn!(operation, status = status.as_u16(), error = %err, "promotions API reported failure");
            return Err(err);
        }

        debug!(operation, status = status.as_u16(), "promotions request succeeded");
        Ok(envelope)
    }
}

#[async_trait]
impl PromotionStore for HttpPromotionStore {
    #[instrument(skip(self, query), fields(page = query.page, limit = query.limit))]
    async fn list(&self, query: &ListQuery) -> ServiceResult<PromotionPage> {
        let request = self.client.get(self.endpoint(&[])?).query(&[
            ("page", query.page.to_string()),
            ("limit", query.limit.to_string()),
            ("sort", query.sort.to_string()),
        ]);

        let mut envelope = self.dispatch::<Vec<Promotion>>("list", request).await?;
        let pagination = envelope.pagination.take();
        let items = envelope.into_data("list")?;
        let pagination = pagination.unwrap_or_else(|| {
            Pagination::for_total(query.page, query.limit, items.len() as u64)
        });

        Ok(PromotionPage { items, pagination })
    }

    #[instrument(skip(self))]
    async fn get_by_slug(&self, slug: &str) -> ServiceResult<Promotion> {
        let request = self.client.get(self.endpoint(&[slug])?);
        self.dispatch::<Promotion>("get", request)
            .await?
            .into_data("get")
    }

    #[instrument(skip(self, input), fields(slug = %input.slug))]
    async fn create(&self, input: &PromotionInput) -> ServiceResult<Promotion> {
        let request = self.authorized(self.client.post(self.endpoint(&[])?))?.json(input);
        self.dispatch::<Promotion>("create", request)
            .await?
            .into_data("create")
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, slug: &str, patch: &PromotionPatch) -> ServiceResult<Promotion> {
        let request = self
            .authorized(self.client.put(self.endpoint(&[slug])?))?
            .json(patch);
        self.dispatch::<Promotion>("update", request)
            .await?
            .into_data("update")
    }

    #[instrument(skip(self))]
    async fn delete(&self, slug: &str) -> ServiceResult<()> {
        let request = self.authorized(self.client.delete(self.endpoint(&[slug])?))?;
        self.dispatch::<Value>("delete", request).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn increment_share_count(&self, slug: &str) -> ServiceResult<u64> {
        let mut request = self.client.post(self.endpoint(&[slug, "share"])?);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let shared = self
            .dispatch::<ShareCount>("share", request)
            .await?
            .into_data("share")?;
        Ok(shared.share_count)
    }
}
