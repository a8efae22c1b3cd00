use std::future::Future;
use std::time::Duration;

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::client::ClientError;
use crate::core::api::{
    CoverageResponse, HealthResponse, ReadsetQuery, ReadsetsResponse, SearchReadsParams,
    SearchReadsResponse, SnpResponse,
};
use crate::core::types::QueryType;

/// Anything that can answer a reads query, one page per call.
///
/// [`ReadStoreClient`] talks to a read store over HTTP; tests substitute
/// in-memory sources.
pub trait ReadSource: Send + Sync + 'static {
    fn search_reads(
        &self,
        params: &SearchReadsParams,
    ) -> impl Future<Output = Result<SearchReadsResponse, ClientError>> + Send;
}

/// HTTP client for the read-store API
#[derive(Debug, Clone)]
pub struct ReadStoreClient {
    http: reqwest::Client,
    base_url: Url,
    backend: Option<String>,
}

impl ReadStoreClient {
    /// Create a client for the read store at `base_url`
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Url` for an unparsable URL, or `ClientError::Http`
    /// if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| ClientError::Url(format!("{base_url}: {e}")))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            backend: None,
        })
    }

    /// Pass `backend` with every reads and readsets query
    #[must_use]
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get<T, Q>(&self, path: &str, query: &Q) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ClientError::Url(e.to_string()))?;
        debug!(url = %url, "Read store request");

        let response = self.http.get(url).query(query).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            // Error bodies carry a user-facing message under "error"
            let message = serde_json::from_slice::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or_else(|| String::from_utf8_lossy(&body).into_owned());
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }

    fn with_defaults(&self, params: &SearchReadsParams, query_type: QueryType) -> SearchReadsParams {
        let mut params = params.clone();
        params.query_type = query_type;
        if params.backend.is_none() {
            params.backend.clone_from(&self.backend);
        }
        params
    }

    /// One page of `GET /api/reads?type=reads`
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` for transport failures, error statuses or
    /// undecodable bodies.
    pub async fn reads(&self, params: &SearchReadsParams) -> Result<SearchReadsResponse, ClientError> {
        let params = self.with_defaults(params, QueryType::Reads);
        self.get("api/reads", &params).await
    }

    /// `GET /api/reads?type=coverage`
    ///
    /// # Errors
    ///
    /// See [`ReadStoreClient::reads`].
    pub async fn coverage(&self, params: &SearchReadsParams) -> Result<CoverageResponse, ClientError> {
        let params = self.with_defaults(params, QueryType::Coverage);
        self.get("api/reads", &params).await
    }

    /// `GET /api/readsets`
    ///
    /// # Errors
    ///
    /// See [`ReadStoreClient::reads`].
    pub async fn readsets(&self, query: &ReadsetQuery) -> Result<ReadsetsResponse, ClientError> {
        let mut query = query.clone();
        if query.backend.is_none() {
            query.backend.clone_from(&self.backend);
        }
        self.get("api/readsets", &query).await
    }

    /// `GET /api/snps?snp=<id>`
    ///
    /// # Errors
    ///
    /// See [`ReadStoreClient::reads`].
    pub async fn snp(&self, snp: &str) -> Result<SnpResponse, ClientError> {
        self.get("api/snps", &[("snp", snp)]).await
    }

    /// `GET /api/health`
    ///
    /// # Errors
    ///
    /// See [`ReadStoreClient::reads`].
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let no_query: [(&str, &str); 0] = [];
        self.get("api/health", &no_query).await
    }
}

impl ReadSource for ReadStoreClient {
    fn search_reads(
        &self,
        params: &SearchReadsParams,
    ) -> impl Future<Output = Result<SearchReadsResponse, ClientError>> + Send {
        self.reads(params)
    }
}
