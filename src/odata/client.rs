//! Client for the ZTEM_TEST_CATS_SRV OData service.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode, Url};
use secrecy::ExposeSecret;
use tracing::{debug, info, warn};

use super::filter::{build_filter, SearchCriteria};
use super::mapping::{map_records, WorkOrderRecord};
use super::parse::{parse_body, BodyFormat};
use crate::config::{SapAuth, SapConfig};
use crate::error::{Result, SapError};

pub const SERVICE_PATH: &str = "/sap/opu/odata/sap/ZTEM_TEST_CATS_SRV";
pub const ENTITY_SET: &str = "WOHeaderSet";

const ACCEPT_ATOM: &str = "application/atom+xml";
const ACCEPT_JSON: &str = "application/json";
const MAX_LOGGED_BODY: usize = 512;

/// Anything that can answer a work-order search. The route layer only sees
/// this trait.
#[async_trait]
pub trait WorkOrderSearch: Send + Sync {
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<WorkOrderRecord>>;
}

/// OData client bound to the WOHeaderSet entity set.
#[derive(Debug, Clone)]
pub struct SapODataClient {
    entity_url: Url,
    client: Client,
    timeout: Duration,
    max_results: u32,
}

impl SapODataClient {
    /// Build a client from validated settings.
    pub fn new(config: &SapConfig) -> Result<Self> {
        config.validate().map_err(|e| SapError::Config(e.to_string()))?;

        let mut headers = HeaderMap::new();
        if let SapAuth::Basic { user, password } = &config.auth {
            let credentials = format!("{}:{}", user, password.expose_secret());
            let authorization = format!("Basic {}", STANDARD.encode(credentials));
            let mut value = HeaderValue::from_str(&authorization)
                .map_err(|e| SapError::Config(format!("invalid credentials: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .https_only(!config.allow_insecure_http)
            .build()
            .map_err(|e| SapError::Config(e.to_string()))?;

        let base = config.base_url.as_str().trim_end_matches('/');
        let entity_url = Url::parse(&format!("{base}{SERVICE_PATH}/{ENTITY_SET}"))
            .map_err(|e| SapError::Config(e.to_string()))?;

        Ok(Self { entity_url, client, timeout: config.timeout, max_results: config.max_results })
    }

    /// Full URL of the entity set, without query.
    pub fn entity_url(&self) -> &Url {
        &self.entity_url
    }

    /// Query parameters for a search. `$filter` is left out when empty.
    pub fn query_params(&self, criteria: &SearchCriteria) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(2);
        let filter = build_filter(criteria);
        if !filter.is_empty() {
            params.push(("$filter", filter));
        }
        params.push(("$top", self.max_results.to_string()));
        params
    }

    async fn fetch(&self, params: &[(&'static str, String)], accept: &'static str) -> Result<Response> {
        debug!(url = %self.entity_url, accept, "querying SAP OData");
        self.client
            .get(self.entity_url.clone())
            .query(params)
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, accept, "SAP request failed");
                SapError::from_transport(&e, self.timeout)
            })
    }

    /// One search: Atom first, JSON once if the server refuses Atom.
    async fn dispatch(&self, criteria: &SearchCriteria) -> Result<Vec<WorkOrderRecord>> {
        let params = self.query_params(criteria);

        let mut response = self.fetch(&params, ACCEPT_ATOM).await?;
        if is_negotiation_failure(response.status()) {
            info!(status = %response.status(), "SAP refused Atom, retrying with JSON");
            response = self.fetch(&params, ACCEPT_JSON).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %truncate(&body, MAX_LOGGED_BODY), "SAP returned an error status");
            return Err(SapError::from_status(status));
        }

        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(BodyFormat::from_content_type);
        let body = response.text().await.map_err(|e| {
            warn!(error = %e, %status, "SAP response body could not be read");
            SapError::from_body(&e, self.timeout)
        })?;

        let (format, entities) = parse_body(&body, declared).map_err(|failures| {
            let detail =
                failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
            warn!(
                ?declared,
                %detail,
                body = %truncate(&body, MAX_LOGGED_BODY),
                "SAP response could not be parsed"
            );
            SapError::Format { detail }
        })?;

        let records = map_records(&entities);
        info!(?format, records = records.len(), "SAP search completed");
        Ok(records)
    }
}

#[async_trait]
impl WorkOrderSearch for SapODataClient {
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<WorkOrderRecord>> {
        tokio::time::timeout(self.timeout, self.dispatch(criteria))
            .await
            .map_err(|_| SapError::Timeout(self.timeout))?
    }
}

fn is_negotiation_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::NOT_ACCEPTABLE | StatusCode::UNSUPPORTED_MEDIA_TYPE)
}

fn truncate(body: &str, max: usize) -> &str {
    if body.len() <= max {
        return body;
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
