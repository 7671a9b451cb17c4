//! # Product Lookup
//!
//! Resolves a barcode to a [`Product`] through the Open Food Facts API.
//!
//! ```text
//!   barcode ──► validate ──► GET {base}/api/v2/product/{barcode}.json
//!                                   │   User-Agent: EasyHealth/1.0
//!                                   ▼
//!                     ┌──────── HTTP status ────────┐
//!                     │ 2xx / 404          other    │
//!                     ▼                      ▼      │
//!              parse LookupResponse    UnexpectedStatus
//!                     │
//!          status == 1 && product ──► Found(product)
//!          anything else          ──► NotFound
//! ```
//!
//! The API answers unknown codes with `404` and a `status: 0` body, so a 404
//! is read like any other reply rather than treated as a failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info};

use easyhealth_core::validation::validate_barcode;
use easyhealth_core::{LookupResponse, Product, DEFAULT_PRODUCT_API_URL, USER_AGENT};

use crate::config::LookupSettings;
use crate::error::{ClientError, ClientResult};

/// Result of a lookup that reached the API and got a readable answer.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(Product),
    NotFound,
}

/// Barcode → product resolution.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn lookup(&self, barcode: &str) -> ClientResult<LookupOutcome>;
}

// =============================================================================
// Open Food Facts
// =============================================================================

#[derive(Debug, Clone)]
pub struct OpenFoodFactsClient {
    http: Client,
    base_url: String,
}

impl OpenFoodFactsClient {
    /// Client against the public API with the default User-Agent.
    pub fn new() -> ClientResult<Self> {
        Self::build(DEFAULT_PRODUCT_API_URL, USER_AGENT, None)
    }

    pub fn from_settings(settings: &LookupSettings) -> ClientResult<Self> {
        Self::build(
            &settings.base_url,
            &settings.user_agent,
            settings.timeout_secs.map(Duration::from_secs),
        )
    }

    fn build(base_url: &str, user_agent: &str, timeout: Option<Duration>) -> ClientResult<Self> {
        let mut builder = Client::builder().user_agent(user_agent.to_string());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(OpenFoodFactsClient {
            http: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Points the client at a different host (staging mirror, mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn product_url(&self, barcode: &str) -> String {
        format!("{}/api/v2/product/{}.json", self.base_url, barcode)
    }
}

#[async_trait]
impl ProductLookup for OpenFoodFactsClient {
    async fn lookup(&self, barcode: &str) -> ClientResult<LookupOutcome> {
        let barcode = validate_barcode(barcode)?;
        let url = self.product_url(barcode);
        debug!(barcode = %barcode, url = %url, "Fetching product");

        let response = self.http.get(&url).send().await.map_err(|e| {
            error!(barcode = %barcode, error = %e, "Error fetching product");
            ClientError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            error!(barcode = %barcode, status = status.as_u16(), "Product API returned an error");
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: LookupResponse = serde_json::from_str(&body).map_err(|e| {
            error!(barcode = %barcode, error = %e, "Undecodable product response");
            ClientError::from(e)
        })?;

        match parsed.into_product() {
            Some(product) => {
                info!(
                    barcode = %barcode,
                    name = product.display_name().unwrap_or("-"),
                    nutri_score = product.nutrition_grade.as_deref().unwrap_or("-"),
                    nova_group = ?product.nova_group,
                    "Product found"
                );
                Ok(LookupOutcome::Found(product))
            }
            None => {
                info!(barcode = %barcode, "Product not found for barcode");
                Ok(LookupOutcome::NotFound)
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
