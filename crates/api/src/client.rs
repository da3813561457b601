//! HTTP client for the location feed.
//!
//! [`HttpLocationFeed`] lets a reporting client run against a remote server: it
//! implements [`LocationFeed`] on top of the session location endpoints.

use async_trait::async_trait;
use domain::models::location::{ReportLocationRequest, ReportLocationResponse};
use domain::models::{LocationReport, NewLocationReport};
use domain::services::{LocationFeed, StoreError};
use reqwest::StatusCode;
use std::time::Duration;
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct HttpLocationFeed {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLocationFeed {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("location-share/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn locations_url(&self, session_id: Uuid) -> String {
        format!("{}/api/v1/sessions/{}/locations", self.base_url, session_id)
    }
}

fn transport_error(e: reqwest::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl LocationFeed for HttpLocationFeed {
    async fn append(&self, report: NewLocationReport) -> Result<LocationReport, StoreError> {
        let response = self
            .client
            .post(self.locations_url(report.session_id))
            .json(&ReportLocationRequest::from(&report))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => response
                .json::<ReportLocationResponse>()
                .await
                .map(|body| body.location)
                .map_err(transport_error),
            StatusCode::NOT_FOUND => Err(StoreError::ForeignKey(format!(
                "session {} does not exist",
                report.session_id
            ))),
            status => Err(StoreError::Backend(format!(
                "location upload failed with HTTP {}",
                status
            ))),
        }
    }

    async fn list_for_session(&self, session_id: Uuid) -> Result<Vec<LocationReport>, StoreError> {
        let response = self
            .client
            .get(self.locations_url(session_id))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => response.json().await.map_err(transport_error),
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            status => Err(StoreError::Backend(format!(
                "location read failed with HTTP {}",
                status
            ))),
        }
    }
}
