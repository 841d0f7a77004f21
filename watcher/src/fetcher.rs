//! Remote status source: one bounded request per poll cycle.
//!
//! The fetcher never retries. Transport failures, non-200 answers and
//! undecodable bodies are mapped onto distinct [`PollError`] kinds and
//! the poll loop decides what to do with them.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::error::PollError;

/// Where homework statuses come from.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch every status change since `cursor` (seconds since epoch).
    async fn fetch(&self, cursor: i64) -> Result<Value, PollError>;
}

pub struct PracticumClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl PracticumClient {
    pub fn new(endpoint: &str, token: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            token: token.to_string(),
        })
    }

    fn connectivity(&self, cursor: i64, e: reqwest::Error) -> PollError {
        PollError::Connectivity {
            url: self.endpoint.clone(),
            cursor,
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl StatusSource for PracticumClient {
    async fn fetch(&self, cursor: i64) -> Result<Value, PollError> {
        debug!(endpoint = %self.endpoint, cursor, "Requesting homework statuses");
        let resp = self
            .client
            .get(&self.endpoint)
            .header(AUTHORIZATION, format!("OAuth {}", self.token))
            .query(&[("from_date", cursor)])
            .send()
            .await
            .map_err(|e| self.connectivity(cursor, e))?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(PollError::Endpoint {
                url: self.endpoint.clone(),
                cursor,
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| self.connectivity(cursor, e))?;
        serde_json::from_str(&body).map_err(|e| PollError::Format {
            reason: e.to_string(),
        })
    }
}
