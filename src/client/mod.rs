//! Client for the helper server, as used by the browser-side plugin.
//!
//! Reachability is tracked in [`ConnectionHealth`] on the client value itself
//! and threaded through every call, rather than kept in a global flag.

use crate::models::api::{ LastMessagesRequest, LastMessagesResponse, PingResponse };
use crate::models::chat::ChatSummary;
use crate::server::api::{ LAST_MESSAGES_PATH, PING_PATH };
use log::{ info, warn };
use std::time::Duration;
use thiserror::Error;
use url::Url;

const ERROR_SNIPPET_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionHealth {
    Unknown,
    Reachable,
    Unreachable,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("helper server at {0} is not running or not responding")] Unreachable(Url),
    #[error("invalid helper server URL: {0}")] Url(#[from] url::ParseError),
    #[error("request to helper server failed: {0}")] Http(#[from] reqwest::Error),
    #[error("{0}")] Api(String),
}

pub struct HelperClient {
    http: reqwest::Client,
    base_url: Url,
    health: ConnectionHealth,
}

impl HelperClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            health: ConnectionHealth::Unknown,
        })
    }

    pub fn health(&self) -> ConnectionHealth {
        self.health
    }

    pub async fn ping(&mut self) -> bool {
        let reachable = match self.try_ping().await {
            Ok(response) if response.success => {
                info!("Local helper server ping successful: {}", response.message);
                true
            }
            Ok(_) => {
                warn!("Local helper server ping returned an unexpected response.");
                false
            }
            Err(e) => {
                warn!("Cannot connect to local helper server at {}: {}", self.base_url, e);
                false
            }
        };
        self.health = if reachable {
            ConnectionHealth::Reachable
        } else {
            ConnectionHealth::Unreachable
        };
        reachable
    }

    async fn try_ping(&self) -> Result<PingResponse, ClientError> {
        let url = self.base_url.join(PING_PATH)?;
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.json::<PingResponse>().await?)
    }

    /// Fetches the newest-first chat summaries for `character_avatar`.
    ///
    /// Pings first unless the server is already known to be reachable. Any
    /// failure marks the server unreachable so the next call pings again.
    pub async fn fetch_last_messages(
        &mut self,
        character_avatar: &str
    ) -> Result<Vec<ChatSummary>, ClientError> {
        if self.health != ConnectionHealth::Reachable && !self.ping().await {
            return Err(ClientError::Unreachable(self.base_url.clone()));
        }

        let result = self.request_last_messages(character_avatar).await;
        if result.is_err() {
            self.health = ConnectionHealth::Unreachable;
        }
        result
    }

    async fn request_last_messages(
        &self,
        character_avatar: &str
    ) -> Result<Vec<ChatSummary>, ClientError> {
        let url = self.base_url.join(LAST_MESSAGES_PATH)?;
        let body = LastMessagesRequest {
            character_avatar: Some(character_avatar.to_string()),
        };
        let response = self.http.post(url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Api(error_message(status.as_u16(), &text)));
        }

        match serde_json::from_str::<LastMessagesResponse>(&text) {
            Ok(LastMessagesResponse::Success { success: true, chat_last_messages }) => {
                Ok(chat_last_messages)
            }
            Ok(LastMessagesResponse::Failure { error, .. }) => Err(ClientError::Api(error)),
            Ok(LastMessagesResponse::Success { .. }) => {
                Err(ClientError::Api("Helper server request was not successful.".into()))
            }
            Err(e) => Err(ClientError::Api(format!("Malformed helper server response: {}", e))),
        }
    }
}

fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => {
            match value.get("error").and_then(|e| e.as_str()) {
                Some(error) => error.to_string(),
                None => format!("status {}", status),
            }
        }
        Err(_) => {
            let snippet: String = body.chars().take(ERROR_SNIPPET_LEN).collect();
            format!("status {} - {}", status, snippet)
        }
    }
}
