//! Self-call REST/GraphQL client: the "remote persistence" path the core
//! also exposes publicly under `/v1/...` and `/graphql` (spec §6.3).

pub mod graphql;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CharacterId, Quest, QuestId, UserId};
use crate::utils::consts::EXTERNAL_HTTP_TIMEOUT_SECONDS;

/// Mirrors the response-contract rules of §6.3: 400/404 are deterministic
/// user errors; anything else (including transport failures) is transient
/// and the caller should fall back to local persistence.
#[derive(Debug, Error, Clone)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("transient API failure: {0}")]
    Transient(String),
}

impl ApiError {
    pub const fn should_fall_back_to_local(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// The `{detail: str | [{msg: str, ...}]}` error body shape from §6.3.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Message(String),
    List(Vec<ErrorDetailItem>),
}

#[derive(Debug, Deserialize)]
struct ErrorDetailItem {
    msg: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: ErrorDetail,
}

impl ErrorDetail {
    fn into_message(self) -> String {
        match self {
            Self::Message(m) => m,
            Self::List(items) => items
                .into_iter()
                .map(|i| i.msg)
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AddSignupRequest {
    pub user_id: String,
    pub character_id: String,
}

#[derive(Clone)]
pub struct QuestApiClient {
    http: Client,
    base_url: String,
}

impl QuestApiClient {
    /// `base_url` empty disables the remote path entirely (spec §6.5:
    /// `quest_api_base_url` — empty disables remote path).
    pub fn new(base_url: impl Into<String>) -> AnyResultInit<Self> {
        let base_url = base_url.into();
        let http = Client::builder()
            .timeout(Duration::from_secs(EXTERNAL_HTTP_TIMEOUT_SECONDS))
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Self { http, base_url })
    }

    pub fn is_enabled(&self) -> bool {
        !self.base_url.is_empty()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> ApiResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transient(e.to_string()))?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Transient(e.to_string())),
            StatusCode::BAD_REQUEST => Err(ApiError::Validation(Self::read_detail(response).await)),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(Self::read_detail(response).await)),
            _ => Err(ApiError::Transient(format!(
                "unexpected status {}",
                response.status()
            ))),
        }
    }

    async fn read_detail(response: reqwest::Response) -> String {
        response
            .json::<ErrorBody>()
            .await
            .map(|b| b.detail.into_message())
            .unwrap_or_else(|_| "request failed".to_string())
    }

    pub async fn add_signup(
        &self,
        guild_id: u64,
        quest_id: &QuestId,
        user_id: &UserId,
        character_id: &CharacterId,
    ) -> ApiResult<Quest> {
        let request = self
            .http
            .post(self.url(&format!("/v1/guilds/{guild_id}/quests/{quest_id}/signups")))
            .json(&AddSignupRequest {
                user_id: user_id.value(),
                character_id: character_id.value(),
            });
        self.send(request).await
    }

    pub async fn remove_signup(
        &self,
        guild_id: u64,
        quest_id: &QuestId,
        user_id: &UserId,
    ) -> ApiResult<Quest> {
        let request = self.http.delete(self.url(&format!(
            "/v1/guilds/{guild_id}/quests/{quest_id}/signups/{user_id}"
        )));
        self.send(request).await
    }

    pub async fn select_signup(
        &self,
        guild_id: u64,
        quest_id: &QuestId,
        user_id: &UserId,
    ) -> ApiResult<Quest> {
        let request = self.http.post(self.url(&format!(
            "/v1/guilds/{guild_id}/quests/{quest_id}/signups/{user_id}:select"
        )));
        self.send(request).await
    }

    pub async fn nudge(&self, guild_id: u64, quest_id: &QuestId, referee_id: &UserId) -> ApiResult<Quest> {
        #[derive(Serialize)]
        struct Body {
            referee_id: String,
        }
        let request = self
            .http
            .post(self.url(&format!("/v1/guilds/{guild_id}/quests/{quest_id}:nudge")))
            .json(&Body {
                referee_id: referee_id.value(),
            });
        self.send(request).await
    }

    pub async fn close_signups(&self, guild_id: u64, quest_id: &QuestId) -> ApiResult<Quest> {
        let request = self.http.post(self.url(&format!(
            "/v1/guilds/{guild_id}/quests/{quest_id}:closeSignups"
        )));
        self.send(request).await
    }

    pub async fn set_completed(&self, guild_id: u64, quest_id: &QuestId) -> ApiResult<Quest> {
        let request = self.http.post(self.url(&format!(
            "/v1/guilds/{guild_id}/quests/{quest_id}:setCompleted"
        )));
        self.send(request).await
    }

    pub async fn set_cancelled(&self, guild_id: u64, quest_id: &QuestId) -> ApiResult<Quest> {
        let request = self.http.post(self.url(&format!(
            "/v1/guilds/{guild_id}/quests/{quest_id}:setCancelled"
        )));
        self.send(request).await
    }

    pub async fn set_announced(&self, guild_id: u64, quest_id: &QuestId) -> ApiResult<Quest> {
        let request = self.http.post(self.url(&format!(
            "/v1/guilds/{guild_id}/quests/{quest_id}:setAnnounced"
        )));
        self.send(request).await
    }

    pub async fn create_quest(&self, guild_id: u64, quest: &Quest) -> ApiResult<Quest> {
        let request = self
            .http
            .post(self.url(&format!("/v1/guilds/{guild_id}/quests")))
            .json(quest);
        self.send(request).await
    }
}

/// Local alias kept distinct from [`ApiResult`] so client construction
/// errors (transport/TLS setup) don't get mixed up with per-call API errors.
pub type AnyResultInit<T> = Result<T, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_when_base_url_empty() {
        let client = QuestApiClient::new("").unwrap();
        assert!(!client.is_enabled());
    }

    #[test]
    fn enabled_when_base_url_set() {
        let client = QuestApiClient::new("https://api.example.com").unwrap();
        assert!(client.is_enabled());
    }

    #[test]
    fn error_detail_message_variant_flattens() {
        let detail: ErrorDetail = serde_json::from_str("\"bad request\"").unwrap();
        assert_eq!(detail.into_message(), "bad request");
    }

    #[test]
    fn error_detail_list_variant_joins_messages() {
        let detail: ErrorDetail =
            serde_json::from_str(r#"[{"msg": "a"}, {"msg": "b"}]"#).unwrap();
        assert_eq!(detail.into_message(), "a; b");
    }
}
