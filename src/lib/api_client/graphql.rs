//! GraphQL variant of the self-call API, mirroring the REST mutations and
//! adding query-only operations (spec §6.3), grounded on the original
//! service's `graphql_client` module.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api_client::ApiError;
use crate::utils::consts::EXTERNAL_HTTP_TIMEOUT_SECONDS;

#[derive(Debug, Clone)]
pub struct GraphQlConfig {
    pub url: String,
    pub token: String,
}

pub struct GraphQlClient {
    http: Client,
    config: GraphQlConfig,
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

impl GraphQlClient {
    pub fn new(config: GraphQlConfig) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(EXTERNAL_HTTP_TIMEOUT_SECONDS))
            .build()
            .expect("reqwest client with static config always builds");
        Self { http, config }
    }

    pub fn is_enabled(&self) -> bool {
        !self.config.url.is_empty()
    }

    async fn execute(&self, query: &str, variables: Option<Value>) -> Result<Value, ApiError> {
        let mut request = self
            .http
            .post(&self.config.url)
            .json(&GraphQlRequest { query, variables });
        if !self.config.token.trim().is_empty() {
            request = request.bearer_auth(self.config.token.trim());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transient(e.to_string()))?;
        let body: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Transient(e.to_string()))?;

        if !body.errors.is_empty() {
            let joined = body
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ApiError::Validation(joined));
        }
        Ok(body.data.unwrap_or(Value::Null))
    }

    pub async fn quest(&self, guild_id: u64, quest_id: &str) -> Result<Option<Value>, ApiError> {
        const QUERY: &str = r#"
            query GetQuest($guildId: Int!, $questId: String!) {
                quest(guildId: $guildId, questId: $questId) {
                    questId guildId refereeId title description startingAt
                    durationHours status announceAt startedAt endedAt isSignupOpen
                    signups { userId characterId status }
                }
            }
        "#;
        let data = self
            .execute(
                QUERY,
                Some(serde_json::json!({ "guildId": guild_id, "questId": quest_id })),
            )
            .await?;
        Ok(data.get("quest").cloned().filter(|v| !v.is_null()))
    }

    pub async fn quests(&self, guild_id: u64, status: Option<&str>) -> Result<Vec<Value>, ApiError> {
        const QUERY: &str = r#"
            query ListQuests($guildId: Int!, $status: String) {
                quests(guildId: $guildId, status: $status) {
                    questId title status startingAt refereeId isSignupOpen
                }
            }
        "#;
        let data = self
            .execute(
                QUERY,
                Some(serde_json::json!({ "guildId": guild_id, "status": status })),
            )
            .await?;
        Ok(data
            .get("quests")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    pub async fn user_by_discord(
        &self,
        guild_id: u64,
        discord_id: u64,
    ) -> Result<Option<Value>, ApiError> {
        const QUERY: &str = r#"
            query UserByDiscord($guildId: Int!, $discordId: String!) {
                userByDiscord(guildId: $guildId, discordId: $discordId) {
                    userId guildId discordId roles dmOptIn lastActiveAt
                }
            }
        "#;
        let data = self
            .execute(
                QUERY,
                Some(serde_json::json!({
                    "guildId": guild_id,
                    "discordId": discord_id.to_string(),
                })),
            )
            .await?;
        Ok(data.get("userByDiscord").cloned().filter(|v| !v.is_null()))
    }

    pub async fn users_by_guild(&self, guild_id: u64) -> Result<Vec<Value>, ApiError> {
        const QUERY: &str = r#"
            query UsersByGuild($guildId: Int!) {
                usersByGuild(guildId: $guildId) {
                    userId discordId roles dmOptIn lastActiveAt
                }
            }
        "#;
        let data = self
            .execute(QUERY, Some(serde_json::json!({ "guildId": guild_id })))
            .await?;
        Ok(data
            .get("usersByGuild")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    pub async fn pending_quests(&self, guild_id: u64, before_iso: Option<&str>) -> Result<Vec<Value>, ApiError> {
        const QUERY: &str = r#"
            query PendingQuests($guildId: Int!, $before: DateTime) {
                pendingQuests(guildId: $guildId, before: $before) {
                    questId title status announceAt
                }
            }
        "#;
        let data = self
            .execute(
                QUERY,
                Some(serde_json::json!({ "guildId": guild_id, "before": before_iso })),
            )
            .await?;
        Ok(data
            .get("pendingQuests")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    pub async fn recent_quests(&self, guild_id: u64, limit: u32) -> Result<Vec<Value>, ApiError> {
        const QUERY: &str = r#"
            query RecentQuests($guildId: Int!, $limit: Int) {
                recentQuests(guildId: $guildId, limit: $limit) {
                    questId title status startingAt
                }
            }
        "#;
        let data = self
            .execute(
                QUERY,
                Some(serde_json::json!({ "guildId": guild_id, "limit": limit })),
            )
            .await?;
        Ok(data
            .get("recentQuests")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    pub async fn all_lookups(&self, guild_id: u64) -> Result<Vec<Value>, ApiError> {
        const QUERY: &str = r#"
            query AllLookups($guildId: Int!) {
                allLookups(guildId: $guildId) { name url description }
            }
        "#;
        let data = self
            .execute(QUERY, Some(serde_json::json!({ "guildId": guild_id })))
            .await?;
        Ok(data
            .get("allLookups")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    pub async fn lookup_search(&self, guild_id: u64, query: &str) -> Result<Vec<Value>, ApiError> {
        const QUERY: &str = r#"
            query LookupSearch($guildId: Int!, $query: String!) {
                lookupSearch(guildId: $guildId, query: $query) { name url description }
            }
        "#;
        let data = self
            .execute(
                QUERY,
                Some(serde_json::json!({ "guildId": guild_id, "query": query })),
            )
            .await?;
        Ok(data
            .get("lookupSearch")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_when_url_empty() {
        let client = GraphQlClient::new(GraphQlConfig {
            url: String::new(),
            token: String::new(),
        });
        assert!(!client.is_enabled());
    }
}
