//! `MessageSink` over the Discord REST API (v10)

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use tsbeacon_core::{
    AuthorId, Error, MessageId, MessageSink, RemoteMessage, Representation, Result,
};

use crate::embed::MessagePayload;
use crate::error::{DiscordError, DiscordResult};

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const AGENT: &str = concat!("DiscordBot (tsbeacon, ", env!("CARGO_PKG_VERSION"), ")");
/// Used when a 429 names no delay.
const FALLBACK_RETRY_MS: u64 = 1000;

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub token: String,
    pub api_base: String,
}

impl DiscordConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }
}

#[derive(Deserialize)]
struct ApiUser {
    id: String,
}

#[derive(Deserialize)]
struct ApiMessage {
    id: String,
    author: ApiUser,
    #[serde(default)]
    embeds: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

pub struct DiscordSink {
    client: Client,
    config: DiscordConfig,
    /// Bot identity, present while started.
    me: Mutex<Option<AuthorId>>,
}

impl DiscordSink {
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            me: Mutex::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header(AUTHORIZATION, format!("Bot {}", self.config.token))
            .header(USER_AGENT, AGENT)
            .timeout(REQUEST_TIMEOUT)
    }

    async fn ensure_started(&self) -> DiscordResult<AuthorId> {
        self.me.lock().await.clone().ok_or(DiscordError::NotConnected)
    }

    async fn fetch_me(&self) -> DiscordResult<AuthorId> {
        let response = send(self.request(Method::GET, "/users/@me")).await?;
        let user: ApiUser = parse(response).await?;
        Ok(AuthorId::new(user.id))
    }

    async fn list(&self, channel_id: &str, limit: usize) -> DiscordResult<Vec<RemoteMessage>> {
        self.ensure_started().await?;
        let path = format!("/channels/{}/messages", channel_id);
        let response = send(
            self.request(Method::GET, &path)
                .query(&[("limit", limit.clamp(1, 100))]),
        )
        .await?;
        let messages: Vec<ApiMessage> = parse(response).await?;

        Ok(messages
            .into_iter()
            .map(|m| RemoteMessage {
                id: MessageId::new(m.id),
                author_id: AuthorId::new(m.author.id),
                has_structured_content: !m.embeds.is_empty(),
            })
            .collect())
    }

    async fn create(&self, channel_id: &str, rep: &Representation) -> DiscordResult<MessageId> {
        self.ensure_started().await?;
        let path = format!("/channels/{}/messages", channel_id);
        let payload = MessagePayload::single(rep, chrono::Utc::now());
        let response = send(self.request(Method::POST, &path).json(&payload)).await?;
        let message: ApiMessage = parse(response).await?;
        Ok(MessageId::new(message.id))
    }

    async fn edit(
        &self,
        channel_id: &str,
        message_id: &MessageId,
        rep: &Representation,
    ) -> DiscordResult<()> {
        self.ensure_started().await?;
        let path = format!("/channels/{}/messages/{}", channel_id, message_id);
        let payload = MessagePayload::single(rep, chrono::Utc::now());
        send(self.request(Method::PATCH, &path).json(&payload)).await?;
        Ok(())
    }

    async fn rename(&self, channel_id: &str, name: &str) -> DiscordResult<()> {
        self.ensure_started().await?;
        let path = format!("/channels/{}", channel_id);
        send(
            self.request(Method::PATCH, &path)
                .json(&serde_json::json!({ "name": name })),
        )
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl MessageSink for DiscordSink {
    fn name(&self) -> &str { "discord" }

    async fn start(&self) -> Result<()> {
        let me = self
            .fetch_me()
            .await
            .map_err(|e| Error::connection("discord", e.to_string()))?;
        info!(component = "discord", user_id = %me, "Connected to Discord");
        *self.me.lock().await = Some(me);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if self.me.lock().await.take().is_some() {
            info!(component = "discord", "Disconnected from Discord");
        }
        Ok(())
    }

    async fn self_id(&self) -> Result<AuthorId> {
        self.ensure_started()
            .await
            .map_err(|e| e.into_core(Error::Apply))
    }

    async fn list_recent_messages(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> Result<Vec<RemoteMessage>> {
        self.list(channel_id, limit)
            .await
            .map_err(|e| e.into_core(Error::Apply))
    }

    async fn create_message(
        &self,
        channel_id: &str,
        representation: &Representation,
    ) -> Result<MessageId> {
        self.create(channel_id, representation)
            .await
            .map_err(|e| e.into_core(Error::Apply))
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &MessageId,
        representation: &Representation,
    ) -> Result<()> {
        self.edit(channel_id, message_id, representation)
            .await
            .map_err(|e| e.into_core(Error::Apply))
    }

    async fn rename_container(&self, channel_id: &str, name: &str) -> Result<()> {
        self.rename(channel_id, name)
            .await
            .map_err(|e| e.into_core(Error::Mutation))
    }
}

/// Send and turn non-2xx statuses into typed errors. 429s are reported with
/// their delay and never waited on.
async fn send(request: RequestBuilder) -> DiscordResult<Response> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let header_ms = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<f64>().ok())
        .map(secs_to_ms);
    let body = response.text().await.unwrap_or_default();
    let retry_after_ms = serde_json::from_str::<RateLimitBody>(&body)
        .ok()
        .map(|b| secs_to_ms(b.retry_after))
        .or(header_ms)
        .unwrap_or(FALLBACK_RETRY_MS);

    if status.as_u16() == 429 {
        warn!(component = "discord", retry_after_ms, "Discord rate limit hit");
    } else {
        debug!(component = "discord", %status, body = %body, "Discord request failed");
    }
    Err(DiscordError::from_status(status.as_u16(), body, retry_after_ms))
}

async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> DiscordResult<T> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| DiscordError::InvalidResponse(e.to_string()))
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0).round() as u64
}
