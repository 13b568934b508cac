//! `RemoteActions` over the REST API.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use openerp_social::model::{
    Comment, ConversationSummary, FollowStatus, LikeOutcome, LikeTarget, Message,
    NotificationRecord, PostId,
};
use openerp_social::{FollowResponse, RemoteActions, RemoteError};

use crate::config::ClientConfig;
use crate::token::{NoAuth, StaticToken, TokenSource};

/// Failure to build a client from a [`ClientConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no server configured")]
    MissingServer,

    #[error("request timeout must be positive")]
    ZeroTimeout,

    #[error("http client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Deserialize)]
struct FollowBody {
    status: FollowStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationCount {
    #[serde(default)]
    unread_count: u32,
}

#[derive(Deserialize)]
struct MessageCount {
    #[serde(default)]
    count: u32,
}

#[derive(Serialize)]
struct CommentBody<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendBody<'a> {
    recipient_id: &'a str,
    text: &'a str,
}

fn network(e: reqwest::Error) -> RemoteError {
    RemoteError::Network(e.to_string())
}

pub struct HttpRemote {
    http: reqwest::Client,
    base_url: String,
    token_source: Arc<dyn TokenSource>,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>, token_source: Arc<dyn TokenSource>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, token_source)
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        token_source: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token_source,
        }
    }

    /// Build from config: timeout applied to every request, bearer token
    /// when one is set.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        if config.server.is_empty() {
            return Err(ConfigError::MissingServer);
        }
        if config.request_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let token_source: Arc<dyn TokenSource> = if config.token.is_empty() {
            Arc::new(NoAuth)
        } else {
            Arc::new(StaticToken::new(config.token.clone()))
        };
        Ok(Self::with_client(http, config.server.clone(), token_source))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build a request with auth header.
    async fn authed(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, RemoteError> {
        match self.token_source.token().await? {
            Some(token) => Ok(builder.bearer_auth(token)),
            None => Ok(builder),
        }
    }

    /// Send and check the status. Non-2xx bodies become the error message.
    async fn execute(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, RemoteError> {
        let req = self.authed(builder).await?;
        let resp = req.send().await.map_err(network)?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let code = status.as_u16();
        let body = resp.text().await.unwrap_or_default();
        debug!(status = code, body = %body, "remote call rejected");
        if code == 401 || code == 403 {
            return Err(RemoteError::Auth(format!("HTTP {}: {}", code, body)));
        }
        Err(RemoteError::Server {
            status: code,
            message: body,
        })
    }

    /// Parse a JSON API response.
    async fn parse<R: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<R, RemoteError> {
        let resp = self.execute(builder).await?;
        resp.json::<R>()
            .await
            .map_err(|e| RemoteError::Decode(format!("response body: {}", e)))
    }

    /// Send a request whose response body is ignored.
    async fn ack(&self, builder: reqwest::RequestBuilder) -> Result<(), RemoteError> {
        self.execute(builder).await.map(|_| ())
    }
}

#[async_trait]
impl RemoteActions for HttpRemote {
    async fn toggle_follow(&self, subject: &str) -> Result<FollowStatus, RemoteError> {
        let req = self.http.put(self.url(&format!("/users/follow/{}", subject)));
        let body: FollowBody = self.parse(req).await?;
        Ok(body.status)
    }

    async fn toggle_like(&self, target: &LikeTarget) -> Result<LikeOutcome, RemoteError> {
        let path = match target {
            LikeTarget::Post(id) => format!("/posts/like/{}", id),
            LikeTarget::Comment { post_id, comment_id } => {
                format!("/posts/comment/{}/{}/like", post_id, comment_id)
            }
        };
        let resp = self.execute(self.http.put(self.url(&path))).await?;
        let text = resp.text().await.map_err(network)?;
        // The like endpoints may answer with anything; only an explicit
        // outcome is used, otherwise it is a bare acknowledgement.
        Ok(serde_json::from_str(&text).unwrap_or_default())
    }

    async fn add_comment(&self, post: &PostId, text: &str) -> Result<Vec<Comment>, RemoteError> {
        let req = self
            .http
            .post(self.url(&format!("/posts/comment/{}", post)))
            .json(&CommentBody { text });
        self.parse(req).await
    }

    async fn respond_follow_request(&self, response: &FollowResponse) -> Result<(), RemoteError> {
        let req = self.http.put(self.url("/users/follow-respond")).json(response);
        self.ack(req).await
    }

    async fn fetch_notifications(&self) -> Result<Vec<NotificationRecord>, RemoteError> {
        self.parse(self.http.get(self.url("/notifications"))).await
    }

    async fn mark_notifications_read(&self) -> Result<(), RemoteError> {
        self.ack(self.http.put(self.url("/notifications/read"))).await
    }

    async fn unread_notification_count(&self) -> Result<u32, RemoteError> {
        let body: NotificationCount = self
            .parse(self.http.get(self.url("/notifications/counts")))
            .await?;
        Ok(body.unread_count)
    }

    async fn unread_message_count(&self) -> Result<u32, RemoteError> {
        let body: MessageCount = self
            .parse(self.http.get(self.url("/messages/unread-count")))
            .await?;
        Ok(body.count)
    }

    async fn fetch_conversations(&self) -> Result<Vec<ConversationSummary>, RemoteError> {
        self.parse(self.http.get(self.url("/messages/conversations")))
            .await
    }

    async fn fetch_messages(&self, peer: &str) -> Result<Vec<Message>, RemoteError> {
        self.parse(self.http.get(self.url(&format!("/messages/{}", peer))))
            .await
    }

    async fn send_message(&self, recipient: &str, text: &str) -> Result<Message, RemoteError> {
        let req = self.http.post(self.url("/messages")).json(&SendBody {
            recipient_id: recipient,
            text,
        });
        self.parse(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_requires_server() {
        let config = ClientConfig::default();
        assert!(matches!(
            HttpRemote::from_config(&config),
            Err(ConfigError::MissingServer)
        ));
    }

    #[test]
    fn from_config_rejects_zero_timeout() {
        let config = ClientConfig {
            server: "http://h".into(),
            request_timeout_ms: 0,
            ..ClientConfig::default()
        };
        assert!(matches!(
            HttpRemote::from_config(&config),
            Err(ConfigError::ZeroTimeout)
        ));
    }

    #[test]
    fn base_url_is_trimmed() {
        let config = ClientConfig {
            server: "http://h/api/".into(),
            ..ClientConfig::default()
        };
        let remote = HttpRemote::from_config(&config).unwrap();
        assert_eq!(remote.base_url(), "http://h/api");
        assert_eq!(remote.url("/notifications"), "http://h/api/notifications");
    }
}
