use async_trait::async_trait;

use crate::error::RemoteError;
use crate::model::{
    Comment, ConversationSummary, FollowStatus, LikeOutcome, LikeTarget, Message, NotificationId,
    NotificationRecord, PostId, RespondAction, UserId,
};

/// Request body for answering a follow request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    pub requester_id: UserId,
    pub action: RespondAction,
    pub notification_id: NotificationId,
}

/// The authoritative remote side of every user action.
///
/// Implementations must not retry; a failed call is reported once and the
/// caller rolls back.
#[async_trait]
pub trait RemoteActions: Send + Sync + 'static {
    async fn toggle_follow(&self, subject: &str) -> Result<FollowStatus, RemoteError>;

    async fn toggle_like(&self, target: &LikeTarget) -> Result<LikeOutcome, RemoteError>;

    /// Returns the post's full comment list after the insert.
    async fn add_comment(&self, post: &PostId, text: &str) -> Result<Vec<Comment>, RemoteError>;

    async fn respond_follow_request(&self, response: &FollowResponse) -> Result<(), RemoteError>;

    async fn fetch_notifications(&self) -> Result<Vec<NotificationRecord>, RemoteError>;

    /// Idempotent.
    async fn mark_notifications_read(&self) -> Result<(), RemoteError>;

    async fn unread_notification_count(&self) -> Result<u32, RemoteError>;

    async fn unread_message_count(&self) -> Result<u32, RemoteError>;

    async fn fetch_conversations(&self) -> Result<Vec<ConversationSummary>, RemoteError>;

    /// Messages exchanged with `peer`, oldest first.
    async fn fetch_messages(&self, peer: &str) -> Result<Vec<Message>, RemoteError>;

    async fn send_message(&self, recipient: &str, text: &str) -> Result<Message, RemoteError>;
}
