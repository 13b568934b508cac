//! Client-side entities as they arrive from the remote API.
//!
//! Field names follow the wire format (`_id` keys, camelCase fields,
//! snake_case notification kinds). Everything here is plain data; the
//! mutation rules live in the reconciler and the view state modules.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = String;
pub type NotificationId = String;
pub type PostId = String;
pub type CommentId = String;

/// A user as embedded in other records.
///
/// The relationship flags describe the acting user's relationship to this
/// user at the time the record was produced by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub is_following: bool,
    #[serde(default)]
    pub is_requested: bool,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers_count: Option<u32>,
}

impl UserRef {
    pub fn new(id: impl Into<UserId>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            name: None,
            avatar: None,
            is_following: false,
            is_requested: false,
            is_private: false,
            followers_count: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRef {
    #[serde(rename = "_id")]
    pub id: PostId,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Comment,
    CommentLike,
    Follow,
    FollowRequest,
    FollowAccept,
    Mention,
    MessageRequest,
    StoryLike,
}

impl NotificationKind {
    /// The sentence rendered after the sender's username.
    pub fn describe(&self) -> &'static str {
        match self {
            NotificationKind::Like => "liked your post.",
            NotificationKind::Comment => "commented on your post.",
            NotificationKind::CommentLike => "liked your comment.",
            NotificationKind::Follow => "started following you.",
            NotificationKind::FollowRequest => "requested to follow you.",
            NotificationKind::FollowAccept => "accepted your follow request.",
            NotificationKind::Mention => "mentioned you in a post.",
            NotificationKind::MessageRequest => "sent you a message request.",
            NotificationKind::StoryLike => "liked your story.",
        }
    }

    /// Kinds whose row offers a follow/following button for the sender.
    pub fn offers_follow_back(&self) -> bool {
        matches!(self, NotificationKind::Follow | NotificationKind::FollowAccept)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    #[serde(rename = "_id")]
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub sender: UserRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<PostRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    pub fn summary(&self) -> String {
        match (&self.kind, self.comment_text.as_deref()) {
            (NotificationKind::Comment, Some(text)) if !text.is_empty() => {
                format!("commented: \"{}\"", text)
            }
            (kind, _) => kind.describe().to_string(),
        }
    }

    /// First usable post image, shown only for post-related kinds.
    pub fn thumbnail(&self) -> Option<&str> {
        if !matches!(
            self.kind,
            NotificationKind::Like | NotificationKind::Comment | NotificationKind::CommentLike
        ) {
            return None;
        }
        self.post
            .as_ref()
            .and_then(|p| p.images.first())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

/// Authoritative result of a follow toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowStatus {
    Followed,
    Unfollowed,
    Requested,
    Unrequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RespondAction {
    Accept,
    Reject,
}

/// What a like/unlike call is aimed at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LikeTarget {
    Post(PostId),
    Comment { post_id: PostId, comment_id: CommentId },
}

impl LikeTarget {
    /// Ledger key, unique across posts and comments.
    pub fn key(&self) -> String {
        match self {
            LikeTarget::Post(id) => format!("post:{}", id),
            LikeTarget::Comment { post_id, comment_id } => {
                format!("comment:{}/{}", post_id, comment_id)
            }
        }
    }
}

impl fmt::Display for LikeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Server answer to a like toggle.
///
/// Either field may be absent; a full liker set wins over the flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<BTreeSet<UserId>>,
}

/// A post or comment that users can like.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LikeableEntity {
    pub id: String,
    pub liker_ids: BTreeSet<UserId>,
}

impl LikeableEntity {
    pub fn new(id: impl Into<String>, liker_ids: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            id: id.into(),
            liker_ids: liker_ids.into_iter().collect(),
        }
    }

    pub fn is_liked_by(&self, user: &str) -> bool {
        self.liker_ids.contains(user)
    }

    pub fn like_count(&self) -> usize {
        self.liker_ids.len()
    }
}

/// Either a bare user id or an embedded user object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Participant {
    User(UserRef),
    Id(UserId),
}

impl Participant {
    pub fn id(&self) -> &str {
        match self {
            Participant::User(u) => &u.id,
            Participant::Id(id) => id,
        }
    }

    pub fn user(&self) -> Option<&UserRef> {
        match self {
            Participant::User(u) => Some(u),
            Participant::Id(_) => None,
        }
    }

    /// The embedded user, or a bare reference carrying only the id.
    pub fn to_user(&self) -> UserRef {
        match self {
            Participant::User(u) => u.clone(),
            Participant::Id(id) => UserRef::new(id.clone(), ""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    pub sender: Participant,
    pub recipient: Participant,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub user: UserRef,
    #[serde(default)]
    pub last_message: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub is_request: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: CommentId,
    #[serde(alias = "user")]
    pub author: Participant,
    pub text: String,
    #[serde(default)]
    pub likes: BTreeSet<UserId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCounts {
    pub notifications: u32,
    pub messages: u32,
}
