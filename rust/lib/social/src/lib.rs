//! Social: client-side interaction state engine.
//!
//! Keeps the local copy of follow relationships, likes, notifications and
//! unread badges consistent with the server while actions are optimistic
//! and realtime pushes arrive at any time.
//!
//! # Pieces
//!
//! - `Reconciler`: optimistic toggles with full rollback, one action in
//!   flight per subject
//! - `EventHub`: realtime events routed by name pattern to view handlers
//! - `NotificationFeed`: one list, merged from local and pushed edits
//! - `group_by_recency`: Today / Yesterday / This Week / This Month / Earlier
//! - `BadgeCounters`: process-wide unread counts behind a reducer
//!
//! # Event Names
//!
//! Realtime event names use `:` between levels and accept MQTT-style
//! wildcards when subscribing:
//! - Exact: `follow:responded`
//! - Single-level: `notification:+` matches `notification:update`
//! - Multi-level: `notification:#` matches `notification` and
//!   `notification:update`
//!
//! # Example
//!
//! ```ignore
//! use openerp_social::{EventHub, BadgeCounters, NotificationsView, Session};
//!
//! let session = Session::start(me, remote, EventHub::new(), BadgeCounters::new()).await;
//!
//! let view = NotificationsView::mount(&session.context());
//! view.load().await?;
//! view.mark_read().await;
//!
//! // Transport layer:
//! session.hub().publish_frame("follow:responded", payload).await?;
//!
//! view.respond(&id, RespondAction::Accept).await?;
//! ```

pub mod badges;
pub mod error;
pub mod feed;
pub mod hub;
pub mod inbox;
pub mod inflight;
pub mod ledger;
pub mod model;
pub mod notice;
pub mod recency;
pub mod reconciler;
pub mod relationship;
pub mod remote;
pub mod session;
pub mod trie;
pub mod views;

#[cfg(test)]
mod testing;

// Re-export primary types at crate root.
pub use badges::{Badge, BadgeAction, BadgeCounters};
pub use error::{RemoteError, SocialError};
pub use feed::NotificationFeed;
pub use hub::{EventHub, FollowResponded, RealtimeEvent, Subscription};
pub use inbox::{Inbox, InboxTab};
pub use model::{
    Comment, ConversationSummary, FollowStatus, LikeOutcome, LikeTarget, LikeableEntity, Message,
    NotificationKind, NotificationRecord, Participant, RespondAction, UnreadCounts, UserRef,
};
pub use notice::{Notice, NoticeConfig, NoticeLevel, Notices};
pub use recency::{Bucket, Grouped, group_by_recency};
pub use reconciler::Reconciler;
pub use relationship::{FollowAction, RelationshipState};
pub use remote::{FollowResponse, RemoteActions};
pub use session::Session;
pub use views::{Clock, FeedView, MessagesView, NotificationsView, ViewContext, system_clock};
