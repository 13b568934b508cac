//! Scripted in-memory remote for unit tests.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Notify, Semaphore};

use crate::error::RemoteError;
use crate::model::{
    Comment, ConversationSummary, FollowStatus, LikeOutcome, LikeTarget, Message,
    NotificationRecord, Participant, PostId,
};
use crate::remote::{FollowResponse, RemoteActions};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    ToggleFollow(String),
    ToggleLike(String),
    AddComment(String, String),
    Respond(FollowResponse),
    FetchNotifications,
    MarkRead,
    UnreadNotifications,
    UnreadMessages,
    FetchConversations,
    FetchMessages(String),
    SendMessage(String, String),
}

type Queue<T> = Mutex<VecDeque<Result<T, RemoteError>>>;

pub(crate) struct FakeRemote {
    calls: Mutex<Vec<Call>>,
    follow: Queue<FollowStatus>,
    like: Queue<LikeOutcome>,
    respond: Queue<()>,
    notifications: Queue<Vec<NotificationRecord>>,
    notification_count: Queue<u32>,
    message_count: Queue<u32>,
    conversations: Queue<Vec<ConversationSummary>>,
    messages: Queue<Vec<Message>>,
    gated: Mutex<HashSet<&'static str>>,
    gate: Semaphore,
    entered: Notify,
}

fn next<T>(queue: &Queue<T>, default: impl FnOnce() -> T) -> Result<T, RemoteError> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Ok(default()))
}

impl FakeRemote {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::default(),
            follow: Mutex::default(),
            like: Mutex::default(),
            respond: Mutex::default(),
            notifications: Mutex::default(),
            notification_count: Mutex::default(),
            message_count: Mutex::default(),
            conversations: Mutex::default(),
            messages: Mutex::default(),
            gated: Mutex::default(),
            gate: Semaphore::new(0),
            entered: Notify::new(),
        })
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    /// Hold `op` calls until `release` is called.
    pub(crate) fn gate(&self, op: &'static str) {
        self.gated.lock().unwrap().insert(op);
    }

    pub(crate) fn gate_follow(&self) {
        self.gate("toggle_follow");
    }

    pub(crate) fn release(&self) {
        self.gate.add_permits(1);
    }

    /// Resolves once a gated call is parked.
    pub(crate) async fn wait_for_call(&self) {
        self.entered.notified().await;
    }

    async fn checkpoint(&self, op: &'static str) {
        let gated = self.gated.lock().unwrap().contains(op);
        if gated {
            self.entered.notify_one();
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }
    }

    pub(crate) fn push_follow(&self, r: Result<FollowStatus, RemoteError>) {
        self.follow.lock().unwrap().push_back(r);
    }

    pub(crate) fn push_like(&self, r: Result<LikeOutcome, RemoteError>) {
        self.like.lock().unwrap().push_back(r);
    }

    pub(crate) fn push_respond(&self, r: Result<(), RemoteError>) {
        self.respond.lock().unwrap().push_back(r);
    }

    pub(crate) fn push_notifications(&self, r: Result<Vec<NotificationRecord>, RemoteError>) {
        self.notifications.lock().unwrap().push_back(r);
    }

    pub(crate) fn push_counts(&self, notifications: Result<u32, RemoteError>, messages: Result<u32, RemoteError>) {
        self.notification_count.lock().unwrap().push_back(notifications);
        self.message_count.lock().unwrap().push_back(messages);
    }

    pub(crate) fn push_message_count(&self, r: Result<u32, RemoteError>) {
        self.message_count.lock().unwrap().push_back(r);
    }

    pub(crate) fn push_conversations(&self, r: Result<Vec<ConversationSummary>, RemoteError>) {
        self.conversations.lock().unwrap().push_back(r);
    }

    pub(crate) fn push_messages(&self, r: Result<Vec<Message>, RemoteError>) {
        self.messages.lock().unwrap().push_back(r);
    }
}

#[async_trait]
impl RemoteActions for FakeRemote {
    async fn toggle_follow(&self, subject: &str) -> Result<FollowStatus, RemoteError> {
        self.record(Call::ToggleFollow(subject.to_string()));
        self.checkpoint("toggle_follow").await;
        next(&self.follow, || FollowStatus::Followed)
    }

    async fn toggle_like(&self, target: &LikeTarget) -> Result<LikeOutcome, RemoteError> {
        self.record(Call::ToggleLike(target.key()));
        self.checkpoint("toggle_like").await;
        next(&self.like, LikeOutcome::default)
    }

    async fn add_comment(&self, post: &PostId, text: &str) -> Result<Vec<Comment>, RemoteError> {
        self.record(Call::AddComment(post.clone(), text.to_string()));
        Ok(vec![Comment {
            id: "c1".into(),
            author: Participant::Id("me".into()),
            text: text.to_string(),
            likes: ["me".to_string()].into(),
        }])
    }

    async fn respond_follow_request(&self, response: &FollowResponse) -> Result<(), RemoteError> {
        self.record(Call::Respond(response.clone()));
        self.checkpoint("respond").await;
        next(&self.respond, || ())
    }

    async fn fetch_notifications(&self) -> Result<Vec<NotificationRecord>, RemoteError> {
        self.record(Call::FetchNotifications);
        self.checkpoint("fetch_notifications").await;
        next(&self.notifications, Vec::new)
    }

    async fn mark_notifications_read(&self) -> Result<(), RemoteError> {
        self.record(Call::MarkRead);
        Ok(())
    }

    async fn unread_notification_count(&self) -> Result<u32, RemoteError> {
        self.record(Call::UnreadNotifications);
        next(&self.notification_count, || 0)
    }

    async fn unread_message_count(&self) -> Result<u32, RemoteError> {
        self.record(Call::UnreadMessages);
        next(&self.message_count, || 0)
    }

    async fn fetch_conversations(&self) -> Result<Vec<ConversationSummary>, RemoteError> {
        self.record(Call::FetchConversations);
        next(&self.conversations, Vec::new)
    }

    async fn fetch_messages(&self, peer: &str) -> Result<Vec<Message>, RemoteError> {
        self.record(Call::FetchMessages(peer.to_string()));
        next(&self.messages, Vec::new)
    }

    async fn send_message(&self, recipient: &str, text: &str) -> Result<Message, RemoteError> {
        self.record(Call::SendMessage(recipient.to_string(), text.to_string()));
        Ok(Message {
            id: format!("m-{}", self.calls().len()),
            sender: Participant::Id("me".into()),
            recipient: Participant::Id(recipient.to_string()),
            text: text.to_string(),
            created_at: Utc::now(),
        })
    }
}
