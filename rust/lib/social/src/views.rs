//! View state: the notifications page, the post feed and the inbox.
//!
//! A view is mounted from a [`ViewContext`], registers its realtime handlers
//! on the shared hub and owns a [`Reconciler`] scoped to its lifetime.
//! `teardown` (or drop) releases the handlers and discards every response
//! still in flight.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, warn};

use crate::badges::{Badge, BadgeAction, BadgeCounters};
use crate::error::SocialError;
use crate::feed::NotificationFeed;
use crate::hub::{EventHub, RealtimeEvent, Subscription};
use crate::inbox::{Inbox, InboxTab};
use crate::inflight::InFlight;
use crate::model::{
    Comment, ConversationSummary, LikeTarget, LikeableEntity, Message, NotificationRecord,
    PostId, RespondAction, UserId, UserRef,
};
use crate::notice::{NoticeConfig, Notices};
use crate::recency::{Grouped, group_by_recency};
use crate::reconciler::Reconciler;
use crate::relationship::RelationshipState;
use crate::remote::{FollowResponse, RemoteActions};

/// Source of "now" for timestamps written by the client.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

#[derive(Clone)]
pub struct ViewContext {
    pub me: UserId,
    pub remote: Arc<dyn RemoteActions>,
    pub hub: EventHub,
    pub badges: BadgeCounters,
    pub clock: Clock,
    pub notice: NoticeConfig,
}

impl ViewContext {
    fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.me.clone(), Arc::clone(&self.remote), self.notice)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Notifications
// ============================================================================

struct NotificationsInner {
    reconciler: Reconciler,
    feed: Mutex<NotificationFeed>,
    responding: InFlight,
    clock: Clock,
}

impl NotificationsInner {
    fn feed(&self) -> MutexGuard<'_, NotificationFeed> {
        lock(&self.feed)
    }

    async fn load(&self) -> Result<usize, SocialError> {
        let remote = self.reconciler.remote();
        let records = self.reconciler.call(remote.fetch_notifications()).await?;
        for record in &records {
            self.reconciler.confirm_user(&record.sender);
        }
        let n = records.len();
        self.feed().replace(records);
        Ok(n)
    }

    fn on_notification(&self, record: &NotificationRecord) {
        self.reconciler.confirm_user(&record.sender);
        self.feed().merge_incoming(record.clone());
    }

    async fn on_update(&self, record: Option<&NotificationRecord>) {
        match record {
            Some(record) => {
                self.reconciler.confirm_user(&record.sender);
                self.feed().merge_update(record.clone());
            }
            None => match self.load().await {
                Ok(n) => debug!(records = n, "notifications refetched"),
                Err(SocialError::Detached) => {}
                Err(e) => warn!(error = %e, "notification refetch failed"),
            },
        }
    }

    fn on_responded(&self, id: &str, action: RespondAction) {
        let changed = self.feed().apply_response(id, action, (self.clock)());
        debug!(notification = id, ?action, changed, "follow request answered elsewhere");
    }
}

pub struct NotificationsView {
    inner: Arc<NotificationsInner>,
    badges: BadgeCounters,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl NotificationsView {
    pub fn mount(ctx: &ViewContext) -> Self {
        let inner = Arc::new(NotificationsInner {
            reconciler: ctx.reconciler(),
            feed: Mutex::new(NotificationFeed::new()),
            responding: InFlight::new(),
            clock: Arc::clone(&ctx.clock),
        });
        let subscriptions = Self::wire(&inner, &ctx.hub);
        Self {
            inner,
            badges: ctx.badges.clone(),
            subscriptions: Mutex::new(subscriptions),
        }
    }

    fn wire(inner: &Arc<NotificationsInner>, hub: &EventHub) -> Vec<Subscription> {
        let mut subs = Vec::with_capacity(3);

        let weak = Arc::downgrade(inner);
        subs.push(hub.on(RealtimeEvent::NOTIFICATION, move |event| {
            if let (Some(inner), RealtimeEvent::Notification(record)) = (live(&weak), event) {
                inner.on_notification(record);
            }
        }));

        let weak = Arc::downgrade(inner);
        subs.push(hub.subscribe(RealtimeEvent::NOTIFICATION_UPDATE, move |event| {
            let inner = live(&weak);
            async move {
                if let (Some(inner), RealtimeEvent::NotificationUpdate(record)) = (inner, &*event) {
                    inner.on_update(record.as_ref()).await;
                }
            }
        }));

        let weak = Arc::downgrade(inner);
        subs.push(hub.on(RealtimeEvent::FOLLOW_RESPONDED, move |event| {
            if let (Some(inner), RealtimeEvent::FollowResponded(r)) = (live(&weak), event) {
                inner.on_responded(&r.notification_id, r.action);
            }
        }));

        subs
    }

    /// Fetch the list. Senders' relationship flags are recorded.
    pub async fn load(&self) -> Result<usize, SocialError> {
        self.inner.load().await.inspect_err(|e| {
            if *e != SocialError::Detached {
                warn!(error = %e, "notification load failed");
            }
        })
    }

    /// Visiting the page zeroes the badge and marks everything read on the
    /// server. Server errors are ignored.
    pub async fn mark_read(&self) {
        self.badges.dispatch(BadgeAction::Reset(Badge::Notifications));
        let rec = &self.inner.reconciler;
        if let Err(e) = rec.call(rec.remote().mark_notifications_read()).await {
            debug!(error = %e, "mark notifications read failed");
        }
    }

    /// Accept or reject the follow request `notification_id`.
    ///
    /// The list changes only once the server has answered. `Ok(false)`
    /// means the record is already gone: nothing was sent. On failure the
    /// record is removed whatever the action was.
    pub async fn respond(
        &self,
        notification_id: &str,
        action: RespondAction,
    ) -> Result<bool, SocialError> {
        let rec = &self.inner.reconciler;
        if rec.is_detached() {
            return Err(SocialError::Detached);
        }
        let _permit = self.inner.responding.try_acquire(notification_id)?;

        let requester = self
            .inner
            .feed()
            .get(notification_id)
            .map(|n| n.sender.id.clone());
        let Some(requester_id) = requester else {
            debug!(notification = notification_id, "follow request already handled");
            return Ok(false);
        };
        let response = FollowResponse {
            requester_id,
            action,
            notification_id: notification_id.to_string(),
        };

        match rec.call(rec.remote().respond_follow_request(&response)).await {
            Ok(()) => {
                let now = (self.inner.clock)();
                Ok(self.inner.feed().apply_response(notification_id, action, now))
            }
            Err(SocialError::Detached) => Err(SocialError::Detached),
            Err(err) => {
                self.inner.feed().remove(notification_id);
                warn!(notification = notification_id, ?action, error = %err, "follow response failed");
                rec.report(&err);
                Err(err)
            }
        }
    }

    /// Follow (or request to follow) the sender of `notification_id`.
    pub async fn follow_back(&self, notification_id: &str) -> Result<RelationshipState, SocialError> {
        let sender = self
            .inner
            .feed()
            .get(notification_id)
            .map(|n| n.sender.id.clone())
            .ok_or_else(|| SocialError::UnknownSubject(notification_id.to_string()))?;
        self.inner.reconciler.toggle_follow(&sender).await
    }

    pub fn relationship(&self, user: &str) -> Option<RelationshipState> {
        self.inner.reconciler.relationship(user)
    }

    pub fn snapshot(&self) -> Vec<NotificationRecord> {
        self.inner.feed().items().to_vec()
    }

    pub fn pending_requests(&self) -> Vec<NotificationRecord> {
        self.inner
            .feed()
            .pending_requests()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn requests_blurb(&self) -> Option<String> {
        self.inner.feed().requests_blurb()
    }

    /// Non-request notifications by recency, relative to `now`'s zone.
    pub fn grouped<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Grouped<NotificationRecord> {
        let feed = self.inner.feed();
        group_by_recency(feed.others().into_iter().cloned(), now)
    }

    pub fn notices(&self) -> &Notices {
        self.inner.reconciler.notices()
    }

    pub fn teardown(&self) {
        self.inner.reconciler.teardown();
        lock(&self.subscriptions).clear();
    }
}

impl Drop for NotificationsView {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// The view state behind `weak`, unless the view is gone or torn down.
fn live(weak: &Weak<NotificationsInner>) -> Option<Arc<NotificationsInner>> {
    weak.upgrade().filter(|inner| !inner.reconciler.is_detached())
}

// ============================================================================
// Posts and comments
// ============================================================================

/// Like and comment state for the posts on screen.
pub struct FeedView {
    reconciler: Reconciler,
}

impl FeedView {
    pub fn mount(ctx: &ViewContext) -> Self {
        Self {
            reconciler: ctx.reconciler(),
        }
    }

    pub fn seed_post(&self, post: &PostId, likers: impl IntoIterator<Item = UserId>) {
        self.reconciler
            .confirm_likers(&LikeTarget::Post(post.clone()), likers);
    }

    pub fn seed_comments(&self, post: &PostId, comments: &[Comment]) {
        for comment in comments {
            let target = LikeTarget::Comment {
                post_id: post.clone(),
                comment_id: comment.id.clone(),
            };
            self.reconciler
                .confirm_likers(&target, comment.likes.iter().cloned());
        }
    }

    pub fn seed_user(&self, user: &UserRef) {
        self.reconciler.confirm_user(user);
    }

    pub async fn toggle_like(&self, target: &LikeTarget) -> Result<LikeableEntity, SocialError> {
        self.reconciler.toggle_like(target).await
    }

    pub async fn add_comment(&self, post: &PostId, text: &str) -> Result<Vec<Comment>, SocialError> {
        self.reconciler.add_comment(post, text).await
    }

    pub async fn toggle_follow(&self, user: &str) -> Result<RelationshipState, SocialError> {
        self.reconciler.toggle_follow(user).await
    }

    pub fn is_liked(&self, target: &LikeTarget) -> bool {
        self.reconciler.is_liked(target)
    }

    pub fn like_count(&self, target: &LikeTarget) -> usize {
        self.reconciler
            .likeable(target)
            .map_or(0, |e| e.like_count())
    }

    pub fn relationship(&self, user: &str) -> Option<RelationshipState> {
        self.reconciler.relationship(user)
    }

    pub fn notices(&self) -> &Notices {
        self.reconciler.notices()
    }

    pub fn teardown(&self) {
        self.reconciler.teardown();
    }
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Default)]
struct MessagesState {
    inbox: Inbox,
    open_peer: Option<UserRef>,
    thread: Vec<Message>,
}

impl MessagesState {
    fn is_open(&self, peer: &str) -> bool {
        self.open_peer.as_ref().is_some_and(|p| p.id == peer)
    }

    fn append(&mut self, message: &Message) {
        if !self.thread.iter().any(|m| m.id == message.id) {
            self.thread.push(message.clone());
        }
    }
}

struct MessagesInner {
    reconciler: Reconciler,
    state: Mutex<MessagesState>,
}

impl MessagesInner {
    fn state(&self) -> MutexGuard<'_, MessagesState> {
        lock(&self.state)
    }

    fn on_message(&self, message: &Message) {
        let me = self.reconciler.me();
        let mut state = self.state();
        if message.sender.id() == me {
            // Our own message, echoed from another device.
            let peer = message.recipient.to_user();
            if state.is_open(&peer.id) {
                state.append(message);
            }
            state.inbox.record_sent(message, &peer);
        } else {
            let open = state.open_peer.as_ref().map(|p| p.id.clone());
            if state.is_open(message.sender.id()) {
                state.append(message);
            }
            state.inbox.receive(message, open.as_deref());
        }
    }
}

pub struct MessagesView {
    inner: Arc<MessagesInner>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl MessagesView {
    /// Mounting the inbox clears the message badge.
    pub fn mount(ctx: &ViewContext) -> Self {
        let inner = Arc::new(MessagesInner {
            reconciler: ctx.reconciler(),
            state: Mutex::new(MessagesState::default()),
        });

        let weak = Arc::downgrade(&inner);
        let sub = ctx.hub.on(RealtimeEvent::RECEIVE_MESSAGE, move |event| {
            let inner = weak
                .upgrade()
                .filter(|inner| !inner.reconciler.is_detached());
            if let (Some(inner), RealtimeEvent::ReceiveMessage(message)) = (inner, event) {
                inner.on_message(message);
            }
        });
        ctx.badges.dispatch(BadgeAction::Reset(Badge::Messages));

        Self {
            inner,
            subscriptions: Mutex::new(vec![sub]),
        }
    }

    pub async fn load(&self) -> Result<usize, SocialError> {
        let rec = &self.inner.reconciler;
        let list = rec.call(rec.remote().fetch_conversations()).await?;
        let n = list.len();
        self.inner.state().inbox.replace(list);
        Ok(n)
    }

    /// Open the conversation with `peer` and load its messages.
    pub async fn open(&self, peer: UserRef) -> Result<usize, SocialError> {
        let peer_id = peer.id.clone();
        {
            let mut state = self.inner.state();
            state.inbox.open(&peer_id);
            state.open_peer = Some(peer);
            state.thread.clear();
        }

        let rec = &self.inner.reconciler;
        let messages = match rec.call(rec.remote().fetch_messages(&peer_id)).await {
            Ok(messages) => messages,
            Err(err) => {
                if err != SocialError::Detached {
                    warn!(peer = %peer_id, error = %err, "message history failed");
                    rec.report(&err);
                }
                return Err(err);
            }
        };

        let mut state = self.inner.state();
        // Another conversation was opened while this one was loading.
        if !state.is_open(&peer_id) {
            return Ok(0);
        }
        let n = messages.len();
        state.thread = messages;
        Ok(n)
    }

    pub fn close(&self) {
        let mut state = self.inner.state();
        state.open_peer = None;
        state.thread.clear();
    }

    /// Send `text` to the open conversation.
    pub async fn send(&self, text: &str) -> Result<Message, SocialError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SocialError::EmptyMessage);
        }
        let peer = self
            .inner
            .state()
            .open_peer
            .clone()
            .ok_or(SocialError::NoRecipient)?;

        let rec = &self.inner.reconciler;
        match rec.call(rec.remote().send_message(&peer.id, text)).await {
            Ok(message) => {
                let mut state = self.inner.state();
                if state.is_open(&peer.id) {
                    state.append(&message);
                }
                state.inbox.record_sent(&message, &peer);
                Ok(message)
            }
            Err(SocialError::Detached) => Err(SocialError::Detached),
            Err(err) => {
                warn!(peer = %peer.id, error = %err, "send failed");
                rec.report(&err);
                Err(err)
            }
        }
    }

    pub fn thread(&self) -> Vec<Message> {
        self.inner.state().thread.clone()
    }

    pub fn open_peer(&self) -> Option<UserRef> {
        self.inner.state().open_peer.clone()
    }

    pub fn conversations(&self, tab: InboxTab) -> Vec<ConversationSummary> {
        self.inner
            .state()
            .inbox
            .tab(tab)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn search(&self, query: &str) -> Vec<ConversationSummary> {
        self.inner
            .state()
            .inbox
            .search(query)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn unread(&self) -> usize {
        self.inner.state().inbox.unread()
    }

    pub fn notices(&self) -> &Notices {
        self.inner.reconciler.notices()
    }

    pub fn teardown(&self) {
        self.inner.reconciler.teardown();
        lock(&self.subscriptions).clear();
    }
}

impl Drop for MessagesView {
    fn drop(&mut self) {
        self.teardown();
    }
}
