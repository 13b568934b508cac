//! Signed-in session: owns the realtime wiring of the unread badges.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::badges::{Badge, BadgeAction, BadgeCounters};
use crate::hub::{EventHub, RealtimeEvent, Subscription};
use crate::model::{UnreadCounts, UserId};
use crate::notice::NoticeConfig;
use crate::remote::RemoteActions;
use crate::views::{ViewContext, system_clock};

pub struct Session {
    me: UserId,
    remote: Arc<dyn RemoteActions>,
    hub: EventHub,
    badges: BadgeCounters,
    notice: NoticeConfig,
    subscriptions: Vec<Subscription>,
}

impl Session {
    /// Wire badge handlers into `hub`, then fetch the initial counts.
    ///
    /// Handlers go in first so an event that races the initial fetch is
    /// not lost. The fetched counts are authoritative: they replace any
    /// increment pushed while the fetch was in flight. A failed count fetch
    /// leaves that counter at zero.
    pub async fn start(
        me: impl Into<UserId>,
        remote: Arc<dyn RemoteActions>,
        hub: EventHub,
        badges: BadgeCounters,
    ) -> Self {
        let me = me.into();
        let subscriptions = Self::wire(&remote, &hub, &badges);

        let (notifications, messages) = tokio::join!(
            remote.unread_notification_count(),
            remote.unread_message_count()
        );
        let notifications = notifications.unwrap_or_else(|e| {
            warn!(error = %e, "unread notification count unavailable");
            0
        });
        let messages = messages.unwrap_or_else(|e| {
            warn!(error = %e, "unread message count unavailable");
            0
        });
        badges.dispatch(BadgeAction::Set(Badge::Notifications, notifications));
        let counts = badges.dispatch(BadgeAction::Set(Badge::Messages, messages));
        info!(user = %me, ?counts, "session started");

        Self {
            me,
            remote,
            hub,
            badges,
            notice: NoticeConfig::default(),
            subscriptions,
        }
    }

    fn wire(
        remote: &Arc<dyn RemoteActions>,
        hub: &EventHub,
        badges: &BadgeCounters,
    ) -> Vec<Subscription> {
        let mut subs = Vec::with_capacity(4);

        for pattern in [RealtimeEvent::NOTIFICATION, RealtimeEvent::NOTIFICATION_UPDATE] {
            let badges = badges.clone();
            subs.push(hub.on(pattern, move |_| {
                badges.dispatch(BadgeAction::Increment(Badge::Notifications));
            }));
        }

        let b = badges.clone();
        subs.push(hub.on(RealtimeEvent::RECEIVE_MESSAGE, move |_| {
            b.dispatch(BadgeAction::Increment(Badge::Messages));
        }));

        let remote = Arc::clone(remote);
        let b = badges.clone();
        subs.push(hub.subscribe(RealtimeEvent::MESSAGES_READ, move |_| {
            let remote = Arc::clone(&remote);
            let badges = b.clone();
            async move {
                match remote.unread_message_count().await {
                    Ok(n) => {
                        badges.dispatch(BadgeAction::Set(Badge::Messages, n));
                    }
                    Err(e) => warn!(error = %e, "unread message refresh failed"),
                }
            }
        }));

        subs
    }

    pub fn with_notice_config(mut self, notice: NoticeConfig) -> Self {
        self.notice = notice;
        self
    }

    pub fn me(&self) -> &str {
        &self.me
    }

    pub fn counts(&self) -> UnreadCounts {
        self.badges.current()
    }

    pub fn badges(&self) -> &BadgeCounters {
        &self.badges
    }

    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    /// Everything a view needs to mount.
    pub fn context(&self) -> ViewContext {
        ViewContext {
            me: self.me.clone(),
            remote: Arc::clone(&self.remote),
            hub: self.hub.clone(),
            badges: self.badges.clone(),
            clock: system_clock(),
            notice: self.notice,
        }
    }

    /// Zero the notification badge and tell the server. The server call is
    /// fire-and-forget.
    pub async fn clear_notifications(&self) {
        self.badges.dispatch(BadgeAction::Reset(Badge::Notifications));
        if let Err(e) = self.remote.mark_notifications_read().await {
            debug!(error = %e, "mark notifications read failed");
        }
    }

    pub fn clear_messages(&self) {
        self.badges.dispatch(BadgeAction::Reset(Badge::Messages));
    }

    /// Sign out: release the handlers and zero both counters.
    pub fn end(self) {
        drop(self);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.subscriptions.clear();
        self.badges.dispatch(BadgeAction::Clear);
        info!(user = %self.me, "session ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::feed::tests::record;
    use crate::model::{Message, NotificationKind, Participant};
    use crate::testing::{Call, FakeRemote};
    use chrono::Utc;

    fn message() -> Message {
        Message {
            id: "m1".into(),
            sender: Participant::Id("u2".into()),
            recipient: Participant::Id("me".into()),
            text: "hi".into(),
            created_at: Utc::now(),
        }
    }

    // ========================================================================
    // Start
    // ========================================================================

    #[tokio::test]
    async fn start_fetches_initial_counts() {
        let remote = FakeRemote::new();
        remote.push_counts(Ok(3), Ok(2));
        let session = Session::start("me", remote.clone(), EventHub::new(), BadgeCounters::new()).await;

        assert_eq!(session.counts(), UnreadCounts { notifications: 3, messages: 2 });
        let calls = remote.calls();
        assert!(calls.contains(&Call::UnreadNotifications));
        assert!(calls.contains(&Call::UnreadMessages));
    }

    #[tokio::test]
    async fn failed_count_fetch_leaves_zero() {
        let remote = FakeRemote::new();
        remote.push_counts(Err(RemoteError::Network("down".into())), Ok(4));
        let session = Session::start("me", remote, EventHub::new(), BadgeCounters::new()).await;
        assert_eq!(session.counts(), UnreadCounts { notifications: 0, messages: 4 });
    }

    // ========================================================================
    // Realtime
    // ========================================================================

    #[tokio::test]
    async fn events_bump_badges() {
        let remote = FakeRemote::new();
        let hub = EventHub::new();
        let session = Session::start("me", remote, hub.clone(), BadgeCounters::new()).await;

        let now = Utc::now();
        hub.publish(RealtimeEvent::Notification(record("n1", NotificationKind::Like, now)))
            .await;
        hub.publish(RealtimeEvent::NotificationUpdate(None)).await;
        hub.publish(RealtimeEvent::ReceiveMessage(message())).await;
        hub.publish(RealtimeEvent::FollowResponded(crate::hub::FollowResponded {
            notification_id: "n1".into(),
            action: crate::model::RespondAction::Accept,
        }))
        .await;

        assert_eq!(session.counts(), UnreadCounts { notifications: 2, messages: 1 });
    }

    #[tokio::test]
    async fn messages_read_refetches_count() {
        let remote = FakeRemote::new();
        let hub = EventHub::new();
        let session = Session::start("me", remote.clone(), hub.clone(), BadgeCounters::new()).await;
        hub.publish(RealtimeEvent::ReceiveMessage(message())).await;
        hub.publish(RealtimeEvent::ReceiveMessage(message())).await;
        assert_eq!(session.counts().messages, 2);

        remote.push_message_count(Ok(1));
        hub.publish(RealtimeEvent::MessagesRead).await;
        assert_eq!(session.counts().messages, 1);

        remote.push_message_count(Err(RemoteError::Network("down".into())));
        hub.publish(RealtimeEvent::MessagesRead).await;
        assert_eq!(session.counts().messages, 1);
    }

    // ========================================================================
    // Clearing and sign-out
    // ========================================================================

    #[tokio::test]
    async fn clear_notifications_resets_and_marks_read() {
        let remote = FakeRemote::new();
        remote.push_counts(Ok(5), Ok(5));
        let session = Session::start("me", remote.clone(), EventHub::new(), BadgeCounters::new()).await;

        session.clear_notifications().await;
        session.clear_messages();
        assert_eq!(session.counts(), UnreadCounts::default());
        assert_eq!(remote.calls().last(), Some(&Call::MarkRead));
    }

    #[tokio::test]
    async fn end_releases_handlers_and_zeroes() {
        let remote = FakeRemote::new();
        remote.push_counts(Ok(5), Ok(1));
        let hub = EventHub::new();
        let badges = BadgeCounters::new();
        let session = Session::start("me", remote, hub.clone(), badges.clone()).await;
        assert!(hub.has_handlers());

        session.end();
        assert!(!hub.has_handlers());
        assert_eq!(badges.current(), UnreadCounts::default());

        hub.publish(RealtimeEvent::ReceiveMessage(message())).await;
        assert_eq!(badges.current().messages, 0);
    }

    #[tokio::test]
    async fn context_shares_hub_and_badges() {
        let remote = FakeRemote::new();
        let hub = EventHub::new();
        let session = Session::start("me", remote, hub.clone(), BadgeCounters::new()).await;
        let ctx = session.context();
        assert_eq!(ctx.me, "me");

        ctx.badges.dispatch(BadgeAction::Increment(Badge::Messages));
        assert_eq!(session.counts().messages, 1);
    }
}
