//! Realtime event hub.
//!
//! Transport code (the socket client) decodes frames into [`RealtimeEvent`]s
//! and publishes them here. Views and the session subscribe by event-name
//! pattern and keep the returned [`Subscription`] for as long as they are
//! mounted; dropping it deregisters the handler.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::SocialError;
use crate::model::{Message, NotificationId, NotificationRecord, RespondAction};
use crate::trie::EventTrie;

pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

type Handler = Arc<dyn Fn(Arc<RealtimeEvent>) -> BoxFuture + Send + Sync>;

/// Payload of `follow:responded`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponded {
    pub notification_id: NotificationId,
    pub action: RespondAction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    /// `notification`: a new notification for the current user.
    Notification(NotificationRecord),
    /// `notification:update`: an existing notification changed. Without
    /// a record the receiver refetches.
    NotificationUpdate(Option<NotificationRecord>),
    /// `follow:responded`: a follow request was answered, possibly on
    /// another device.
    FollowResponded(FollowResponded),
    /// `receive_message`
    ReceiveMessage(Message),
    /// `messages_read`: the server marked messages read.
    MessagesRead,
}

impl RealtimeEvent {
    pub const NOTIFICATION: &'static str = "notification";
    pub const NOTIFICATION_UPDATE: &'static str = "notification:update";
    pub const FOLLOW_RESPONDED: &'static str = "follow:responded";
    pub const RECEIVE_MESSAGE: &'static str = "receive_message";
    pub const MESSAGES_READ: &'static str = "messages_read";

    pub fn name(&self) -> &'static str {
        match self {
            RealtimeEvent::Notification(_) => Self::NOTIFICATION,
            RealtimeEvent::NotificationUpdate(_) => Self::NOTIFICATION_UPDATE,
            RealtimeEvent::FollowResponded(_) => Self::FOLLOW_RESPONDED,
            RealtimeEvent::ReceiveMessage(_) => Self::RECEIVE_MESSAGE,
            RealtimeEvent::MessagesRead => Self::MESSAGES_READ,
        }
    }

    /// Decode a transport frame.
    pub fn decode(name: &str, payload: Value) -> Result<Self, SocialError> {
        fn parse<T: serde::de::DeserializeOwned>(
            name: &str,
            payload: Value,
        ) -> Result<T, SocialError> {
            serde_json::from_value(payload).map_err(|e| SocialError::Payload {
                event: name.to_string(),
                reason: e.to_string(),
            })
        }

        match name {
            Self::NOTIFICATION => Ok(Self::Notification(parse(name, payload)?)),
            Self::NOTIFICATION_UPDATE => {
                let empty = match &payload {
                    Value::Null => true,
                    Value::Object(map) => map.is_empty(),
                    _ => false,
                };
                if empty {
                    Ok(Self::NotificationUpdate(None))
                } else {
                    Ok(Self::NotificationUpdate(Some(parse(name, payload)?)))
                }
            }
            Self::FOLLOW_RESPONDED => Ok(Self::FollowResponded(parse(name, payload)?)),
            Self::RECEIVE_MESSAGE => Ok(Self::ReceiveMessage(parse(name, payload)?)),
            Self::MESSAGES_READ => Ok(Self::MessagesRead),
            other => Err(SocialError::UnknownEvent(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Clone)]
struct HandlerEntry {
    id: SubscriptionId,
    handler: Handler,
}

struct HubInner {
    handlers: RwLock<EventTrie<HandlerEntry>>,
    next_id: AtomicU64,
}

/// Fan-out of realtime events to pattern-matched async handlers.
///
/// Handlers for one event run sequentially in match order; `publish`
/// returns once all of them have completed.
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                handlers: RwLock::new(EventTrie::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register an async handler for an event-name pattern.
    ///
    /// Patterns use `:` between levels and support `+` / `#`.
    pub fn subscribe<F, Fut>(&self, pattern: &str, handler: F) -> Subscription
    where
        F: Fn(Arc<RealtimeEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let handler: Handler = Arc::new(move |event| -> BoxFuture { Box::pin(handler(event)) });
        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pattern, HandlerEntry { id, handler });
        debug!(pattern, ?id, "realtime handler registered");
        Subscription {
            hub: Arc::downgrade(&self.inner),
            pattern: pattern.to_string(),
            id,
        }
    }

    /// Register a synchronous handler.
    pub fn on<F>(&self, pattern: &str, handler: F) -> Subscription
    where
        F: Fn(&RealtimeEvent) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        self.subscribe(pattern, move |event| {
            let handler = Arc::clone(&handler);
            async move { handler(&event) }
        })
    }

    /// Deliver an event. Returns how many handlers ran.
    pub async fn publish(&self, event: RealtimeEvent) -> usize {
        let name = event.name();
        let handlers: Vec<Handler> = {
            let trie = self
                .inner
                .handlers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            trie.matches(name)
                .into_iter()
                .map(|e| Arc::clone(&e.handler))
                .collect()
        };
        debug!(event = name, handlers = handlers.len(), "realtime event");
        let event = Arc::new(event);
        for handler in &handlers {
            handler(Arc::clone(&event)).await;
        }
        handlers.len()
    }

    /// Decode a raw frame and deliver it.
    pub async fn publish_frame(&self, name: &str, payload: Value) -> Result<usize, SocialError> {
        let event = RealtimeEvent::decode(name, payload)?;
        Ok(self.publish(event).await)
    }

    /// Whether any handler is currently registered.
    pub fn has_handlers(&self) -> bool {
        !self
            .inner
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration guard returned by [`EventHub::subscribe`].
#[must_use = "dropping a Subscription deregisters its handler"]
pub struct Subscription {
    hub: Weak<HubInner>,
    pattern: String,
    id: SubscriptionId,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(inner) = self.hub.upgrade() else {
            return;
        };
        let id = self.id;
        inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.pattern, |e| e.id == id);
        debug!(pattern = %self.pattern, ?id, "realtime handler released");
    }
}
