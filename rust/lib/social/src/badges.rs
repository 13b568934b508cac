use std::sync::Arc;

use tokio::sync::watch;

use crate::model::UnreadCounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Notifications,
    Messages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeAction {
    Increment(Badge),
    Reset(Badge),
    Set(Badge, u32),
    /// Both counters back to zero (logout).
    Clear,
}

/// Pure transition for one action.
pub fn reduce(counts: &mut UnreadCounts, action: BadgeAction) {
    fn slot(counts: &mut UnreadCounts, badge: Badge) -> &mut u32 {
        match badge {
            Badge::Notifications => &mut counts.notifications,
            Badge::Messages => &mut counts.messages,
        }
    }

    match action {
        BadgeAction::Increment(badge) => {
            let n = slot(counts, badge);
            *n = n.saturating_add(1);
        }
        BadgeAction::Reset(badge) => *slot(counts, badge) = 0,
        BadgeAction::Set(badge, value) => *slot(counts, badge) = value,
        BadgeAction::Clear => *counts = UnreadCounts::default(),
    }
}

/// The process-wide unread counters.
///
/// Every write goes through [`BadgeCounters::dispatch`], a single
/// synchronous read-modify-write; readers hold a `watch::Receiver` and can
/// only observe.
#[derive(Clone)]
pub struct BadgeCounters {
    tx: Arc<watch::Sender<UnreadCounts>>,
}

impl BadgeCounters {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(UnreadCounts::default());
        Self { tx: Arc::new(tx) }
    }

    /// Apply `action` and return the resulting counts.
    pub fn dispatch(&self, action: BadgeAction) -> UnreadCounts {
        self.tx.send_modify(|counts| reduce(counts, action));
        *self.tx.borrow()
    }

    pub fn current(&self) -> UnreadCounts {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<UnreadCounts> {
        self.tx.subscribe()
    }
}

impl Default for BadgeCounters {
    fn default() -> Self {
        Self::new()
    }
}
