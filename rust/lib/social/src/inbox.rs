//! Conversation list owned by the messages view.

use crate::model::{ConversationSummary, Message, UserRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxTab {
    Primary,
    Requests,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inbox {
    conversations: Vec<ConversationSummary>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, conversations: Vec<ConversationSummary>) {
        self.conversations = conversations;
    }

    pub fn conversations(&self) -> &[ConversationSummary] {
        &self.conversations
    }

    pub fn get(&self, peer: &str) -> Option<&ConversationSummary> {
        self.conversations.iter().find(|c| c.user.id == peer)
    }

    pub fn unread(&self) -> usize {
        self.conversations.iter().filter(|c| !c.is_read).count()
    }

    /// Move `peer`'s conversation to the top, creating it if needed, and
    /// let `f` update it.
    fn touch<F>(&mut self, peer: UserRef, f: F)
    where
        F: FnOnce(&mut ConversationSummary),
    {
        let mut conv = match self.conversations.iter().position(|c| c.user.id == peer.id) {
            Some(idx) => self.conversations.remove(idx),
            None => ConversationSummary {
                user: peer,
                last_message: String::new(),
                is_read: true,
                is_request: false,
                updated_at: chrono::DateTime::<chrono::Utc>::MIN_UTC,
            },
        };
        f(&mut conv);
        self.conversations.insert(0, conv);
    }

    /// A message arrived from its sender. Unread unless that conversation
    /// is currently open.
    pub fn receive(&mut self, message: &Message, open_peer: Option<&str>) {
        let peer = message.sender.to_user();
        let is_open = open_peer == Some(message.sender.id());
        self.touch(peer, |conv| {
            conv.last_message = message.text.clone();
            conv.updated_at = message.created_at;
            conv.is_read = is_open;
        });
    }

    /// The acting user sent `message` to `peer`.
    pub fn record_sent(&mut self, message: &Message, peer: &UserRef) {
        self.touch(peer.clone(), |conv| {
            conv.last_message = message.text.clone();
            conv.updated_at = message.created_at;
            conv.is_read = true;
        });
    }

    /// Opening a conversation marks it read. Returns whether it existed.
    pub fn open(&mut self, peer: &str) -> bool {
        match self.conversations.iter_mut().find(|c| c.user.id == peer) {
            Some(conv) => {
                conv.is_read = true;
                true
            }
            None => false,
        }
    }

    pub fn tab(&self, tab: InboxTab) -> Vec<&ConversationSummary> {
        self.conversations
            .iter()
            .filter(|c| c.is_request == (tab == InboxTab::Requests))
            .collect()
    }

    /// Case-insensitive match on username or display name, across tabs.
    pub fn search(&self, query: &str) -> Vec<&ConversationSummary> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.tab(InboxTab::Primary);
        }
        self.conversations
            .iter()
            .filter(|c| {
                c.user.username.to_lowercase().contains(&needle)
                    || c
                        .user
                        .name
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(&needle))
            })
            .collect()
    }
}
