//! Follow relationship state and its transitions.

use serde::{Deserialize, Serialize};

use crate::model::{FollowStatus, UserId, UserRef};

/// The acting user's relationship to one subject.
///
/// `is_following` and `is_requested` are mutually exclusive once a toggle
/// has resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipState {
    pub subject_id: UserId,
    pub is_following: bool,
    pub is_requested: bool,
    pub is_private_target: bool,
    pub follower_count: u32,
}

/// The action a toggle resolves to, derived from the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowAction {
    Unfollow,
    Request,
    CancelRequest,
    Follow,
}

impl RelationshipState {
    pub fn new(subject_id: impl Into<UserId>, is_private_target: bool) -> Self {
        Self {
            subject_id: subject_id.into(),
            is_following: false,
            is_requested: false,
            is_private_target,
            follower_count: 0,
        }
    }

    pub fn from_user(user: &UserRef) -> Self {
        Self {
            subject_id: user.id.clone(),
            is_following: user.is_following,
            is_requested: user.is_requested && !user.is_following,
            is_private_target: user.is_private,
            follower_count: user.followers_count.unwrap_or(0),
        }
    }

    /// Pick the toggle action. Precedence: unfollow, request, cancel, follow.
    pub fn next_action(&self) -> FollowAction {
        if self.is_following {
            FollowAction::Unfollow
        } else if self.is_private_target && !self.is_requested {
            FollowAction::Request
        } else if self.is_requested {
            FollowAction::CancelRequest
        } else {
            FollowAction::Follow
        }
    }

    /// Apply the speculative effect of `action`.
    pub fn apply(&mut self, action: FollowAction) {
        match action {
            FollowAction::Unfollow => {
                self.is_following = false;
                self.is_requested = false;
                self.follower_count = self.follower_count.saturating_sub(1);
            }
            FollowAction::Request => self.is_requested = true,
            FollowAction::CancelRequest => self.is_requested = false,
            FollowAction::Follow => {
                self.is_following = true;
                self.follower_count = self.follower_count.saturating_add(1);
            }
        }
    }

    /// Overwrite with the server-confirmed status.
    ///
    /// The follower count is recomputed from `base`, the newest confirmed
    /// state known when the answer arrives.
    pub fn reconcile(&mut self, base: &RelationshipState, status: FollowStatus) {
        self.is_following = status == FollowStatus::Followed;
        self.is_requested = status == FollowStatus::Requested;
        self.follower_count = match (base.is_following, self.is_following) {
            (false, true) => base.follower_count.saturating_add(1),
            (true, false) => base.follower_count.saturating_sub(1),
            _ => base.follower_count,
        };
    }

    /// Label for the follow button.
    pub fn button_label(&self) -> &'static str {
        if self.is_following {
            "Following"
        } else if self.is_requested {
            "Requested"
        } else {
            "Follow"
        }
    }
}
