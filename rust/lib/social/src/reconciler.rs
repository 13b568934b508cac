//! Optimistic interaction reconciler.
//!
//! Follow and like toggles are applied to local state before the network
//! round trip, then converged to the server's answer or rolled back in
//! full. One reconciler belongs to one view and shares that view's
//! lifetime: after [`Reconciler::teardown`] responses are discarded
//! instead of applied.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{RemoteError, SocialError};
use crate::inflight::InFlight;
use crate::ledger::{Ledger, Rollback};
use crate::model::{Comment, LikeOutcome, LikeTarget, LikeableEntity, PostId, UserId, UserRef};
use crate::notice::{NoticeConfig, Notices};
use crate::relationship::RelationshipState;
use crate::remote::RemoteActions;

pub struct Reconciler {
    me: UserId,
    remote: Arc<dyn RemoteActions>,
    relationships: Ledger<RelationshipState>,
    likes: Ledger<LikeableEntity>,
    follow_guard: InFlight,
    like_guard: InFlight,
    notices: Notices,
    scope: CancellationToken,
}

impl Reconciler {
    pub fn new(me: impl Into<UserId>, remote: Arc<dyn RemoteActions>, notice: NoticeConfig) -> Self {
        Self {
            me: me.into(),
            remote,
            relationships: Ledger::new(),
            likes: Ledger::new(),
            follow_guard: InFlight::new(),
            like_guard: InFlight::new(),
            notices: Notices::new(notice),
            scope: CancellationToken::new(),
        }
    }

    pub fn me(&self) -> &str {
        &self.me
    }

    pub fn remote(&self) -> &Arc<dyn RemoteActions> {
        &self.remote
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    /// Stop applying responses. Calls still in flight resolve to
    /// `SocialError::Detached`.
    pub fn teardown(&self) {
        self.scope.cancel();
    }

    pub fn is_detached(&self) -> bool {
        self.scope.is_cancelled()
    }

    /// Await a remote call within this reconciler's lifetime.
    pub async fn call<T, F>(&self, fut: F) -> Result<T, SocialError>
    where
        F: Future<Output = Result<T, RemoteError>>,
    {
        if self.scope.is_cancelled() {
            return Err(SocialError::Detached);
        }
        tokio::select! {
            biased;
            _ = self.scope.cancelled() => Err(SocialError::Detached),
            res = fut => {
                if self.scope.is_cancelled() {
                    return Err(SocialError::Detached);
                }
                res.map_err(SocialError::from)
            }
        }
    }

    /// Turn a failure into a notice, unless it only means the view is gone.
    pub fn report(&self, err: &SocialError) {
        if *err != SocialError::Detached {
            self.notices.error(err.notice_text());
        }
    }

    // ====================================================================
    // Relationships
    // ====================================================================

    pub fn relationship(&self, subject: &str) -> Option<RelationshipState> {
        self.relationships.get(subject)
    }

    pub fn confirm_relationship(&self, state: RelationshipState) {
        let key = state.subject_id.clone();
        self.relationships.confirm(&key, state);
    }

    /// Record the server's view of the acting user's relationship to `user`.
    ///
    /// A payload without a follower count keeps the known count.
    pub fn confirm_user(&self, user: &UserRef) {
        if user.id == self.me {
            return;
        }
        self.relationships.confirm_with(&user.id, |known| {
            let mut state = RelationshipState::from_user(user);
            if user.followers_count.is_none() {
                if let Some(known) = known {
                    state.follower_count = known.follower_count;
                }
            }
            state
        });
    }

    /// Follow, unfollow, request or cancel a request, depending on the
    /// current state of `subject`.
    pub async fn toggle_follow(&self, subject: &str) -> Result<RelationshipState, SocialError> {
        if self.is_detached() {
            return Err(SocialError::Detached);
        }
        if subject == self.me {
            return Err(SocialError::SelfAction);
        }
        let _permit = self.follow_guard.try_acquire(subject)?;

        let (pending, action) = self
            .relationships
            .begin(subject, |state| {
                let action = state.next_action();
                state.apply(action);
                action
            })
            .ok_or_else(|| SocialError::UnknownSubject(subject.to_string()))?;
        debug!(subject, ?action, "optimistic follow toggle");

        match self.call(self.remote.toggle_follow(subject)).await {
            Ok(status) => {
                debug!(subject, ?status, "follow toggle confirmed");
                self.relationships
                    .commit(pending, |base, cur| cur.reconcile(base, status))
                    .ok_or_else(|| SocialError::UnknownSubject(subject.to_string()))
            }
            Err(SocialError::Detached) => {
                debug!(subject, "follow toggle response discarded");
                Err(SocialError::Detached)
            }
            Err(err) => {
                let outcome = self.relationships.rollback(pending);
                warn!(subject, ?outcome, error = %err, "follow toggle failed");
                self.report(&err);
                Err(err)
            }
        }
    }

    // ====================================================================
    // Likes
    // ====================================================================

    pub fn likeable(&self, target: &LikeTarget) -> Option<LikeableEntity> {
        self.likes.get(&target.key())
    }

    pub fn confirm_likers(&self, target: &LikeTarget, likers: impl IntoIterator<Item = UserId>) {
        let entity = LikeableEntity::new(entity_id(target), likers);
        self.likes.confirm(&target.key(), entity);
    }

    pub fn is_liked(&self, target: &LikeTarget) -> bool {
        self.likeable(target)
            .is_some_and(|e| e.is_liked_by(&self.me))
    }

    /// Flip the acting user's like on `target`.
    pub async fn toggle_like(&self, target: &LikeTarget) -> Result<LikeableEntity, SocialError> {
        if self.is_detached() {
            return Err(SocialError::Detached);
        }
        let key = target.key();
        let _permit = self.like_guard.try_acquire(&key)?;

        let me = self.me.clone();
        let (pending, liked) = self.likes.begin_or_insert(
            &key,
            || LikeableEntity::new(entity_id(target), []),
            |entity| {
                if entity.liker_ids.remove(&me) {
                    false
                } else {
                    entity.liker_ids.insert(me.clone());
                    true
                }
            },
        );
        debug!(%target, liked, "optimistic like toggle");

        match self.call(self.remote.toggle_like(target)).await {
            Ok(outcome) => self
                .likes
                .commit(pending, |_, cur| apply_like_outcome(cur, &me, outcome))
                .ok_or_else(|| SocialError::UnknownSubject(key.clone())),
            Err(SocialError::Detached) => {
                debug!(%target, "like toggle response discarded");
                Err(SocialError::Detached)
            }
            Err(err) => {
                let outcome = self.likes.rollback(pending);
                if outcome == Rollback::Superseded {
                    debug!(%target, "like rollback kept a newer confirmed value");
                }
                warn!(%target, error = %err, "like toggle failed");
                self.report(&err);
                Err(err)
            }
        }
    }

    // ====================================================================
    // Comments
    // ====================================================================

    /// Post a comment. The returned list is the server's and replaces the
    /// like state of every comment on the post.
    pub async fn add_comment(&self, post: &PostId, text: &str) -> Result<Vec<Comment>, SocialError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SocialError::EmptyComment);
        }
        match self.call(self.remote.add_comment(post, text)).await {
            Ok(comments) => {
                for comment in &comments {
                    let target = LikeTarget::Comment {
                        post_id: post.clone(),
                        comment_id: comment.id.clone(),
                    };
                    self.confirm_likers(&target, comment.likes.iter().cloned());
                }
                Ok(comments)
            }
            Err(err) => {
                warn!(post = %post, error = %err, "comment failed");
                self.report(&err);
                Err(err)
            }
        }
    }
}

fn entity_id(target: &LikeTarget) -> String {
    match target {
        LikeTarget::Post(id) => id.clone(),
        LikeTarget::Comment { comment_id, .. } => comment_id.clone(),
    }
}

fn apply_like_outcome(entity: &mut LikeableEntity, me: &str, outcome: LikeOutcome) {
    match (outcome.likes, outcome.liked) {
        (Some(likers), _) => entity.liker_ids = likers,
        (None, Some(true)) => {
            entity.liker_ids.insert(me.to_string());
        }
        (None, Some(false)) => {
            entity.liker_ids.remove(me);
        }
        // Acknowledged without a body: the optimistic value stands.
        (None, None) => {}
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}
