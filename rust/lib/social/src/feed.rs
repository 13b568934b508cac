//! The notification list owned by the notifications view.
//!
//! Local edits and realtime events go through the same methods here, keyed
//! by notification id, so an action taken on another device converges to
//! the same list as the local one.

use chrono::{DateTime, TimeZone, Utc};

use crate::model::{NotificationKind, NotificationRecord, RespondAction};
use crate::recency::{Grouped, group_by_recency};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationFeed {
    items: Vec<NotificationRecord>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list with a fetched one. Server order is kept.
    pub fn replace(&mut self, records: Vec<NotificationRecord>) {
        self.items = records;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&NotificationRecord> {
        self.items.iter().find(|n| n.id == id)
    }

    pub fn items(&self) -> &[NotificationRecord] {
        &self.items
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|n| n.id == id)
    }

    /// A pushed notification: replace in place when the id is known,
    /// otherwise prepend.
    pub fn merge_incoming(&mut self, record: NotificationRecord) {
        match self.position(&record.id) {
            Some(idx) => self.items[idx] = record,
            None => self.items.insert(0, record),
        }
    }

    /// A changed notification: upsert, then restore newest-first order.
    pub fn merge_update(&mut self, record: NotificationRecord) {
        self.merge_incoming(record);
        self.sort_newest_first();
    }

    /// Apply the outcome of answering a follow request.
    ///
    /// Accept turns a `follow_request` into a fresh `follow` at `now` and
    /// re-sorts; accepting a record that is no longer a request changes
    /// nothing. Reject removes the record. Returns whether the list changed.
    pub fn apply_response(&mut self, id: &str, action: RespondAction, now: DateTime<Utc>) -> bool {
        match action {
            RespondAction::Accept => {
                let Some(idx) = self.position(id) else {
                    return false;
                };
                let record = &mut self.items[idx];
                if record.kind != NotificationKind::FollowRequest {
                    return false;
                }
                record.kind = NotificationKind::Follow;
                record.created_at = now;
                self.sort_newest_first();
                true
            }
            RespondAction::Reject => self.remove(id).is_some(),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<NotificationRecord> {
        let idx = self.position(id)?;
        Some(self.items.remove(idx))
    }

    // Stable, so records with equal timestamps keep their relative order.
    fn sort_newest_first(&mut self) {
        self.items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }

    /// Follow requests awaiting an answer.
    pub fn pending_requests(&self) -> Vec<&NotificationRecord> {
        self.items
            .iter()
            .filter(|n| n.kind == NotificationKind::FollowRequest)
            .collect()
    }

    /// Everything that is not a pending request.
    pub fn others(&self) -> Vec<&NotificationRecord> {
        self.items
            .iter()
            .filter(|n| n.kind != NotificationKind::FollowRequest)
            .collect()
    }

    /// Non-request notifications grouped by recency.
    pub fn grouped<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Grouped<&NotificationRecord> {
        group_by_recency(self.others(), now)
    }

    /// Summary line for the collapsed requests header, e.g.
    /// `"alice and 2 others"`.
    pub fn requests_blurb(&self) -> Option<String> {
        let pending = self.pending_requests();
        let first = pending.first()?;
        let name = if first.sender.username.is_empty() {
            "Someone"
        } else {
            first.sender.username.as_str()
        };
        Some(match pending.len() {
            1 => name.to_string(),
            n => format!("{} and {} others", name, n - 1),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::UserRef;
    use crate::recency::Bucket;
    use chrono::Duration;

    pub(crate) fn record(id: &str, kind: NotificationKind, at: DateTime<Utc>) -> NotificationRecord {
        NotificationRecord {
            id: id.into(),
            kind,
            sender: UserRef::new(format!("sender-{}", id), format!("user{}", id)),
            post: None,
            comment_text: None,
            created_at: at,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap()
    }

    fn ids(feed: &NotificationFeed) -> Vec<&str> {
        feed.items().iter().map(|n| n.id.as_str()).collect()
    }

    fn sample() -> NotificationFeed {
        let mut feed = NotificationFeed::new();
        feed.replace(vec![
            record("1", NotificationKind::Like, t0()),
            record("2", NotificationKind::FollowRequest, t0() - Duration::hours(5)),
            record("3", NotificationKind::Comment, t0() - Duration::days(2)),
        ]);
        feed
    }

    // ========================================================================
    // Merging
    // ========================================================================

    #[test]
    fn incoming_prepends_new_ids() {
        let mut feed = sample();
        feed.merge_incoming(record("4", NotificationKind::Mention, t0()));
        assert_eq!(ids(&feed), vec!["4", "1", "2", "3"]);
    }

    #[test]
    fn incoming_replaces_known_ids_in_place() {
        let mut feed = sample();
        let mut changed = record("2", NotificationKind::FollowRequest, t0());
        changed.sender.is_following = true;
        feed.merge_incoming(changed);
        assert_eq!(ids(&feed), vec!["1", "2", "3"]);
        assert!(feed.get("2").unwrap().sender.is_following);
    }

    #[test]
    fn update_resorts() {
        let mut feed = sample();
        feed.merge_update(record("3", NotificationKind::Comment, t0() + Duration::minutes(1)));
        assert_eq!(ids(&feed), vec!["3", "1", "2"]);
    }

    // ========================================================================
    // Follow request responses
    // ========================================================================

    #[test]
    fn accept_rewrites_and_moves_to_top() {
        let mut feed = sample();
        let now = t0() + Duration::minutes(10);
        assert!(feed.apply_response("2", RespondAction::Accept, now));

        let rec = feed.get("2").unwrap();
        assert_eq!(rec.kind, NotificationKind::Follow);
        assert_eq!(rec.created_at, now);
        assert_eq!(ids(&feed), vec!["2", "1", "3"]);
    }

    #[test]
    fn accept_twice_is_a_noop() {
        let mut feed = sample();
        let now = t0() + Duration::minutes(10);
        assert!(feed.apply_response("2", RespondAction::Accept, now));
        let after_first = feed.clone();

        assert!(!feed.apply_response("2", RespondAction::Accept, now + Duration::minutes(1)));
        assert_eq!(feed, after_first);
    }

    #[test]
    fn reject_removes_and_is_idempotent() {
        let mut feed = sample();
        assert!(feed.apply_response("2", RespondAction::Reject, t0()));
        let after_first = feed.clone();
        assert!(!feed.apply_response("2", RespondAction::Reject, t0()));
        assert_eq!(feed, after_first);
        assert_eq!(ids(&feed), vec!["1", "3"]);
    }

    #[test]
    fn accept_unknown_id_is_false() {
        let mut feed = sample();
        assert!(!feed.apply_response("nope", RespondAction::Accept, t0()));
    }

    // ========================================================================
    // Views over the list
    // ========================================================================

    #[test]
    fn requests_are_split_from_grouping() {
        let feed = sample();
        assert_eq!(feed.pending_requests().len(), 1);
        assert_eq!(feed.others().len(), 2);

        let now = t0().with_timezone(&chrono::FixedOffset::east_opt(0).unwrap());
        let g = feed.grouped(&now);
        assert_eq!(g.total(), 2);
        assert_eq!(g.get(Bucket::Today)[0].id, "1");
        assert_eq!(g.get(Bucket::ThisWeek)[0].id, "3");
    }

    #[test]
    fn requests_blurb() {
        let mut feed = sample();
        assert_eq!(feed.requests_blurb().as_deref(), Some("user2"));

        feed.merge_incoming(record("5", NotificationKind::FollowRequest, t0()));
        feed.merge_incoming(record("6", NotificationKind::FollowRequest, t0()));
        assert_eq!(feed.requests_blurb().as_deref(), Some("user6 and 2 others"));

        let empty = NotificationFeed::new();
        assert!(empty.requests_blurb().is_none());
    }
}
