//! Grouping of time-stamped records into recency buckets.
//!
//! Boundaries are fixed offsets from local midnight: 1, 7 and 30 days.
//! "This Week" and "This Month" are sliding windows, not calendar weeks or
//! months.

use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::model::NotificationRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    Today,
    Yesterday,
    ThisWeek,
    ThisMonth,
    Earlier,
}

impl Bucket {
    /// Display order.
    pub const ALL: [Bucket; 5] = [
        Bucket::Today,
        Bucket::Yesterday,
        Bucket::ThisWeek,
        Bucket::ThisMonth,
        Bucket::Earlier,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Bucket::Today => "Today",
            Bucket::Yesterday => "Yesterday",
            Bucket::ThisWeek => "This Week",
            Bucket::ThisMonth => "This Month",
            Bucket::Earlier => "Earlier",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for NotificationRecord {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl<T: Timestamped> Timestamped for &T {
    fn timestamp(&self) -> DateTime<Utc> {
        (*self).timestamp()
    }
}

/// Bucket boundaries derived from one "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundaries {
    pub today: DateTime<Utc>,
    pub yesterday: DateTime<Utc>,
    pub week: DateTime<Utc>,
    pub month: DateTime<Utc>,
}

impl Boundaries {
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let today = local_midnight(now);
        Self {
            today,
            yesterday: today - Duration::days(1),
            week: today - Duration::days(7),
            month: today - Duration::days(30),
        }
    }

    /// First bucket whose boundary `at` falls at-or-after.
    pub fn classify(&self, at: DateTime<Utc>) -> Bucket {
        if at >= self.today {
            Bucket::Today
        } else if at >= self.yesterday {
            Bucket::Yesterday
        } else if at >= self.week {
            Bucket::ThisWeek
        } else if at >= self.month {
            Bucket::ThisMonth
        } else {
            Bucket::Earlier
        }
    }
}

/// Midnight of `now`'s calendar day in `now`'s own zone.
///
/// When midnight does not exist (a DST gap), the earliest instant of the
/// day after the gap is used.
fn local_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let tz = now.timezone();
    let date = now.date_naive();
    let mut probe = date.and_time(chrono::NaiveTime::MIN);
    for _ in 0..=24 {
        if let Some(dt) = tz.from_local_datetime(&probe).earliest() {
            return dt.with_timezone(&Utc);
        }
        probe += Duration::hours(1);
    }
    now.with_timezone(&Utc)
}

/// Records partitioned by bucket. Every bucket is present, possibly empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Grouped<T> {
    buckets: [Vec<T>; 5],
}

impl<T> Grouped<T> {
    fn empty() -> Self {
        Self {
            buckets: Default::default(),
        }
    }

    pub fn get(&self, bucket: Bucket) -> &[T] {
        &self.buckets[bucket.index()]
    }

    /// All buckets in display order, including empty ones.
    pub fn iter(&self) -> impl Iterator<Item = (Bucket, &[T])> {
        Bucket::ALL
            .into_iter()
            .map(move |b| (b, self.buckets[b.index()].as_slice()))
    }

    /// Buckets that have at least one record, in display order.
    pub fn non_empty(&self) -> impl Iterator<Item = (Bucket, &[T])> {
        self.iter().filter(|(_, items)| !items.is_empty())
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn into_buckets(self) -> [(Bucket, Vec<T>); 5] {
        let [a, b, c, d, e] = self.buckets;
        [
            (Bucket::Today, a),
            (Bucket::Yesterday, b),
            (Bucket::ThisWeek, c),
            (Bucket::ThisMonth, d),
            (Bucket::Earlier, e),
        ]
    }
}

/// Partition `items` by recency relative to `now`, preserving input order
/// within each bucket.
pub fn group_by_recency<T, I, Tz>(items: I, now: &DateTime<Tz>) -> Grouped<T>
where
    T: Timestamped,
    I: IntoIterator<Item = T>,
    Tz: TimeZone,
{
    let bounds = Boundaries::at(now);
    let mut grouped = Grouped::empty();
    for item in items {
        let bucket = bounds.classify(item.timestamp());
        grouped.buckets[bucket.index()].push(item);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(&'static str, DateTime<Utc>);

    impl Timestamped for Item {
        fn timestamp(&self) -> DateTime<Utc> {
            self.1
        }
    }

    fn now_plus8() -> DateTime<FixedOffset> {
        // 2026-10-14 15:20 at UTC+8; local midnight is 2026-10-13T16:00Z.
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 14, 15, 20, 0)
            .unwrap()
    }

    #[test]
    fn midnight_is_in_the_callers_zone() {
        let b = Boundaries::at(&now_plus8());
        assert_eq!(b.today, Utc.with_ymd_and_hms(2026, 10, 13, 16, 0, 0).unwrap());
        assert_eq!(b.yesterday, b.today - Duration::days(1));
        assert_eq!(b.week, b.today - Duration::days(7));
        assert_eq!(b.month, b.today - Duration::days(30));
    }

    #[test]
    fn boundary_cases() {
        let now = now_plus8();
        let today = Boundaries::at(&now).today;
        let items = vec![
            Item("today", today),
            Item("just-before-yesterday", today - Duration::days(1) - Duration::milliseconds(1)),
            Item("yesterday", today - Duration::days(1)),
            Item("eight-days", today - Duration::days(8)),
            Item("thirty-one-days", today - Duration::days(31)),
            Item("thirty-days", today - Duration::days(30)),
        ];

        let g = group_by_recency(items, &now);
        let names = |b: Bucket| g.get(b).iter().map(|i| i.0).collect::<Vec<_>>();

        assert_eq!(names(Bucket::Today), vec!["today"]);
        assert_eq!(names(Bucket::Yesterday), vec!["yesterday"]);
        assert_eq!(names(Bucket::ThisWeek), vec!["just-before-yesterday"]);
        assert_eq!(names(Bucket::ThisMonth), vec!["eight-days", "thirty-days"]);
        assert_eq!(names(Bucket::Earlier), vec!["thirty-one-days"]);
        assert_eq!(g.total(), 6);
    }

    #[test]
    fn future_timestamps_count_as_today() {
        let now = now_plus8();
        let later = now.with_timezone(&Utc) + Duration::hours(3);
        let g = group_by_recency(vec![Item("clock-skew", later)], &now);
        assert_eq!(g.get(Bucket::Today).len(), 1);
    }

    #[test]
    fn all_buckets_present_when_empty() {
        let g = group_by_recency(Vec::<Item>::new(), &now_plus8());
        let labels: Vec<&str> = g.iter().map(|(b, _)| b.label()).collect();
        assert_eq!(
            labels,
            vec!["Today", "Yesterday", "This Week", "This Month", "Earlier"]
        );
        assert_eq!(g.non_empty().count(), 0);
    }

    #[test]
    fn input_order_is_preserved_within_a_bucket() {
        let now = now_plus8();
        let today = Boundaries::at(&now).today;
        let items = vec![
            Item("b", today + Duration::hours(1)),
            Item("a", today + Duration::hours(5)),
            Item("c", today + Duration::hours(2)),
        ];
        let g = group_by_recency(items, &now);
        let order: Vec<&str> = g.get(Bucket::Today).iter().map(|i| i.0).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn groups_borrowed_records() {
        let now = now_plus8();
        let today = Boundaries::at(&now).today;
        let items = [Item("x", today - Duration::days(3))];
        let g = group_by_recency(items.iter(), &now);
        assert_eq!(g.get(Bucket::ThisWeek)[0].0, "x");
    }

    #[test]
    fn into_buckets_keeps_display_order() {
        let g = group_by_recency(Vec::<Item>::new(), &now_plus8());
        let order: Vec<Bucket> = g.into_buckets().into_iter().map(|(b, _)| b).collect();
        assert_eq!(order, Bucket::ALL.to_vec());
    }
}
