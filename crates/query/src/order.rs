use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::hotness::hotness;

/// Default page size when the caller does not ask for one.
pub const DEFAULT_COUNT: i64 = 20;
/// Largest page a caller may request.
pub const MAX_COUNT: i64 = 100;

/// Orderings served by the list endpoints. Search results are ordered like
/// [`ListOrder::Top`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListOrder {
    /// Creation time descending.
    #[default]
    New,
    /// Signed vote total of the latest revision, descending.
    Top,
    /// Time-decayed hotness, descending.
    Popular,
}

impl ListOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListOrder::New => "new",
            ListOrder::Top => "top",
            ListOrder::Popular => "popular",
        }
    }
}

impl fmt::Display for ListOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown list order: {0}")]
pub struct UnknownOrder(pub String);

impl FromStr for ListOrder {
    type Err = UnknownOrder;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "new" => Ok(ListOrder::New),
            "top" => Ok(ListOrder::Top),
            "popular" | "hot" => Ok(ListOrder::Popular),
            other => Err(UnknownOrder(other.to_string())),
        }
    }
}

/// Offset/count window over an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: i64,
    pub count: i64,
}

impl Page {
    /// Clamp caller-supplied values: negative offsets become 0 and the count
    /// is forced into `[1, MAX_COUNT]`, defaulting to [`DEFAULT_COUNT`].
    pub fn new(offset: Option<i64>, count: Option<i64>) -> Self {
        Self {
            offset: offset.unwrap_or(0).max(0),
            count: count.unwrap_or(DEFAULT_COUNT).clamp(1, MAX_COUNT),
        }
    }

    /// Apply the window to an already ordered slice.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.offset as usize).min(items.len());
        let end = start.saturating_add(self.count as usize).min(items.len());
        &items[start..end]
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// The fields every ordering needs from a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankKey {
    pub id: i64,
    /// Creation time in Unix microseconds. Entries created within the same
    /// second still differ in both `New` and `Popular` order.
    pub created_at_micros: i64,
    /// Signed vote total (`up - down`) of the latest revision.
    pub score: i64,
}

impl RankKey {
    pub fn hotness(&self) -> f64 {
        hotness(self.score, self.created_at_micros as f64 / 1_000_000.0)
    }
}

/// Total order for `order`: the primary criterion descending, then id descending.
pub fn compare(order: ListOrder, a: &RankKey, b: &RankKey) -> Ordering {
    let primary = match order {
        ListOrder::New => b.created_at_micros.cmp(&a.created_at_micros),
        ListOrder::Top => b.score.cmp(&a.score),
        ListOrder::Popular => b.hotness().total_cmp(&a.hotness()),
    };
    primary.then_with(|| b.id.cmp(&a.id))
}

/// Sort `items` in place by `order`, using `key` to project each item.
pub fn sort_by_order<T, F>(order: ListOrder, items: &mut [T], key: F)
where
    F: Fn(&T) -> RankKey,
{
    items.sort_by(|a, b| compare(order, &key(a), &key(b)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: i64, created: i64, score: i64) -> RankKey {
        RankKey {
            id,
            created_at_micros: created * 1_000_000,
            score,
        }
    }

    fn ids(order: ListOrder, mut keys: Vec<RankKey>) -> Vec<i64> {
        sort_by_order(order, &mut keys, |k| *k);
        keys.into_iter().map(|k| k.id).collect()
    }

    #[test]
    fn parse_orders() {
        assert_eq!("new".parse::<ListOrder>().unwrap(), ListOrder::New);
        assert_eq!("TOP".parse::<ListOrder>().unwrap(), ListOrder::Top);
        assert_eq!("popular".parse::<ListOrder>().unwrap(), ListOrder::Popular);
        assert_eq!("hot".parse::<ListOrder>().unwrap(), ListOrder::Popular);
        assert!("random".parse::<ListOrder>().is_err());
    }

    #[test]
    fn page_clamps_count_and_offset() {
        assert_eq!(Page::new(None, None), Page { offset: 0, count: 20 });
        assert_eq!(Page::new(Some(-5), Some(0)), Page { offset: 0, count: 1 });
        assert_eq!(Page::new(Some(40), Some(1000)), Page { offset: 40, count: 100 });
    }

    #[test]
    fn page_slices_within_bounds() {
        let items: Vec<i32> = (0..10).collect();
        assert_eq!(Page::new(Some(8), Some(5)).slice(&items), &[8, 9]);
        assert!(Page::new(Some(20), Some(5)).slice(&items).is_empty());
    }

    #[test]
    fn new_orders_by_time_then_id() {
        let keys = vec![key(1, 100, 0), key(2, 300, 0), key(3, 300, 0), key(4, 200, 0)];
        assert_eq!(ids(ListOrder::New, keys), vec![3, 2, 4, 1]);
    }

    #[test]
    fn top_orders_by_score_then_id() {
        let keys = vec![key(1, 0, 5), key(2, 0, -3), key(3, 0, 5), key(4, 0, 9)];
        assert_eq!(ids(ListOrder::Top, keys), vec![4, 3, 1, 2]);
    }

    #[test]
    fn popular_prefers_recent_entries() {
        let day = 86_400;
        let now = 1_700_000_000;
        let keys = vec![key(1, now - 3 * day, 50), key(2, now, 2)];
        assert_eq!(ids(ListOrder::Popular, keys), vec![2, 1]);
    }

    #[test]
    fn popular_uses_sub_second_creation_time() {
        let now = 1_700_000_000 * 1_000_000;
        let older = RankKey { id: 2, created_at_micros: now, score: 3 };
        let newer = RankKey { id: 1, created_at_micros: now + 400_000, score: 3 };
        assert_eq!(ids(ListOrder::Popular, vec![older, newer]), vec![1, 2]);
    }
}
