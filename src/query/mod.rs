//! Key-addressed cache for note list results.
//!
//! Each key holds at most one settled result. Requests are handed out as
//! [`Ticket`]s carrying a generation; a completion is stored only when its
//! generation is still the one the entry is waiting for. Invalidation marks
//! matching entries stale and forgets their outstanding generation, so a
//! response issued before a mutation can never land after it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::CacheOptions;
use crate::model::{ListParams, NotePage};

pub const NOTES_RESOURCE: &str = "notes";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub resource: &'static str,
    pub page: u32,
    pub per_page: u32,
    pub search: String,
}

impl QueryKey {
    pub fn notes(params: &ListParams) -> Self {
        Self {
            resource: NOTES_RESOURCE,
            page: params.page.max(1),
            per_page: params.per_page,
            search: params.search.clone(),
        }
    }

    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.per_page, self.search.clone())
    }
}

/// Leading components of a [`QueryKey`], matched in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPrefix {
    Resource(&'static str),
    Page { resource: &'static str, page: u32 },
    Exact(QueryKey),
}

impl KeyPrefix {
    pub fn notes() -> Self {
        KeyPrefix::Resource(NOTES_RESOURCE)
    }

    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            KeyPrefix::Resource(resource) => key.resource == *resource,
            KeyPrefix::Page { resource, page } => key.resource == *resource && key.page == *page,
            KeyPrefix::Exact(exact) => exact == key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub key: QueryKey,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryView<'a> {
    Loading,
    Failed(&'a str),
    Ready { page: &'a NotePage, refreshing: bool },
}

#[derive(Debug, Clone)]
enum Snapshot {
    Ready(NotePage),
    Failed(String),
}

#[derive(Debug, Clone, Default)]
struct Entry {
    snapshot: Option<Snapshot>,
    in_flight: Option<u64>,
    stale: bool,
    settled_at: Option<Instant>,
}

impl Entry {
    fn is_fresh(&self, now: Instant, max_age: Duration) -> bool {
        let Some(Snapshot::Ready(_)) = self.snapshot else {
            return false;
        };
        if self.stale {
            return false;
        }
        self.settled_at
            .map(|at| now.saturating_duration_since(at) < max_age)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    pub max_age: Duration,
    pub max_entries: usize,
}

impl From<&CacheOptions> for CachePolicy {
    fn from(options: &CacheOptions) -> Self {
        Self {
            max_age: options.max_age(),
            max_entries: options.max_entries.max(1),
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::from(&CacheOptions::default())
    }
}

#[derive(Debug)]
pub struct QueryCache {
    policy: CachePolicy,
    entries: HashMap<QueryKey, Entry>,
    next_generation: u64,
}

impl QueryCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: HashMap::new(),
            next_generation: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a ticket when `key` needs a request: no fresh result and nothing in flight.
    pub fn ensure(&mut self, key: &QueryKey, now: Instant) -> Option<Ticket> {
        let max_age = self.policy.max_age;
        let generation = self.next_generation;
        let entry = self.entries.entry(key.clone()).or_default();
        if entry.in_flight.is_some() || entry.is_fresh(now, max_age) {
            return None;
        }
        entry.in_flight = Some(generation);
        self.next_generation += 1;
        tracing::debug!(?key, generation, "issuing list request");
        self.evict(key);
        Some(Ticket {
            key: key.clone(),
            generation,
        })
    }

    /// Stores a response. Returns `false` when the ticket was superseded and the result dropped.
    pub fn complete(
        &mut self,
        ticket: &Ticket,
        result: Result<NotePage, String>,
        now: Instant,
    ) -> bool {
        let Some(entry) = self.entries.get_mut(&ticket.key) else {
            tracing::debug!(key = ?ticket.key, "dropping response for evicted key");
            return false;
        };
        if entry.in_flight != Some(ticket.generation) {
            tracing::debug!(
                key = ?ticket.key,
                generation = ticket.generation,
                "dropping superseded response"
            );
            return false;
        }
        entry.in_flight = None;
        entry.stale = false;
        entry.settled_at = Some(now);
        entry.snapshot = Some(match result {
            Ok(page) => Snapshot::Ready(page),
            Err(message) => Snapshot::Failed(message),
        });
        true
    }

    /// Marks every entry under `prefix` stale. Returns how many entries matched.
    pub fn invalidate(&mut self, prefix: &KeyPrefix) -> usize {
        let mut count = 0;
        for (key, entry) in self.entries.iter_mut() {
            if !prefix.matches(key) {
                continue;
            }
            entry.stale = true;
            entry.in_flight = None;
            count += 1;
        }
        tracing::debug!(?prefix, count, "invalidated cache entries");
        count
    }

    pub fn view(&self, key: &QueryKey) -> QueryView<'_> {
        let Some(entry) = self.entries.get(key) else {
            return QueryView::Loading;
        };
        match &entry.snapshot {
            Some(Snapshot::Ready(page)) => QueryView::Ready {
                page,
                refreshing: entry.in_flight.is_some(),
            },
            Some(Snapshot::Failed(message)) if entry.in_flight.is_none() => {
                QueryView::Failed(message)
            }
            _ => QueryView::Loading,
        }
    }

    pub fn is_in_flight(&self, key: &QueryKey) -> bool {
        self.entries
            .get(key)
            .map(|entry| entry.in_flight.is_some())
            .unwrap_or(false)
    }

    fn evict(&mut self, keep: &QueryKey) {
        while self.entries.len() > self.policy.max_entries {
            let victim = self
                .entries
                .iter()
                .filter(|(key, entry)| *key != keep && entry.in_flight.is_none())
                .min_by_key(|(_, entry)| entry.settled_at)
                .map(|(key, _)| key.clone());
            match victim {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Note, NoteTag};
    use assert_matches::assert_matches;

    fn key(page: u32, search: &str) -> QueryKey {
        QueryKey::notes(&ListParams::new(page, 12, search))
    }

    fn page_with(titles: &[&str], total_pages: u32) -> NotePage {
        NotePage {
            notes: titles
                .iter()
                .enumerate()
                .map(|(i, title)| Note {
                    id: format!("n{i}"),
                    title: title.to_string(),
                    content: String::new(),
                    tag: NoteTag::Todo,
                    created_at: None,
                    updated_at: None,
                })
                .collect(),
            total_pages,
        }
    }

    #[test]
    fn fresh_result_is_not_refetched() {
        let now = Instant::now();
        let mut cache = QueryCache::default();
        let k = key(1, "");

        let ticket = cache.ensure(&k, now).expect("first request");
        assert_eq!(cache.ensure(&k, now), None, "in-flight request is shared");
        assert!(cache.complete(&ticket, Ok(page_with(&["a"], 1)), now));
        assert_eq!(cache.ensure(&k, now), None);
        assert_matches!(cache.view(&k), QueryView::Ready { refreshing: false, .. });
    }

    #[test]
    fn late_response_for_older_key_never_reaches_newer_view() {
        let now = Instant::now();
        let mut cache = QueryCache::default();
        let k1 = key(1, "meet");
        let k2 = key(1, "meeting");

        let t1 = cache.ensure(&k1, now).expect("k1 request");
        let t2 = cache.ensure(&k2, now).expect("k2 request");

        assert!(cache.complete(&t2, Ok(page_with(&["Meeting notes"], 1)), now));
        cache.complete(&t1, Ok(page_with(&["Meetup"], 1)), now);

        match cache.view(&k2) {
            QueryView::Ready { page, .. } => assert_eq!(page.notes[0].title, "Meeting notes"),
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[test]
    fn invalidation_discards_in_flight_and_forces_refetch() {
        let now = Instant::now();
        let mut cache = QueryCache::default();
        let k = key(1, "");

        let before = cache.ensure(&k, now).expect("request");
        assert_eq!(cache.invalidate(&KeyPrefix::notes()), 1);
        assert!(!cache.complete(&before, Ok(page_with(&["old"], 1)), now));

        let after = cache.ensure(&k, now).expect("refetch after invalidation");
        assert!(after.generation > before.generation);
        assert!(cache.complete(&after, Ok(page_with(&["old", "new"], 1)), now));
        match cache.view(&k) {
            QueryView::Ready { page, .. } => assert_eq!(page.notes.len(), 2),
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[test]
    fn stale_entry_keeps_showing_data_while_refreshing() {
        let now = Instant::now();
        let mut cache = QueryCache::default();
        let k = key(2, "");
        let t = cache.ensure(&k, now).expect("request");
        cache.complete(&t, Ok(page_with(&["a"], 2)), now);

        cache.invalidate(&KeyPrefix::Page {
            resource: NOTES_RESOURCE,
            page: 2,
        });
        cache.ensure(&k, now).expect("refetch");
        assert_matches!(cache.view(&k), QueryView::Ready { refreshing: true, .. });
    }

    #[test]
    fn prefix_matching_respects_components() {
        let k = key(3, "work");
        assert!(KeyPrefix::notes().matches(&k));
        assert!(KeyPrefix::Page {
            resource: NOTES_RESOURCE,
            page: 3
        }
        .matches(&k));
        assert!(!KeyPrefix::Page {
            resource: NOTES_RESOURCE,
            page: 1
        }
        .matches(&k));
        assert!(!KeyPrefix::Resource("tags").matches(&k));
        assert!(KeyPrefix::Exact(k.clone()).matches(&k));
    }

    #[test]
    fn failures_surface_and_are_retried_on_next_ensure() {
        let now = Instant::now();
        let mut cache = QueryCache::default();
        let k = key(1, "");
        let t = cache.ensure(&k, now).expect("request");
        cache.complete(&t, Err("HTTP 500: boom".into()), now);
        assert_eq!(cache.view(&k), QueryView::Failed("HTTP 500: boom"));

        cache.ensure(&k, now).expect("retry request");
        assert_eq!(cache.view(&k), QueryView::Loading);
    }

    #[test]
    fn old_results_expire() {
        let now = Instant::now();
        let mut cache = QueryCache::new(CachePolicy {
            max_age: Duration::from_secs(60),
            max_entries: 8,
        });
        let k = key(1, "");
        let t = cache.ensure(&k, now).expect("request");
        cache.complete(&t, Ok(page_with(&[], 0)), now);
        assert_eq!(cache.ensure(&k, now + Duration::from_secs(59)), None);
        assert!(cache.ensure(&k, now + Duration::from_secs(61)).is_some());
    }

    #[test]
    fn eviction_spares_current_and_in_flight_keys() {
        let now = Instant::now();
        let mut cache = QueryCache::new(CachePolicy {
            max_age: Duration::from_secs(60),
            max_entries: 2,
        });
        let oldest = key(1, "");
        let t = cache.ensure(&oldest, now).expect("request");
        cache.complete(&t, Ok(page_with(&["a"], 3)), now);

        let pending = key(2, "");
        cache.ensure(&pending, now).expect("request");

        let newest = key(3, "");
        cache.ensure(&newest, now + Duration::from_secs(1)).expect("request");

        assert_eq!(cache.len(), 2);
        assert!(cache.is_in_flight(&pending));
        assert!(cache.is_in_flight(&newest));
        assert_eq!(cache.view(&oldest), QueryView::Loading);
    }
}
