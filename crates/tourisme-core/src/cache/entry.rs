use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::utils::format_age;

/// A stored collection plus its expiry. Never mutated after creation;
/// a refresh installs a new entry.
#[derive(Debug)]
pub struct CacheEntry<T> {
    items: Arc<Vec<T>>,
    stored_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl<T> CacheEntry<T> {
    /// Create an entry stored at `now`. `ttl = None` never expires, and so
    /// does a TTL reaching past the last representable instant.
    pub fn new(items: Arc<Vec<T>>, now: DateTime<Utc>, ttl: Option<Duration>) -> Self {
        Self {
            items,
            stored_at: now,
            expires_at: ttl.and_then(|ttl| now.checked_add_signed(ttl)),
        }
    }

    pub fn items(&self) -> &Arc<Vec<T>> {
        &self.items
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Fresh strictly before the expiry instant.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expiry| now < expiry)
    }

    pub fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.stored_at).num_minutes()
    }

    pub fn age_display(&self, now: DateTime<Utc>) -> String {
        format_age(self.age_minutes(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_expires_at_ttl_boundary() {
        let now = Utc::now();
        let entry = CacheEntry::new(Arc::new(vec![1]), now, Some(Duration::minutes(5)));

        assert!(entry.is_fresh(now));
        assert!(entry.is_fresh(now + Duration::minutes(5) - Duration::milliseconds(1)));
        assert!(!entry.is_fresh(now + Duration::minutes(5)));
    }

    #[test]
    fn test_entry_without_ttl_never_expires() {
        let now = Utc::now();
        let entry = CacheEntry::new(Arc::new(vec![1]), now, None);
        assert!(entry.is_fresh(now + Duration::days(365)));
        assert!(entry.expires_at().is_none());
    }

    #[test]
    fn test_entry_with_unrepresentable_expiry_never_expires() {
        let now = Utc::now();
        let ttl = Duration::seconds(i64::MAX / 1000);
        let entry = CacheEntry::new(Arc::new(vec![1]), now, Some(ttl));

        assert!(entry.expires_at().is_none());
        assert!(entry.is_fresh(now + Duration::days(365 * 1000)));
        assert_eq!(entry.age_display(now), "just now");
    }

    #[test]
    fn test_entry_age_display() {
        let now = Utc::now();
        let entry = CacheEntry::new(Arc::new(Vec::<i64>::new()), now, None);
        assert_eq!(entry.age_display(now), "just now");
        assert_eq!(entry.age_display(now + Duration::minutes(12)), "12m ago");
    }
}
