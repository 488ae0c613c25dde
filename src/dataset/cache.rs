use std::time::{Duration, Instant};

/// Single-slot cache whose value expires `ttl` after it was stored.
#[derive(Debug)]
pub struct TtlCache<T> {
    ttl: Duration,
    slot: Option<(Instant, T)>,
}

impl<T> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, slot: None }
    }

    pub fn get(&self) -> Option<&T> {
        self.get_at(Instant::now())
    }

    fn get_at(&self, now: Instant) -> Option<&T> {
        match &self.slot {
            Some((stored, value)) if now.duration_since(*stored) < self.ttl => Some(value),
            _ => None,
        }
    }

    pub fn put(&mut self, value: T) {
        self.slot = Some((Instant::now(), value));
    }

    pub fn invalidate(&mut self) {
        if self.slot.take().is_some() {
            tracing::debug!("Baseline cache invalidated");
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_expires_after_ttl() {
        let mut cache = TtlCache::new(Duration::from_secs(1));
        assert!(cache.get().is_none());

        cache.put(3);
        let stored = cache.slot.as_ref().unwrap().0;
        assert_eq!(cache.get_at(stored + Duration::from_millis(999)), Some(&3));
        assert_eq!(cache.get_at(stored + Duration::from_secs(1)), None);
    }

    #[test]
    fn invalidate_clears_immediately() {
        let mut cache = TtlCache::new(Duration::from_secs(60));
        cache.put("rows");
        assert!(cache.is_fresh());
        cache.invalidate();
        assert!(!cache.is_fresh());
    }
}
