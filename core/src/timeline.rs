use web_time::{Duration, Instant};

/// Pending delayed effects, drained in due order.
///
/// Clearing the timeline is how a round cancels everything it scheduled.
#[derive(Clone, Debug)]
pub struct Timeline<T> {
    entries: Vec<(Instant, T)>,
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> Timeline<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: Instant, item: T) {
        self.entries.push((at, item));
    }

    pub fn schedule_after(&mut self, now: Instant, delay: Duration, item: T) {
        self.schedule(now + delay, item);
    }

    /// Removes and returns every entry due at `now`, earliest first; entries
    /// due at the same instant keep their scheduling order.
    pub fn due(&mut self, now: Instant) -> Vec<T> {
        let (mut ready, pending): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|(at, _)| *at <= now);
        self.entries = pending;
        ready.sort_by_key(|(at, _)| *at);
        ready.into_iter().map(|(_, item)| item).collect()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.entries.iter().map(|(at, _)| *at).min()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
