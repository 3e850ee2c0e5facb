use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

type DepthKey = (String, String);

#[derive(Debug)]
struct DepthEntry {
    count: u32,
    last_seen: Instant,
}

/// Per-agent minimum trigger spacing. Owned by the runner's consume loop,
/// so no locking. A trigger at exactly `last + cooldown` is admitted; one
/// instant earlier is dropped. The stamp refreshes only on admission.
#[derive(Debug)]
pub(crate) struct CooldownGate {
    cooldown: Duration,
    last_trigger: HashMap<String, Instant>,
}

impl CooldownGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_trigger: HashMap::new(),
        }
    }

    pub fn admit(&mut self, agent_id: &str) -> bool {
        self.admit_at(agent_id, Instant::now())
    }

    pub fn admit_at(&mut self, agent_id: &str, now: Instant) -> bool {
        if let Some(last) = self.last_trigger.get(agent_id) {
            if now.duration_since(*last) < self.cooldown {
                return false;
            }
        }
        self.last_trigger.insert(agent_id.to_string(), now);
        true
    }
}

/// Cascade depth accounting, shared between the consume loop (silent
/// pre-spawn check) and the per-trigger tasks (re-check and increment under
/// the lock, decrement via [`DepthGuard`] on drop).
#[derive(Clone)]
pub(crate) struct DepthTracker {
    max_depth: u32,
    map: Arc<Mutex<HashMap<DepthKey, DepthEntry>>>,
}

impl DepthTracker {
    pub fn new(max_depth: u32) -> Self {
        Self {
            max_depth,
            map: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Lock-free-of-side-effects check used before spawning a task.
    pub fn available(&self, agent_id: &str, correlation_id: &str) -> bool {
        let map = self.map.lock().unwrap();
        map.get(&(agent_id.to_string(), correlation_id.to_string()))
            .map(|entry| entry.count < self.max_depth)
            .unwrap_or(self.max_depth > 0)
    }

    /// Atomically re-check and enter; `None` means the limit was hit between
    /// the pre-spawn check and now.
    pub fn try_enter(&self, agent_id: &str, correlation_id: &str) -> Option<DepthGuard> {
        let key = (agent_id.to_string(), correlation_id.to_string());
        let mut map = self.map.lock().unwrap();

        let count = map.get(&key).map(|entry| entry.count).unwrap_or(0);
        if count >= self.max_depth {
            return None;
        }

        map.insert(
            key.clone(),
            DepthEntry {
                count: count + 1,
                last_seen: Instant::now(),
            },
        );

        Some(DepthGuard {
            map: Arc::clone(&self.map),
            key,
        })
    }

    /// Drop entries idle for longer than `ttl`; abandoned correlations must
    /// not pin memory forever.
    pub fn sweep_stale(&self, ttl: Duration) {
        let now = Instant::now();
        let mut map = self.map.lock().unwrap();
        map.retain(|_, entry| now.duration_since(entry.last_seen) <= ttl);
    }

    #[cfg(test)]
    pub fn depth_of(&self, agent_id: &str, correlation_id: &str) -> u32 {
        let map = self.map.lock().unwrap();
        map.get(&(agent_id.to_string(), correlation_id.to_string()))
            .map(|entry| entry.count)
            .unwrap_or(0)
    }

    #[cfg(test)]
    pub fn force(&self, agent_id: &str, correlation_id: &str, count: u32) {
        let mut map = self.map.lock().unwrap();
        map.insert(
            (agent_id.to_string(), correlation_id.to_string()),
            DepthEntry {
                count,
                last_seen: Instant::now(),
            },
        );
    }
}

/// Releases one unit of cascade depth on drop; the entry disappears when the
/// count reaches zero.
pub(crate) struct DepthGuard {
    map: Arc<Mutex<HashMap<DepthKey, DepthEntry>>>,
    key: DepthKey,
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        let mut map = self.map.lock().unwrap();
        if let Some(entry) = map.get_mut(&self.key) {
            entry.count = entry.count.saturating_sub(1);
            if entry.count == 0 {
                map.remove(&self.key);
            } else {
                entry.last_seen = Instant::now();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_exact_boundary() {
        let cooldown = Duration::from_millis(1000);
        let mut gate = CooldownGate::new(cooldown);
        let start = Instant::now();

        assert!(gate.admit_at("agent-a", start));
        // One unit before the boundary: dropped
        assert!(!gate.admit_at("agent-a", start + cooldown - Duration::from_millis(1)));
        // Exactly at the boundary: admitted
        assert!(gate.admit_at("agent-a", start + cooldown));
    }

    #[test]
    fn test_cooldown_stamp_refreshes_only_on_admission() {
        let cooldown = Duration::from_millis(1000);
        let mut gate = CooldownGate::new(cooldown);
        let start = Instant::now();

        assert!(gate.admit_at("agent-a", start));
        assert!(!gate.admit_at("agent-a", start + Duration::from_millis(500)));
        // The dropped trigger did not push the window forward
        assert!(gate.admit_at("agent-a", start + cooldown));
    }

    #[test]
    fn test_cooldown_is_per_agent() {
        let mut gate = CooldownGate::new(Duration::from_millis(1000));
        let start = Instant::now();

        assert!(gate.admit_at("agent-a", start));
        assert!(gate.admit_at("agent-b", start));
    }

    #[test]
    fn test_zero_cooldown_always_admits() {
        let mut gate = CooldownGate::new(Duration::ZERO);
        let start = Instant::now();
        assert!(gate.admit_at("agent-a", start));
        assert!(gate.admit_at("agent-a", start));
    }

    #[test]
    fn test_depth_exact_boundary() {
        let tracker = DepthTracker::new(3);

        let g1 = tracker.try_enter("a", "c").unwrap();
        let g2 = tracker.try_enter("a", "c").unwrap();
        let g3 = tracker.try_enter("a", "c").unwrap();
        assert_eq!(tracker.depth_of("a", "c"), 3);

        // The fourth concurrent entry is refused
        assert!(tracker.try_enter("a", "c").is_none());
        assert!(!tracker.available("a", "c"));

        drop(g1);
        assert_eq!(tracker.depth_of("a", "c"), 2);
        assert!(tracker.available("a", "c"));
        let _g4 = tracker.try_enter("a", "c").unwrap();

        drop(g2);
        drop(g3);
    }

    #[test]
    fn test_depth_entry_removed_at_zero() {
        let tracker = DepthTracker::new(3);
        let guard = tracker.try_enter("a", "c").unwrap();
        drop(guard);
        assert_eq!(tracker.depth_of("a", "c"), 0);
        // Fully drained pairs leave no residue behind
        assert!(tracker.map.lock().unwrap().is_empty());
    }

    #[test]
    fn test_depth_is_per_correlation() {
        let tracker = DepthTracker::new(1);
        let _g1 = tracker.try_enter("a", "c1").unwrap();
        assert!(tracker.try_enter("a", "c1").is_none());
        let _g2 = tracker.try_enter("a", "c2").unwrap();
        let _g3 = tracker.try_enter("b", "c1").unwrap();
    }

    #[test]
    fn test_prepopulated_depth_blocks_silently() {
        // A map already at the limit refuses entry outright
        let tracker = DepthTracker::new(3);
        tracker.force("a", "c", 3);
        assert!(!tracker.available("a", "c"));
        assert!(tracker.try_enter("a", "c").is_none());
    }

    #[test]
    fn test_sweep_removes_only_stale_entries() {
        let tracker = DepthTracker::new(5);
        tracker.force("a", "old", 2);
        tracker.force("a", "fresh", 1);

        // Nothing is older than an hour
        tracker.sweep_stale(Duration::from_secs(3600));
        assert_eq!(tracker.depth_of("a", "old"), 2);

        // Everything is older than zero once the clock has moved
        std::thread::sleep(Duration::from_millis(2));
        tracker.sweep_stale(Duration::ZERO);
        assert_eq!(tracker.depth_of("a", "old"), 0);
        assert_eq!(tracker.depth_of("a", "fresh"), 0);
    }

    #[test]
    fn test_zero_max_depth_admits_nothing() {
        let tracker = DepthTracker::new(0);
        assert!(!tracker.available("a", "c"));
        assert!(tracker.try_enter("a", "c").is_none());
    }
}
