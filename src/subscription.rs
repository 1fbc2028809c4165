use std::sync::Mutex;

/// Idempotent, ordered set of subscribed topics. The lock protects only
/// the set; callers emit the `sub` frame after `insert` returns, so no
/// I/O ever happens with the mutex held.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    topics: Mutex<Vec<String>>,
}

impl SubscriptionRegistry {
    pub fn new() -> SubscriptionRegistry {
        SubscriptionRegistry::default()
    }

    /// Returns `true` if the topic was newly added and the caller should
    /// send a `sub` frame for it.
    pub fn insert(&self, topic: &str) -> bool {
        let mut topics = self.topics.lock().unwrap();
        if topics.iter().any(|t| t == topic) {
            return false;
        }
        topics.push(topic.to_string());
        true
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.lock().unwrap().iter().any(|t| t == topic)
    }

    /// Cleared on every disconnect so a reconnected socket re-subscribes.
    pub fn reset(&self) {
        self.topics.lock().unwrap().clear();
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.topics.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let registry = SubscriptionRegistry::new();
        assert!(registry.insert("abc"));
        assert!(!registry.insert("abc"));
        assert_eq!(registry.snapshot(), vec!["abc".to_string()]);
    }

    #[test]
    fn test_insert_keeps_order() {
        let registry = SubscriptionRegistry::new();
        registry.insert("a");
        registry.insert("b");
        registry.insert("a");
        assert_eq!(registry.snapshot(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_reset_allows_resubscription() {
        let registry = SubscriptionRegistry::new();
        registry.insert("abc");
        registry.reset();
        assert!(!registry.contains("abc"));
        assert!(registry.insert("abc"));
    }
}
