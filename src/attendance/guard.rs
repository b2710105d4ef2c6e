use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::attendance::reconcile::SessionKey;

/// Sessions currently being saved. At most one save per natural key runs at
/// a time; later submissions for the same key are refused until it ends.
#[derive(Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<SessionKey>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<SessionKey>> {
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim `key`, or `None` while another save for it is outstanding.
    pub fn try_begin(&self, key: SessionKey) -> Option<SaveGuard> {
        if !self.lock().insert(key) {
            return None;
        }
        Some(SaveGuard {
            keys: self.clone(),
            key,
        })
    }

    pub fn is_saving(&self, key: &SessionKey) -> bool {
        self.lock().contains(key)
    }
}

/// Releases its key when dropped.
pub struct SaveGuard {
    keys: InFlight,
    key: SessionKey,
}

impl SaveGuard {
    pub fn key(&self) -> SessionKey {
        self.key
    }
}

impl Drop for SaveGuard {
    fn drop(&mut self) {
        self.keys.lock().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn key(class_id: i64, day: u32) -> SessionKey {
        SessionKey::new(class_id, NaiveDate::from_ymd_opt(2024, 3, day).unwrap())
    }

    #[test]
    fn second_claim_for_same_key_is_refused() {
        let saving = InFlight::new();
        let guard = saving.try_begin(key(12, 1)).unwrap();
        assert!(saving.try_begin(key(12, 1)).is_none());
        assert!(saving.is_saving(&guard.key()));
    }

    #[test]
    fn other_keys_are_independent() {
        let saving = InFlight::new();
        let _a = saving.try_begin(key(12, 1)).unwrap();
        assert!(saving.try_begin(key(12, 2)).is_some());
        assert!(saving.try_begin(key(13, 1)).is_some());
    }

    #[test]
    fn dropping_guard_releases_key() {
        let saving = InFlight::new();
        drop(saving.try_begin(key(12, 1)).unwrap());
        assert!(!saving.is_saving(&key(12, 1)));
        assert!(saving.try_begin(key(12, 1)).is_some());
    }

    #[tokio::test]
    async fn guard_released_when_task_panics() {
        let saving = InFlight::new();
        let guard = saving.try_begin(key(12, 1)).unwrap();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            panic!("save blew up");
        });
        assert!(handle.await.is_err());
        assert!(!saving.is_saving(&key(12, 1)));
    }
}
