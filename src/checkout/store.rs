use std::collections::HashMap;
use tokio::sync::Mutex;

/// In-memory per-user state keyed by Telegram id.
///
/// Nothing is persisted: a restart drops every entry.
#[derive(Debug)]
pub struct DraftStore<T> {
    entries: Mutex<HashMap<i64, T>>,
}

impl<T> Default for DraftStore<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> DraftStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user: i64) -> Option<T> {
        self.entries.lock().await.get(&user).cloned()
    }

    /// Stores the state, replacing whatever the user had
    pub async fn put(&self, user: i64, value: T) {
        self.entries.lock().await.insert(user, value);
    }

    /// Returns true if there was something to discard
    pub async fn discard(&self, user: i64) -> bool {
        self.entries.lock().await.remove(&user).is_some()
    }

    pub async fn contains(&self, user: i64) -> bool {
        self.entries.lock().await.contains_key(&user)
    }
}
