use {
    dashmap::DashMap,
    serde_json::Value,
    std::sync::{
        Arc,
        Mutex,
    },
    tokio::sync::watch,
};

/// How many times a transaction is re-run against freshly committed state
/// before the store gives up and reports the path as unavailable.
const MAX_TRANSACTION_RETRIES: usize = 25;

#[derive(Clone, Debug, PartialEq, Eq, strum::Display)]
pub enum StoreError {
    /// Transient failure, the caller may retry the whole operation.
    Unavailable,
    /// The caller is not allowed to touch this path. Fatal, do not retry.
    PermissionDenied,
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable)
    }
}

/// Stand-in for the backend's security rules: only well-formed relative key
/// paths are accessible. Everything else is refused as a permission error.
fn check_path(path: &str) -> Result<(), StoreError> {
    if path.is_empty() || path.starts_with('/') || path.ends_with('/') || path.contains("//") {
        return Err(StoreError::PermissionDenied);
    }
    Ok(())
}

/// What a transaction transform wants the store to do with the path.
pub enum TransactionDecision {
    Commit(Value),
    Abort,
}

pub struct TransactionOutcome {
    pub committed: bool,
    /// The committed value, or on abort the value the transform last saw.
    pub value:     Option<Value>,
}

struct VersionedValue {
    version: u64,
    value:   Option<Value>,
}

struct PathEntry {
    slot:  Mutex<VersionedValue>,
    watch: watch::Sender<Option<Value>>,
}

impl PathEntry {
    fn new() -> Self {
        let (watch, _) = watch::channel(None);
        Self {
            slot: Mutex::new(VersionedValue {
                version: 0,
                value:   None,
            }),
            watch,
        }
    }
}

/// In-process key-path document store with the contract the auction core is
/// written against: last-write-wins `write`, read-modify-write
/// `atomic_update` that detects conflicting commits and re-runs the
/// transform, and per-path subscriptions delivering committed values in
/// commit order. A different backend can replace this as long as it keeps
/// those semantics.
#[derive(Clone, Default)]
pub struct DocumentStore {
    paths: Arc<DashMap<String, Arc<PathEntry>>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, path: &str) -> Arc<PathEntry> {
        self.paths
            .entry(path.to_string())
            .or_insert_with(|| Arc::new(PathEntry::new()))
            .clone()
    }

    pub async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        check_path(path)?;
        let entry = self.entry(path);
        let slot = entry.slot.lock().map_err(|_| StoreError::Unavailable)?;
        Ok(slot.value.clone())
    }

    /// Last-write-wins set. Bumps the version so a racing transaction
    /// observes the conflict and re-runs.
    pub async fn write(&self, path: &str, value: Value) -> Result<(), StoreError> {
        check_path(path)?;
        let entry = self.entry(path);
        let mut slot = entry.slot.lock().map_err(|_| StoreError::Unavailable)?;
        slot.version += 1;
        slot.value = Some(value.clone());
        // Published while the slot lock is still held, so watch delivery
        // order is the commit order.
        entry.watch.send_replace(Some(value));
        Ok(())
    }

    pub async fn remove(&self, path: &str) -> Result<(), StoreError> {
        check_path(path)?;
        let entry = self.entry(path);
        let mut slot = entry.slot.lock().map_err(|_| StoreError::Unavailable)?;
        slot.version += 1;
        slot.value = None;
        entry.watch.send_replace(None);
        Ok(())
    }

    /// Optimistic read-modify-write. The transform runs against a snapshot
    /// of the path; the result commits only if no other writer committed in
    /// between, otherwise the transform is re-run with the fresh value. The
    /// transform therefore must be pure in everything except its inputs.
    pub async fn atomic_update<F>(
        &self,
        path: &str,
        mut transform: F,
    ) -> Result<TransactionOutcome, StoreError>
    where
        F: FnMut(Option<&Value>) -> TransactionDecision,
    {
        check_path(path)?;
        let entry = self.entry(path);
        for _ in 0..MAX_TRANSACTION_RETRIES {
            let (snapshot, version) = {
                let slot = entry.slot.lock().map_err(|_| StoreError::Unavailable)?;
                (slot.value.clone(), slot.version)
            };
            let decision = transform(snapshot.as_ref());
            let mut slot = entry.slot.lock().map_err(|_| StoreError::Unavailable)?;
            if slot.version != version {
                // A conflicting commit landed while the transform ran.
                continue;
            }
            return match decision {
                TransactionDecision::Commit(next) => {
                    slot.version += 1;
                    slot.value = Some(next.clone());
                    // Published while the slot lock is still held. Two racing
                    // committers that published after unlocking could reach
                    // the watch in the opposite order from the one the store
                    // serialized them in.
                    entry.watch.send_replace(Some(next.clone()));
                    Ok(TransactionOutcome {
                        committed: true,
                        value:     Some(next),
                    })
                }
                TransactionDecision::Abort => Ok(TransactionOutcome {
                    committed: false,
                    value:     snapshot,
                }),
            };
        }
        tracing::warn!(path, "Transaction retries exhausted");
        Err(StoreError::Unavailable)
    }

    /// Subscribe to a path. The first `next` resolves immediately with the
    /// current value; later ones resolve with committed changes in commit
    /// order. A slow consumer may observe coalesced updates, but every value
    /// it observes is one that was actually committed.
    pub async fn subscribe(&self, path: &str) -> Result<Subscription, StoreError> {
        check_path(path)?;
        let entry = self.entry(path);
        Ok(Subscription {
            receiver:          entry.watch.subscribe(),
            delivered_initial: false,
        })
    }
}

#[derive(Debug)]
pub struct Subscription {
    receiver:          watch::Receiver<Option<Value>>,
    delivered_initial: bool,
}

impl Subscription {
    /// Next committed value, or `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Option<Value>> {
        if !self.delivered_initial {
            self.delivered_initial = true;
            return Some(self.receiver.borrow_and_update().clone());
        }
        if self.receiver.changed().await.is_err() {
            return None;
        }
        Some(self.receiver.borrow_and_update().clone())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        futures::future::join_all,
        serde_json::json,
    };

    #[tokio::test]
    async fn atomic_update_commits_transform_result() {
        let store = DocumentStore::new();
        store.write("counters/a", json!(1)).await.unwrap();

        let outcome = store
            .atomic_update("counters/a", |current| {
                let value = current.and_then(Value::as_i64).unwrap_or(0);
                TransactionDecision::Commit(json!(value + 1))
            })
            .await
            .unwrap();

        assert!(outcome.committed);
        assert_eq!(outcome.value, Some(json!(2)));
        assert_eq!(store.read("counters/a").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn abort_leaves_value_unchanged() {
        let store = DocumentStore::new();
        store.write("counters/a", json!(7)).await.unwrap();

        let outcome = store
            .atomic_update("counters/a", |_| TransactionDecision::Abort)
            .await
            .unwrap();

        assert!(!outcome.committed);
        assert_eq!(outcome.value, Some(json!(7)));
        assert_eq!(store.read("counters/a").await.unwrap(), Some(json!(7)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn contended_updates_lose_no_increments() {
        let store = DocumentStore::new();
        store.write("counters/a", json!(0)).await.unwrap();

        const WRITERS: i64 = 64;
        let tasks = (0..WRITERS).map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                // Unavailable is transient, so a writer that exhausts its
                // retries under heavy contention just starts over.
                loop {
                    match store
                        .atomic_update("counters/a", |current| {
                            let value = current.and_then(Value::as_i64).unwrap_or(0);
                            TransactionDecision::Commit(json!(value + 1))
                        })
                        .await
                    {
                        Ok(_) => break,
                        Err(err) => assert!(err.is_transient()),
                    }
                }
            })
        });
        join_all(tasks).await;

        assert_eq!(
            store.read("counters/a").await.unwrap(),
            Some(json!(WRITERS))
        );
    }

    #[tokio::test]
    async fn subscribe_delivers_current_value_then_commits_in_order() {
        let store = DocumentStore::new();
        store.write("auctions/x", json!({"bid": 100})).await.unwrap();

        let mut subscription = store.subscribe("auctions/x").await.unwrap();
        assert_eq!(
            subscription.next().await,
            Some(Some(json!({"bid": 100})))
        );

        store.write("auctions/x", json!({"bid": 150})).await.unwrap();
        assert_eq!(
            subscription.next().await,
            Some(Some(json!({"bid": 150})))
        );

        store.remove("auctions/x").await.unwrap();
        assert_eq!(subscription.next().await, Some(None));
    }

    #[tokio::test]
    async fn subscribe_to_missing_path_delivers_none_first() {
        let store = DocumentStore::new();
        let mut subscription = store.subscribe("auctions/missing").await.unwrap();
        assert_eq!(subscription.next().await, Some(None));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn subscription_observes_commits_in_commit_order() {
        let store = DocumentStore::new();
        store.write("counters/a", json!(0)).await.unwrap();
        let mut subscription = store.subscribe("counters/a").await.unwrap();

        const WRITERS: i64 = 32;
        let handles: Vec<_> = (0..WRITERS)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    loop {
                        match store
                            .atomic_update("counters/a", |current| {
                                let value = current.and_then(Value::as_i64).unwrap_or(0);
                                TransactionDecision::Commit(json!(value + 1))
                            })
                            .await
                        {
                            Ok(_) => break,
                            Err(err) => assert!(err.is_transient()),
                        }
                    }
                })
            })
            .collect();

        // Coalescing may skip values, but whatever is delivered must follow
        // the committed sequence, which only ever counts up.
        let mut last = 0;
        while last < WRITERS {
            let observed = subscription
                .next()
                .await
                .expect("subscription should stay open")
                .and_then(|value| value.as_i64())
                .expect("counter should be an integer");
            assert!(observed >= last, "saw {} after {}", observed, last);
            last = observed;
        }
        join_all(handles).await;
    }

    #[tokio::test]
    async fn malformed_path_is_refused_as_fatal() {
        let store = DocumentStore::new();
        let err = store.write("/auctions/x", json!(1)).await.unwrap_err();
        assert_eq!(err, StoreError::PermissionDenied);
        assert!(!err.is_transient());
        assert!(StoreError::Unavailable.is_transient());

        let err = store.subscribe("auctions//x").await.unwrap_err();
        assert_eq!(err, StoreError::PermissionDenied);
    }
}
