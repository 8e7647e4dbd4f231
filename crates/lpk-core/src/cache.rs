//! Asynchronous LRU cache with single-flight generation.
//!
//! Values are produced by an async generator. Concurrent `get`s for a key
//! that is being generated share the one in-flight future. When the cache
//! grows past its bound the least recently used value is evicted and handed
//! to the eviction callback, exactly once.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

#[derive(thiserror::Error, Debug, Clone)]
pub enum CacheError {
    #[error("{0:#}")]
    Generation(Arc<anyhow::Error>),
}

type Generator<K, V> = Arc<dyn Fn(K) -> BoxFuture<'static, anyhow::Result<V>> + Send + Sync>;
type Evictor<V> = Arc<dyn Fn(V) -> BoxFuture<'static, ()> + Send + Sync>;
type InFlight<V> = Shared<BoxFuture<'static, Result<V, CacheError>>>;

struct State<K, V> {
    items: HashMap<K, V>,
    /// Least recently used first.
    order: VecDeque<K>,
    in_flight: HashMap<K, (u64, InFlight<V>)>,
    next_ticket: u64,
}

impl<K: Eq + Hash + Clone, V> State<K, V> {
    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key.clone());
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self.order.retain(|k| k != key);
        self.items.remove(key)
    }
}

pub struct AsyncCache<K, V> {
    max_items: usize,
    generate: Generator<K, V>,
    on_evict: Option<Evictor<V>>,
    state: Mutex<State<K, V>>,
}

impl<K, V> fmt::Debug for AsyncCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncCache")
            .field("max_items", &self.max_items)
            .field("evicts", &self.on_evict.is_some())
            .finish_non_exhaustive()
    }
}

impl<K, V> AsyncCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache holding at most `max_items` values (at least one).
    pub fn new<F>(max_items: usize, generate: F) -> Self
    where
        F: Fn(K) -> BoxFuture<'static, anyhow::Result<V>> + Send + Sync + 'static,
    {
        Self {
            max_items: max_items.max(1),
            generate: Arc::new(generate),
            on_evict: None,
            state: Mutex::new(State {
                items: HashMap::new(),
                order: VecDeque::new(),
                in_flight: HashMap::new(),
                next_ticket: 0,
            }),
        }
    }

    /// Run `on_evict` for every value that leaves the cache.
    #[must_use]
    pub fn with_eviction<E>(mut self, on_evict: E) -> Self
    where
        E: Fn(V) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.on_evict = Some(Arc::new(on_evict));
        self
    }

    /// Return the cached value for `key`, generating it if needed.
    ///
    /// A failed generation is not cached; the next `get` retries.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Generation`] with the generator's error, shared
    /// by every caller that awaited the same generation.
    pub async fn get(&self, key: K) -> Result<V, CacheError> {
        let (ticket, pending) = {
            let mut state = self.state.lock().await;
            if let Some(value) = state.items.get(&key).cloned() {
                state.touch(&key);
                return Ok(value);
            }
            if let Some((ticket, pending)) = state.in_flight.get(&key) {
                (*ticket, pending.clone())
            } else {
                state.next_ticket += 1;
                let ticket = state.next_ticket;
                let pending = (self.generate)(key.clone())
                    .map(|r| r.map_err(|e| CacheError::Generation(Arc::new(e))))
                    .boxed()
                    .shared();
                state.in_flight.insert(key.clone(), (ticket, pending.clone()));
                (ticket, pending)
            }
        };

        let result = pending.await;

        let evicted = {
            let mut state = self.state.lock().await;
            let ours = matches!(state.in_flight.get(&key), Some((t, _)) if *t == ticket);
            let mut evicted = Vec::new();
            if ours {
                state.in_flight.remove(&key);
                if let Ok(value) = &result {
                    if let Some(old) = state.remove(&key) {
                        evicted.push(old);
                    }
                    state.items.insert(key.clone(), value.clone());
                    state.order.push_back(key);
                    while state.items.len() > self.max_items {
                        let Some(lru) = state.order.pop_front() else {
                            break;
                        };
                        if let Some(value) = state.items.remove(&lru) {
                            evicted.push(value);
                        }
                    }
                }
            }
            evicted
        };

        self.evict_all(evicted).await;
        result
    }

    /// Drop `key` from the cache, running the eviction callback on its value.
    /// A generation in progress for `key` will not be cached.
    pub async fn invalidate(&self, key: &K) {
        let removed = {
            let mut state = self.state.lock().await;
            state.in_flight.remove(key);
            state.remove(key)
        };
        self.evict_all(removed.into_iter().collect()).await;
    }

    /// Evict everything.
    pub async fn clear(&self) {
        let drained: Vec<V> = {
            let mut state = self.state.lock().await;
            state.in_flight.clear();
            state.order.clear();
            state.items.drain().map(|(_, v)| v).collect()
        };
        self.evict_all(drained).await;
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, key: &K) -> bool {
        self.state.lock().await.items.contains_key(key)
    }

    async fn evict_all(&self, values: Vec<V>) {
        let Some(on_evict) = &self.on_evict else {
            return;
        };
        for value in values {
            on_evict(value).await;
        }
    }
}
