//! Async query abstraction for data fetching with keyed invalidation.
//!
//! Inspired by TanStack Query. A `Query<T>` owns one fetcher and its
//! loading/success/error state; a `QueryClient` is the shared handle writes
//! use to mark keys stale. Bound queries notice invalidation in `poll()` and
//! refetch on their own.
//!
//! # Example
//!
//! ```ignore
//! let client = QueryClient::new();
//! let board = board.clone();
//! let mut query = Query::new(move || {
//!     let board = board.clone();
//!     async move { board.list_jobs().await.map_err(|e| e.to_string()) }
//! })
//! .bind(QueryKey::Jobs, client.clone());
//!
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // After a successful write elsewhere
//! client.invalidate(QueryKey::Jobs); // next poll() refetches
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::debug;

/// Keys identifying cached server data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
  /// The list behind `GET /get-jobs`
  Jobs,
}

impl QueryKey {
  pub fn description(&self) -> &'static str {
    match self {
      QueryKey::Jobs => "jobs",
    }
  }
}

/// Shared handle for invalidating queries by key.
///
/// Each key carries a generation counter; invalidation bumps it and every
/// bound query compares against the generation it last fetched at.
#[derive(Debug, Clone, Default)]
pub struct QueryClient {
  generations: Arc<Mutex<HashMap<QueryKey, u64>>>,
}

impl QueryClient {
  pub fn new() -> Self {
    Self::default()
  }

  /// Mark a key stale. Active queries bound to it refetch on their next poll.
  pub fn invalidate(&self, key: QueryKey) {
    let mut generations = self.lock();
    let generation = generations.entry(key).or_default();
    *generation += 1;
    debug!(key = key.description(), generation = *generation, "query invalidated");
  }

  pub fn generation(&self, key: QueryKey) -> u64 {
    self.lock().get(&key).copied().unwrap_or_default()
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, u64>> {
    // The map holds plain counters; a poisoned lock still has valid data
    self.generations.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// First fetch in flight, no data yet
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// A boxed future that returns a Result<T, String>
type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Link between a query and the client that can invalidate it.
struct Binding {
  key: QueryKey,
  client: QueryClient,
  seen_generation: u64,
}

/// Async query for data fetching with state management.
pub struct Query<T> {
  state: QueryState<T>,
  fetching: bool,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
  fetched_at: Option<Instant>,
  stale_time: Duration,
  binding: Option<Binding>,
}

impl<T: Send + 'static> Query<T> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is called each time `fetch()` or `refetch()` starts a request.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetching: false,
      fetcher: Box::new(move || Box::pin(fetcher())),
      receiver: None,
      fetched_at: None,
      stale_time: Duration::from_secs(60),
      binding: None,
    }
  }

  /// Bind this query to a key so writes can invalidate it.
  pub fn bind(mut self, key: QueryKey, client: QueryClient) -> Self {
    let seen_generation = client.generation(key);
    self.binding = Some(Binding {
      key,
      client,
      seen_generation,
    });
    self
  }

  /// Set the stale time for this query.
  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.stale_time = duration;
    self
  }

  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  /// In flight with nothing to show yet.
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Any request in flight, including background refetches over existing data.
  pub fn is_fetching(&self) -> bool {
    self.fetching
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Check if the data is older than stale_time.
  pub fn is_stale(&self) -> bool {
    match &self.state {
      QueryState::Success(_) => self
        .fetched_at
        .map(|t| t.elapsed() > self.stale_time)
        .unwrap_or(true),
      _ => false,
    }
  }

  /// Whether the bound key was invalidated since our last fetch started.
  pub fn is_invalidated(&self) -> bool {
    self
      .binding
      .as_ref()
      .is_some_and(|b| b.client.generation(b.key) != b.seen_generation)
  }

  /// Start fetching data unless a request is already in flight.
  pub fn fetch(&mut self) {
    if self.fetching {
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch. A pending result is dropped; loaded data stays visible.
  pub fn refetch(&mut self) {
    self.receiver = None;
    self.start_fetch();
  }

  /// Poll for results and pending invalidation.
  ///
  /// Returns `true` if the state changed. Call this in the event loop tick.
  pub fn poll(&mut self) -> bool {
    let mut changed = self.poll_receiver();

    if self.is_invalidated() && !matches!(self.state, QueryState::Idle) {
      self.refetch();
      changed = true;
    }

    changed
  }

  fn poll_receiver(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    let result = match receiver.try_recv() {
      Ok(result) => result,
      Err(mpsc::error::TryRecvError::Empty) => return false,
      Err(mpsc::error::TryRecvError::Disconnected) => Err("Query was cancelled".to_string()),
    };

    self.receiver = None;
    self.fetching = false;
    match result {
      Ok(data) => {
        self.state = QueryState::Success(data);
        self.fetched_at = Some(Instant::now());
      }
      Err(error) => {
        self.state = QueryState::Error(error);
      }
    }
    true
  }

  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.fetching = true;
    if !self.state.is_success() {
      self.state = QueryState::Loading;
    }
    if let Some(binding) = &mut self.binding {
      binding.seen_generation = binding.client.generation(binding.key);
    }

    let future = (self.fetcher)();
    tokio::spawn(async move {
      // Receiver may have been dropped by a refetch
      let _ = tx.send(future.await);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("fetching", &self.fetching)
      .field("fetched_at", &self.fetched_at)
      .field("stale_time", &self.stale_time)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};

  fn counting_query(counter: Arc<AtomicU32>) -> Query<u32> {
    Query::new(move || {
      let counter = counter.clone();
      async move { Ok::<_, String>(counter.fetch_add(1, Ordering::SeqCst)) }
    })
  }

  #[tokio::test]
  async fn test_query_success() {
    let mut query = Query::new(|| async { Ok::<_, String>(vec![1, 2, 3]) });

    assert!(matches!(query.state(), QueryState::Idle));

    query.fetch();
    assert!(query.is_loading());
    assert!(query.is_fetching());

    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.state().is_success());
    assert!(!query.is_fetching());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: Query<i32> = Query::new(|| async { Err("Something went wrong".to_string()) });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_error());
    assert_eq!(query.error(), Some("Something went wrong"));
    assert!(query.data().is_none());
  }

  #[tokio::test]
  async fn test_query_stale() {
    let mut query = Query::new(|| async { Ok::<_, String>(42) }).with_stale_time(Duration::ZERO);

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    assert!(query.is_stale());
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();
    let mut query = Query::new(move || {
      let counter = counter_clone.clone();
      async move {
        counter.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, String>(42)
      }
    });

    query.fetch();
    query.fetch();
    assert!(query.is_loading());

    tokio::time::sleep(Duration::from_millis(100)).await;
    query.poll();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_refetch_keeps_data_visible() {
    let counter = Arc::new(AtomicU32::new(0));
    let mut query = counting_query(counter);

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&0));

    query.refetch();
    assert!(query.is_fetching());
    assert!(!query.is_loading());
    assert_eq!(query.data(), Some(&0));

    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_refetch_cancels_pending() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let mut query = Query::new(move || {
      let counter = counter_clone.clone();
      async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, String>(counter.fetch_add(1, Ordering::SeqCst))
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    query.refetch();
    tokio::time::sleep(Duration::from_millis(100)).await;

    query.poll();
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_invalidation_triggers_refetch() {
    let client = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let mut query = counting_query(counter.clone()).bind(QueryKey::Jobs, client.clone());

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert!(!query.is_invalidated());

    client.invalidate(QueryKey::Jobs);
    assert!(query.is_invalidated());

    assert!(query.poll());
    assert!(query.is_fetching());
    assert!(!query.is_invalidated());

    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_idle_query_ignores_invalidation() {
    let client = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let mut query = counting_query(counter.clone()).bind(QueryKey::Jobs, client.clone());

    client.invalidate(QueryKey::Jobs);
    assert!(!query.poll());
    assert!(matches!(query.state(), QueryState::Idle));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn test_client_generations() {
    let client = QueryClient::new();
    assert_eq!(client.generation(QueryKey::Jobs), 0);

    let other = client.clone();
    other.invalidate(QueryKey::Jobs);
    other.invalidate(QueryKey::Jobs);
    assert_eq!(client.generation(QueryKey::Jobs), 2);
  }
}
