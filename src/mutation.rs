//! Background writes that invalidate queries when they succeed.

use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::query::{QueryClient, QueryKey};

/// State of the most recently completed (or started) write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationState {
  Idle,
  Pending,
  Success,
  Error(String),
}

type BoxFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;
type MutatorFn<V> = Box<dyn Fn(V) -> BoxFuture + Send + Sync>;

/// Fire-and-forget write with invalidation on success.
///
/// Several writes may be in flight at once; they are not serialized. Each
/// success invalidates the configured keys as soon as the write completes,
/// before the UI polls the outcome.
pub struct Mutation<V> {
  mutator: MutatorFn<V>,
  client: QueryClient,
  invalidates: Vec<QueryKey>,
  tx: mpsc::UnboundedSender<Result<(), String>>,
  rx: mpsc::UnboundedReceiver<Result<(), String>>,
  pending: usize,
  state: MutationState,
}

impl<V: Send + 'static> Mutation<V> {
  pub fn new<F, Fut>(client: QueryClient, mutator: F) -> Self
  where
    F: Fn(V) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), String>> + Send + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      mutator: Box::new(move |vars| Box::pin(mutator(vars))),
      client,
      invalidates: Vec::new(),
      tx,
      rx,
      pending: 0,
      state: MutationState::Idle,
    }
  }

  /// Invalidate `key` after every successful write.
  pub fn invalidates(mut self, key: QueryKey) -> Self {
    self.invalidates.push(key);
    self
  }

  pub fn state(&self) -> &MutationState {
    &self.state
  }

  /// Number of writes still in flight.
  pub fn pending(&self) -> usize {
    self.pending
  }

  /// Start a write in the background.
  pub fn mutate(&mut self, vars: V) {
    let future = (self.mutator)(vars);
    let tx = self.tx.clone();
    let client = self.client.clone();
    let keys = self.invalidates.clone();

    self.pending += 1;
    self.state = MutationState::Pending;

    tokio::spawn(async move {
      let result = future.await;
      if result.is_ok() {
        for key in keys {
          client.invalidate(key);
        }
      }
      let _ = tx.send(result);
    });
  }

  /// Drain completed writes, returning their outcomes in completion order.
  pub fn poll(&mut self) -> Vec<Result<(), String>> {
    let mut outcomes = Vec::new();
    while let Ok(result) = self.rx.try_recv() {
      self.pending = self.pending.saturating_sub(1);
      match &result {
        Ok(()) => {
          debug!("mutation succeeded");
          self.state = MutationState::Success;
        }
        Err(e) => {
          warn!(error = %e, "mutation failed");
          self.state = MutationState::Error(e.clone());
        }
      }
      outcomes.push(result);
    }

    if self.pending > 0 {
      self.state = MutationState::Pending;
    }
    outcomes
  }
}
