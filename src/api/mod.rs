pub mod client;
pub mod types;

use color_eyre::Result;
use futures::future::BoxFuture;

use crate::form::Application;
use types::Record;

pub use client::ApiClient;

/// Backend operations the dashboard depends on.
///
/// Futures are `'static` so callers can hand them straight to `tokio::spawn`.
pub trait JobBoard: Send + Sync {
  /// `GET /get-jobs`
  fn list_jobs(&self) -> BoxFuture<'static, Result<Vec<Record>>>;

  /// `POST /recruiter-apply`
  fn apply(&self, application: Application) -> BoxFuture<'static, Result<()>>;
}
