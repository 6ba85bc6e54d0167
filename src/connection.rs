//! Chat service connection seam.
//!
//! [`ChatConnection`] is the small surface the pipeline and the MCP tools
//! need from the chat service. [`SharedConnection`] lazily creates one
//! connection per process and hands the same instance to every caller,
//! including callers that race on first use.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use crate::models::message::{ChatMessage, DialogInfo};
use crate::{AppError, Result};

/// Boxed future returned by [`ChatConnection`] methods.
pub type ConnFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Operations against the chat service.
pub trait ChatConnection: Send + Sync {
    /// Fetch up to `limit` most recent messages in `dialog_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` if the service call fails.
    fn fetch_recent<'a>(&'a self, dialog_id: &'a str, limit: u16) -> ConnFuture<'a, Vec<ChatMessage>>;

    /// Post `text` to `dialog_id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` if the message cannot be delivered.
    fn send_message<'a>(&'a self, dialog_id: &'a str, text: &'a str) -> ConnFuture<'a, ()>;

    /// List up to `limit` dialogs visible to the account.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` if the service call fails.
    fn list_dialogs(&self, limit: u16) -> ConnFuture<'_, Vec<DialogInfo>>;

    /// Create a new group dialog and return it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` if the group cannot be created.
    fn create_group<'a>(&'a self, title: &'a str, about: Option<&'a str>) -> ConnFuture<'a, DialogInfo>;
}

type Factory = Box<dyn Fn() -> ConnFuture<'static, Arc<dyn ChatConnection>> + Send + Sync>;

/// Process-wide lazily initialized connection.
pub struct SharedConnection {
    cell: OnceCell<Arc<dyn ChatConnection>>,
    factory: Factory,
}

impl SharedConnection {
    /// Create a shared connection that runs `factory` on first use.
    ///
    /// A failed initialization leaves the cell empty so the next caller
    /// retries.
    #[must_use]
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn ChatConnection>>> + Send + 'static,
    {
        Self {
            cell: OnceCell::new(),
            factory: Box::new(move || Box::pin(factory())),
        }
    }

    /// Wrap an already established connection.
    #[must_use]
    pub fn ready(connection: Arc<dyn ChatConnection>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(connection)),
            factory: Box::new(|| {
                Box::pin(async {
                    Err(AppError::Slack("connection factory is not available".into()))
                })
            }),
        }
    }

    /// Return the connection, creating it on first call.
    ///
    /// Concurrent first calls wait on a single initialization.
    ///
    /// # Errors
    ///
    /// Propagates the factory's error.
    pub async fn get(&self) -> Result<Arc<dyn ChatConnection>> {
        let connection = self
            .cell
            .get_or_try_init(|| async {
                let connection = (self.factory)().await?;
                info!("chat connection established");
                Ok::<_, AppError>(connection)
            })
            .await?;
        Ok(Arc::clone(connection))
    }

    /// Whether a connection has been established.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}
