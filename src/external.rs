//! Collaborator contracts consumed by the core.
//!
//! The ledger never talks to a real object store, image renderer, or mail gateway
//! directly; it goes through the narrow traits defined here. Everything behind these
//! traits is best-effort from the core's perspective: a failed upload or notification
//! is logged and the essential ledger mutation still commits.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;

/// Everything needed to render a payment receipt.
#[derive(Debug, Clone)]
pub struct ReceiptDetails {
    /// Member's full name
    pub member_name: String,
    /// Member's email
    pub email: String,
    /// Date the payment was made
    pub payment_date: NaiveDate,
    /// Amount received
    pub amount: f64,
    /// Name of the plan the payment was made against
    pub plan_name: String,
    /// How the payment was made, if known
    pub payment_method: Option<String>,
}

/// Renders a receipt into bytes. Pure; no side effects.
pub trait ReceiptRenderer: Send + Sync {
    /// Produces the receipt document for the given payment details.
    fn render(&self, details: &ReceiptDetails) -> Result<Vec<u8>>;
}

/// Remote object storage for receipts and profile pictures.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads `bytes` under `path` and returns the public URL.
    async fn upload(&self, bytes: Vec<u8>, path: &str) -> Result<String>;

    /// Deletes the object stored under `path`.
    async fn delete(&self, path: &str) -> Result<()>;
}

/// Outbound membership-expiry notifications. Fire-and-forget.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Tells the member at `email` that their membership is due on `due_date`.
    async fn send_expiry_reminder(&self, email: &str, due_date: NaiveDate) -> Result<()>;
}

/// Plain-text receipt renderer.
///
/// Stands in for the image rasterizer of the original system; the ledger only cares
/// that rendering is pure and yields bytes to upload.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextReceiptRenderer;

impl ReceiptRenderer for TextReceiptRenderer {
    fn render(&self, details: &ReceiptDetails) -> Result<Vec<u8>> {
        let method = details.payment_method.as_deref().unwrap_or("N/A");
        let text = format!(
            "PAYMENT RECEIPT\n\
             ================\n\
             Name:    {}\n\
             Email:   {}\n\
             Date:    {}\n\
             Amount:  {:.2}\n\
             Plan:    {}\n\
             Method:  {}\n",
            details.member_name,
            details.email,
            details.payment_date.format("%Y-%m-%d"),
            details.amount,
            details.plan_name,
            method,
        );
        Ok(text.into_bytes())
    }
}

/// Object store backed by a local directory, used by the daemon.
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    /// Creates a store rooted at `root`. The directory is created on first upload.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for LocalDirStore {
    async fn upload(&self, bytes: Vec<u8>, path: &str) -> Result<String> {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, bytes).await?;
        Ok(format!("file://{}", full.display()))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full = self.root.join(path);
        tokio::fs::remove_file(&full).await.map_err(|e| Error::Dependency {
            message: format!("failed to delete object '{path}': {e}"),
        })
    }
}

/// In-memory object store for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently held.
    ///
    /// # Panics
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.lock().expect("store lock poisoned").len()
    }

    /// Whether the store holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn upload(&self, bytes: Vec<u8>, path: &str) -> Result<String> {
        let mut objects = self.objects.lock().map_err(|_| Error::Dependency {
            message: "store lock poisoned".to_string(),
        })?;
        objects.insert(path.to_string(), bytes);
        Ok(format!("memory://{path}"))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let mut objects = self.objects.lock().map_err(|_| Error::Dependency {
            message: "store lock poisoned".to_string(),
        })?;
        objects.remove(path).ok_or_else(|| Error::Dependency {
            message: format!("no object stored at '{path}'"),
        })?;
        Ok(())
    }
}

/// Object store that fails every call. Used in tests to verify that receipt and
/// notification failures never block the ledger mutation.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingStore;

#[async_trait]
impl ObjectStore for FailingStore {
    async fn upload(&self, _bytes: Vec<u8>, path: &str) -> Result<String> {
        Err(Error::Dependency {
            message: format!("upload to '{path}' refused"),
        })
    }

    async fn delete(&self, path: &str) -> Result<()> {
        Err(Error::Dependency {
            message: format!("delete of '{path}' refused"),
        })
    }
}

/// Notifier that logs reminders through `tracing` instead of sending email.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send_expiry_reminder(&self, email: &str, due_date: NaiveDate) -> Result<()> {
        info!(email, due_date = %due_date, "membership expiry reminder");
        Ok(())
    }
}
