use async_trait::async_trait;
use shared_error::AppError;

/// Receipt blob storage boundary.
///
/// The core owns the `receipt_ref` column; the store owns the bytes. Handles
/// are opaque strings minted by the implementation.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    /// Store a receipt and return its handle.
    async fn put(
        &self,
        owner_username: &str,
        expense_id: i64,
        bytes: Vec<u8>,
        mime: &str,
    ) -> Result<String, AppError>;

    /// Fetch the bytes behind a handle.
    async fn get(&self, handle: &str) -> Result<Vec<u8>, AppError>;

    /// Delete the bytes behind a handle. Callers treat failures as
    /// best-effort: a failed blob delete never rolls back a row deletion.
    async fn delete(&self, handle: &str) -> Result<(), AppError>;
}
