use async_trait::async_trait;

use super::contracts::SourceError;

const MARK_READ_FAILED: &str = "CHAT_MARK_READ_FAILED";

#[async_trait]
pub trait ReadMarker: Send + Sync {
    async fn mark_read(&self, chat_id: i64) -> Result<(), SourceError>;
}

/// Marks a chat as read. Failures are logged and otherwise dropped; there is
/// no retry.
pub async fn mark_read(marker: &dyn ReadMarker, chat_id: i64) {
    if let Err(error) = marker.mark_read(chat_id).await {
        tracing::warn!(
            code = MARK_READ_FAILED,
            chat_id,
            error = ?error,
            "marking chat as read failed"
        );
    }
}
