use std::sync::Arc;

use rusqlite::Connection;

use crate::errors::AppError;
use crate::state::AppState;

/// Runs `f` against the shared connection on the blocking pool, bounded by
/// the configured store timeout. Only `Unavailable` failures are retried.
///
/// A timed-out attempt keeps running on the blocking pool and may still
/// commit. Its error says so, and the eventual outcome is logged.
pub async fn run<T, F>(state: &Arc<AppState>, op: &'static str, f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: Fn(&mut Connection) -> Result<T, AppError> + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let db = Arc::clone(&state.db);
        let call = Arc::clone(&f);
        let mut task = tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|_| AppError::Unavailable("booking store lock poisoned".to_string()))?;
            (*call)(&mut *conn)
        });

        let result = match tokio::time::timeout(state.config.store_timeout, &mut task).await {
            Err(_) => {
                tracing::error!(op, timeout = ?state.config.store_timeout, "store call timed out");
                tokio::spawn(async move {
                    match task.await {
                        Ok(Ok(_)) => tracing::warn!(op, "timed-out store call completed"),
                        Ok(Err(err)) => tracing::info!(op, %err, "timed-out store call failed"),
                        Err(join) => tracing::error!(op, %join, "timed-out store call panicked"),
                    }
                });
                return Err(AppError::Unavailable(format!(
                    "{op} timed out; the change may still have been applied, reload before retrying"
                )));
            }
            Ok(Err(join)) => return Err(AppError::Internal(anyhow::anyhow!("{op} task failed: {join}"))),
            Ok(Ok(result)) => result,
        };

        match result {
            Err(AppError::Unavailable(reason)) if attempt <= state.config.store_retries => {
                tracing::warn!(op, attempt, %reason, "store unavailable, retrying");
            }
            other => return other,
        }
    }
}
