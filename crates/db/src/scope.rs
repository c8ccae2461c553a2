//! Scoped transaction context.
//!
//! Every unit of work (an incoming request or a background task) runs inside
//! one database transaction, published as a task-local ambient binding so
//! that repositories can reach it without the session being threaded through
//! every call. [`run`] owns the full lifecycle: begin, publish, await the
//! enclosed work, then commit on success or roll back on failure. The
//! task-local scope guarantees the previous binding is restored on every
//! exit path, so scopes nest safely.

use std::future::Future;
use std::sync::Arc;

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use voices_common::{AppError, AppResult};

/// The ambient unit-of-work handle.
pub type Session = Arc<DatabaseTransaction>;

tokio::task_local! {
    static DB_SESSION: Session;
}

/// Fetch the transaction bound to the current task scope.
///
/// Calling this outside an active scope is a programming error and fails
/// with [`AppError::Transaction`]. There is no fallback session.
pub fn current() -> AppResult<Session> {
    DB_SESSION
        .try_with(Arc::clone)
        .map_err(|_| AppError::Transaction("no active transaction scope".to_string()))
}

/// Whether a transaction scope is active on the current task.
#[must_use]
pub fn is_active() -> bool {
    DB_SESSION.try_with(|_| ()).is_ok()
}

/// Run `work` inside a fresh transaction scope.
///
/// Begins a transaction on `db`, publishes it as the ambient session for the
/// duration of `work`, then commits if `work` returned `Ok` and rolls back
/// if it returned `Err`. The previous ambient binding (if any) is shadowed
/// while `work` runs and restored when the scope exits, so nested calls each
/// get their own independent transaction.
///
/// Commit and rollback failures surface as [`AppError::Transaction`]; a
/// rollback failure does not mask the original error from `work`.
pub async fn run<T, F>(db: &DatabaseConnection, work: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    let txn = db
        .begin()
        .await
        .map_err(|e| AppError::Transaction(format!("failed to begin transaction: {e}")))?;
    let session = Arc::new(txn);

    let outcome = DB_SESSION.scope(Arc::clone(&session), work).await;

    match outcome {
        Ok(value) => {
            let txn = Arc::try_unwrap(session).map_err(|_| {
                AppError::Transaction("ambient session still held at scope exit".to_string())
            })?;
            txn.commit()
                .await
                .map_err(|e| AppError::Transaction(format!("commit failed: {e}")))?;
            tracing::debug!("transaction committed");
            Ok(value)
        }
        Err(err) => {
            match Arc::try_unwrap(session) {
                Ok(txn) => {
                    if let Err(rollback_err) = txn.rollback().await {
                        tracing::error!(error = %rollback_err, "rollback failed");
                    } else {
                        tracing::debug!(error = %err, "transaction rolled back");
                    }
                }
                Err(_leaked) => {
                    // The transaction rolls back when the last clone drops.
                    tracing::warn!("ambient session leaked past scope exit");
                }
            }
            Err(err)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn mock_db() -> DatabaseConnection {
        MockDatabase::new(DatabaseBackend::Postgres).into_connection()
    }

    #[tokio::test]
    async fn test_current_fails_outside_scope() {
        let err = current().unwrap_err();
        assert!(matches!(err, AppError::Transaction(_)));
        assert!(!is_active());
    }

    #[tokio::test]
    async fn test_run_publishes_session_and_returns_value() {
        let db = mock_db();

        let value = run(&db, async {
            assert!(is_active());
            current()?;
            Ok(42)
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert!(!is_active());
    }

    #[tokio::test]
    async fn test_error_propagates_and_binding_is_cleared() {
        let db = mock_db();

        let result: AppResult<()> = run(&db, async {
            Err(AppError::Validation("forced failure".to_string()))
        })
        .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(!is_active());
    }

    #[tokio::test]
    async fn test_binding_is_cleared_even_when_work_touched_session() {
        let db = mock_db();

        let result: AppResult<()> = run(&db, async {
            let _session = current()?;
            Err(AppError::BadRequest("after access".to_string()))
        })
        .await;

        assert!(result.is_err());
        assert!(!is_active());
    }

    #[tokio::test]
    async fn test_nested_scope_shadows_and_restores_outer() {
        let db = mock_db();

        run(&db, async {
            let outer = current()?;

            run(&db, async {
                let inner = current()?;
                assert!(!Arc::ptr_eq(&inner, &outer));
                Ok(())
            })
            .await?;

            // Outer binding is restored after the inner scope exits.
            let restored = current()?;
            assert!(Arc::ptr_eq(&restored, &outer));
            Ok(())
        })
        .await
        .unwrap();

        assert!(!is_active());
    }

    #[tokio::test]
    async fn test_inner_failure_does_not_poison_outer_scope() {
        let db = mock_db();

        run(&db, async {
            let inner: AppResult<()> = run(&db, async {
                Err(AppError::Validation("inner failure".to_string()))
            })
            .await;
            assert!(inner.is_err());

            // Outer scope is still usable.
            current()?;
            Ok(())
        })
        .await
        .unwrap();
    }
}
