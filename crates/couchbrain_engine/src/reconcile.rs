//! Submits a diff and applies the store's verdicts to local bookkeeping.

use crate::diff::Diff;
use crate::error::SyncResult;
use crate::snapshot::Bookkeeping;
use crate::transport::DocumentStore;
use couchbrain_protocol::BulkWriteRequest;
use tracing::{debug, warn};

/// A document the store refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Document key.
    pub key: String,
    /// Error kind reported by the store (e.g. `conflict`).
    pub error: Option<String>,
    /// Reason reported by the store.
    pub reason: Option<String>,
}

/// What one reconcile pass achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Documents submitted in the batch.
    pub submitted: usize,
    /// Accepted creates and updates.
    pub written: usize,
    /// Accepted deletions.
    pub deleted: usize,
    /// Refused documents; their bookkeeping is unchanged.
    pub rejected: Vec<Rejection>,
}

impl ReconcileReport {
    /// Returns the number of accepted documents.
    pub fn accepted(&self) -> usize {
        self.written + self.deleted
    }

    /// Returns true if every submitted document was accepted.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Writes `diff` as one batch and records the accepted subset.
///
/// On a request-level failure the error is returned and `books` is left
/// untouched, so the next cycle recomputes the same delta.
pub async fn reconcile<S>(
    store: &S,
    diff: &Diff,
    books: &mut Bookkeeping,
) -> SyncResult<ReconcileReport>
where
    S: DocumentStore + ?Sized,
{
    let request = BulkWriteRequest::new(diff.documents.clone());
    let response = store.bulk_write(&request).await?;
    debug!("store answered {} outcomes", response.outcomes.len());

    let mut report = ReconcileReport {
        submitted: request.len(),
        ..ReconcileReport::default()
    };

    for outcome in response.outcomes {
        if !outcome.is_accepted() {
            warn!(
                key = %outcome.id,
                error = outcome.error.as_deref().unwrap_or("unknown"),
                reason = outcome.reason.as_deref().unwrap_or(""),
                "store rejected document"
            );
            report.rejected.push(Rejection {
                key: outcome.id,
                error: outcome.error,
                reason: outcome.reason,
            });
            continue;
        }

        if diff.deletions.contains(&outcome.id) {
            books.confirm_delete(&outcome.id);
            report.deleted += 1;
        } else if let (Some(value), Some(rev)) = (diff.changes.get(&outcome.id), outcome.rev) {
            books.confirm_write(&outcome.id, rev, value.clone());
            report.written += 1;
        } else {
            warn!(key = %outcome.id, "outcome for a document that was not submitted");
        }
    }

    Ok(report)
}
