//! Paginated bootstrap load.

use crate::error::{SyncError, SyncResult};
use crate::ledger::RevisionLedger;
use crate::transport::DocumentStore;
use couchbrain_protocol::{BrainData, ListRequest};
use tracing::{debug, warn};

/// Everything a completed bootstrap learned about the store.
#[derive(Debug, Clone, Default)]
pub struct Bootstrap {
    /// Values of every non-deleted document.
    pub working_copy: BrainData,
    /// Revision token of every listed document, deleted ones included.
    pub ledger: RevisionLedger,
    /// Total row count reported by the last page.
    pub total_rows: u64,
    /// Rows actually received.
    pub rows_seen: u64,
}

impl Bootstrap {
    /// Returns the number of listed rows that were deletion tombstones
    /// or carried no value.
    pub fn tombstones(&self) -> usize {
        self.ledger.len().saturating_sub(self.working_copy.len())
    }
}

/// Loads the whole key space, one page at a time.
///
/// Pages are fetched strictly in sequence with a monotonically increasing
/// offset. Any fetch error aborts the load; nothing partial is returned.
pub async fn load_all<S>(store: &S, page_size: u32) -> SyncResult<Bootstrap>
where
    S: DocumentStore + ?Sized,
{
    let mut loaded = Bootstrap::default();
    let mut request = ListRequest::first_page(page_size.max(1));

    loop {
        let page = store.list(&request).await?;
        let received = page.rows.len();
        loaded.total_rows = page.total_rows;

        for row in page.rows {
            let rev = row
                .revision()
                .ok_or_else(|| SyncError::MissingRevision {
                    key: row.id.clone(),
                })?
                .to_string();
            if let Some(value) = row.payload() {
                loaded.working_copy.insert(row.id.clone(), value.clone());
            }
            loaded.ledger.insert(row.id, rev);
        }

        loaded.rows_seen += received as u64;
        debug!(
            offset = loaded.rows_seen,
            total = loaded.total_rows,
            "fetched page of {received} rows"
        );

        if loaded.rows_seen >= loaded.total_rows {
            break;
        }
        if received == 0 {
            warn!(
                offset = loaded.rows_seen,
                total = loaded.total_rows,
                "store returned an empty page before the reported total; finishing load"
            );
            break;
        }
        request = request.next(received);
    }

    Ok(loaded)
}
