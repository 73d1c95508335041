//! Record store: local snapshot of the remote `/api/data` collection.
//!
//! DESIGN
//! ======
//! The snapshot is never patched locally. Every confirmed mutation is
//! followed by exactly one full listing, and that listing replaces the
//! snapshot wholesale. Listings are stamped with a monotonically increasing
//! sequence number when issued; a response is applied only if nothing newer
//! has been applied already, so overlapping resyncs cannot roll the snapshot
//! back.
//!
//! ERROR HANDLING
//! ==============
//! Validation runs before any network call. Remote and transport failures
//! leave the snapshot and drafts exactly as they were, which keeps a failed
//! edit open for another attempt. Nothing is retried.
//!
//! A mutation the remote accepted stays applied even if the follow-up listing
//! fails. That case is reported as `ResyncFailed` so callers can tell it
//! apart from a rejected write; the drafts are settled as on success.

#[cfg(test)]
#[path = "records_test.rs"]
mod records_test;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::draft::{DraftRecord, FieldPatch, ValidationError, patch_draft, validate};
use crate::net::api::{ApiError, RecordApi};
use crate::net::types::{Record, RecordFields};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Non-2xx response; status and body exactly as received.
    #[error("{status} - {body}")]
    RemoteRejection { status: u16, body: String },
    #[error("network error: {0}")]
    TransportFailure(String),
    /// The mutation was applied remotely; only the follow-up listing failed.
    #[error("saved, but the record list could not be refreshed: {0}")]
    ResyncFailed(#[source] Box<StoreError>),
}

impl StoreError {
    /// True when the remote accepted the write despite the error.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::ResyncFailed(_))
    }
}

impl From<ApiError> for StoreError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Remote { status, body } => Self::RemoteRejection { status, body },
            ApiError::Transport(message) => Self::TransportFailure(message),
        }
    }
}

#[derive(Default)]
struct StoreInner {
    records: Vec<Record>,
    applied_seq: u64,
    create_draft: DraftRecord,
    edit_draft: Option<DraftRecord>,
}

pub struct RecordStore {
    api: Arc<dyn RecordApi>,
    inner: RwLock<StoreInner>,
    issued_seq: AtomicU64,
}

impl RecordStore {
    #[must_use]
    pub fn new(api: Arc<dyn RecordApi>) -> Self {
        Self { api, inner: RwLock::new(StoreInner::default()), issued_seq: AtomicU64::new(0) }
    }

    // =========================================================================
    // SNAPSHOT
    // =========================================================================

    /// Current snapshot, in remote listing order.
    pub async fn snapshot(&self) -> Vec<Record> {
        self.inner.read().await.records.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Record> {
        self.inner
            .read()
            .await
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// Fetch the full listing and replace the snapshot with it.
    ///
    /// Returns the snapshot as it stands after this call. If a newer listing
    /// was applied while this one was in flight, this response is dropped
    /// and the newer snapshot is returned.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the listing request fails; the snapshot is
    /// left as it was.
    pub async fn list(&self) -> Result<Vec<Record>, StoreError> {
        let seq = self.issued_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let records = self.api.list().await.map_err(|e| {
            warn!(seq, error = %e, "record listing failed");
            StoreError::from(e)
        })?;

        let mut inner = self.inner.write().await;
        if seq > inner.applied_seq {
            inner.applied_seq = seq;
            inner.records = records;
            info!(seq, count = inner.records.len(), "record snapshot replaced");
        } else {
            debug!(seq, applied_seq = inner.applied_seq, "stale record listing dropped");
        }
        Ok(inner.records.clone())
    }

    async fn resync(&self) -> Result<(), StoreError> {
        match self.list().await {
            Ok(_) => Ok(()),
            Err(e) => Err(StoreError::ResyncFailed(Box::new(e))),
        }
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Create a record, then resync.
    ///
    /// # Errors
    ///
    /// [`StoreError::Validation`] if the id or any field is blank (no request
    /// is made); otherwise the remote or transport failure.
    /// [`StoreError::ResyncFailed`] if the create was applied but the
    /// follow-up listing failed.
    ///
    /// The create draft is cleared only if it still holds exactly this
    /// record, so edits made while the request was in flight survive.
    pub async fn create(&self, id: &str, fields: RecordFields) -> Result<(), StoreError> {
        validate(id, &fields)?;
        let record = Record { id: id.to_owned(), fields };
        self.api.create(&record).await?;
        info!(id, "record created");

        {
            let mut inner = self.inner.write().await;
            if inner.create_draft == DraftRecord::from_record(&record) {
                inner.create_draft = DraftRecord::blank();
            }
        }
        self.resync().await
    }

    /// Replace the fields of `id`, then resync. Existence is not checked
    /// locally; the remote decides.
    ///
    /// # Errors
    ///
    /// Same as [`RecordStore::create`]. On failure an open edit stays open.
    pub async fn update(&self, id: &str, fields: RecordFields) -> Result<(), StoreError> {
        validate(id, &fields)?;
        self.api.update(id, &fields).await?;
        info!(id, "record updated");

        {
            let mut inner = self.inner.write().await;
            if inner.edit_draft.as_ref().is_some_and(|d| d.id == id) {
                inner.edit_draft = None;
            }
        }
        self.resync().await
    }

    /// Delete `id`, then resync.
    ///
    /// # Errors
    ///
    /// [`StoreError::Validation`] for a blank id; otherwise the remote or
    /// transport failure, or [`StoreError::ResyncFailed`] after an applied
    /// delete.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        if id.trim().is_empty() {
            return Err(ValidationError::BlankFields { fields: vec!["id"] }.into());
        }
        self.api.delete(id).await?;
        info!(id, "record deleted");
        self.resync().await
    }

    // =========================================================================
    // CREATE DRAFT
    // =========================================================================

    pub async fn create_draft(&self) -> DraftRecord {
        self.inner.read().await.create_draft.clone()
    }

    /// Merge `patch` into the create draft and return the new draft.
    pub async fn patch_draft(&self, patch: FieldPatch) -> DraftRecord {
        let mut inner = self.inner.write().await;
        inner.create_draft = patch_draft(&inner.create_draft, patch);
        inner.create_draft.clone()
    }

    pub async fn reset_draft(&self) {
        self.inner.write().await.create_draft = DraftRecord::blank();
    }

    /// Submit the create draft. It is cleared once the create is applied,
    /// unless it was edited in the meantime.
    ///
    /// # Errors
    ///
    /// Same as [`RecordStore::create`].
    pub async fn submit_draft(&self) -> Result<(), StoreError> {
        let draft = self.create_draft().await;
        let record = draft.to_record()?;
        self.create(&record.id, record.fields).await
    }

    // =========================================================================
    // EDIT DRAFT
    // =========================================================================

    /// Open an edit on a record from the snapshot. Replaces any open edit.
    /// Returns `None` if the id is not in the snapshot.
    pub async fn begin_edit(&self, id: &str) -> Option<DraftRecord> {
        let mut inner = self.inner.write().await;
        let draft = inner
            .records
            .iter()
            .find(|r| r.id == id)
            .map(DraftRecord::from_record)?;
        inner.edit_draft = Some(draft.clone());
        Some(draft)
    }

    pub async fn edit_draft(&self) -> Option<DraftRecord> {
        self.inner.read().await.edit_draft.clone()
    }

    /// Merge `patch` into the open edit. The id of an edit cannot change.
    pub async fn patch_edit(&self, patch: FieldPatch) -> Option<DraftRecord> {
        let mut inner = self.inner.write().await;
        let current = inner.edit_draft.as_ref()?;
        let next = patch_draft(current, FieldPatch { id: None, ..patch });
        inner.edit_draft = Some(next.clone());
        Some(next)
    }

    pub async fn cancel_edit(&self) {
        self.inner.write().await.edit_draft = None;
    }

    /// Submit the open edit as an update.
    ///
    /// # Errors
    ///
    /// [`ValidationError::NoEditOpen`] if nothing is being edited; otherwise
    /// the same as [`RecordStore::update`].
    pub async fn submit_edit(&self) -> Result<(), StoreError> {
        let draft = self.edit_draft().await.ok_or(ValidationError::NoEditOpen)?;
        let record = draft.to_record()?;
        self.update(&record.id, record.fields).await
    }
}
