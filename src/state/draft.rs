//! Uncommitted record edits.
//!
//! DESIGN
//! ======
//! A draft is a plain value. Field edits go through `patch_draft`, which
//! returns a new draft instead of mutating in place, and the "every field
//! required" rule is checked once, by `validate`, when the draft is
//! submitted. Drafts may be blank or partial while they are being composed.

#[cfg(test)]
#[path = "draft_test.rs"]
mod draft_test;

use crate::net::types::{Record, RecordFields};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("please fill in all fields before saving (blank: {})", .fields.join(", "))]
    BlankFields { fields: Vec<&'static str> },
    #[error("no record is being edited")]
    NoEditOpen,
}

/// Partial field update. `None` leaves the current value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPatch {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub note: Option<String>,
}

/// A record being composed or edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftRecord {
    pub id: String,
    pub fields: RecordFields,
}

impl DraftRecord {
    /// Blank template for a new record.
    #[must_use]
    pub fn blank() -> Self {
        Self::default()
    }

    /// Editable copy of an existing record.
    #[must_use]
    pub fn from_record(record: &Record) -> Self {
        Self { id: record.id.clone(), fields: record.fields.clone() }
    }

    /// Check the draft and produce the record it describes.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::BlankFields`] naming every blank value.
    pub fn to_record(&self) -> Result<Record, ValidationError> {
        validate(&self.id, &self.fields)?;
        Ok(Record { id: self.id.clone(), fields: self.fields.clone() })
    }
}

/// Merge `patch` over `draft` and return the result.
#[must_use]
pub fn patch_draft(draft: &DraftRecord, patch: FieldPatch) -> DraftRecord {
    let FieldPatch { id, name, description, price, note } = patch;
    let current = &draft.fields;
    DraftRecord {
        id: id.unwrap_or_else(|| draft.id.clone()),
        fields: RecordFields {
            name: name.unwrap_or_else(|| current.name.clone()),
            description: description.unwrap_or_else(|| current.description.clone()),
            price: price.unwrap_or_else(|| current.price.clone()),
            note: note.unwrap_or_else(|| current.note.clone()),
        },
    }
}

/// Require a non-blank id and non-blank fields.
///
/// # Errors
///
/// Returns [`ValidationError::BlankFields`] listing every blank value, id first.
pub fn validate(id: &str, fields: &RecordFields) -> Result<(), ValidationError> {
    let mut blank = Vec::new();
    if id.trim().is_empty() {
        blank.push("id");
    }
    blank.extend(fields.blank_fields());
    if blank.is_empty() { Ok(()) } else { Err(ValidationError::BlankFields { fields: blank }) }
}
