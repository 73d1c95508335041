//! Record model and the `/api/data` wire shapes.
//!
//! DESIGN
//! ======
//! The remote listing is decoded leniently (`WireRecord` with defaulted
//! fields) and then narrowed to the canonical `Record`. Entries that do not
//! carry every field are dropped at this boundary so the local snapshot can
//! never hold a half-filled record.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};

/// The four required text fields of a record.
///
/// `note` is spelled `message` on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFields {
    pub name: String,
    pub description: String,
    pub price: String,
    #[serde(rename = "message")]
    pub note: String,
}

impl RecordFields {
    /// Field names paired with their values, in display order.
    #[must_use]
    pub fn named(&self) -> [(&'static str, &str); 4] {
        [
            ("name", self.name.as_str()),
            ("description", self.description.as_str()),
            ("price", self.price.as_str()),
            ("note", self.note.as_str()),
        ]
    }

    /// Names of fields that are empty or whitespace-only.
    #[must_use]
    pub fn blank_fields(&self) -> Vec<&'static str> {
        self.named()
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }
}

/// A persisted record as held in the local snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(rename = "data")]
    pub fields: RecordFields,
}

/// Listing entry as the remote returns it. Missing fields default to empty.
#[derive(Debug, Deserialize)]
pub(crate) struct WireRecord {
    pub id: String,
    #[serde(default)]
    pub data: WireFields,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireFields {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub message: String,
}

impl WireRecord {
    /// Narrow to a canonical `Record`, or `None` if any value is blank.
    pub(crate) fn into_record(self) -> Option<Record> {
        let fields = RecordFields {
            name: self.data.name,
            description: self.data.description,
            price: self.data.price,
            note: self.data.message,
        };
        if self.id.trim().is_empty() || !fields.blank_fields().is_empty() {
            return None;
        }
        Some(Record { id: self.id, fields })
    }
}

/// `PUT /api/data/{id}` body.
#[derive(Debug, Serialize)]
pub(crate) struct UpdateBody<'a> {
    pub data: &'a RecordFields,
}
