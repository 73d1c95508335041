//! BrandAid client core.
//!
//! ARCHITECTURE
//! ============
//! `net` talks to the remote `/api/data` service, `state` keeps the local
//! record snapshot and the chat transcript, and `config` reads the runtime
//! settings from the environment. The `brandaid` binary is a thin command
//! line front end over these.

pub mod config;
pub mod net;
pub mod state;

pub use config::{AppConfig, ChatMode};
pub use net::api::{ApiError, HttpRecordApi, RecordApi};
pub use net::types::{Record, RecordFields};
pub use state::conversation::{ChatTurn, ConversationEngine, Role, TurnStage};
pub use state::draft::{DraftRecord, FieldPatch, ValidationError};
pub use state::records::{RecordStore, StoreError};
