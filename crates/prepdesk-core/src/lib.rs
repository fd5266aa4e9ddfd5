//! Core library for prepdesk.
//!
//! Local-only session handling for the exam-prep app: who is signed in
//! (guest, local email account or external provider), persisted through a
//! string key-value store so the session survives restarts.
//!
//! - `storage`: the `KeyValueStore` contract plus file and memory backends
//! - `session`: session model, id generation and the `SessionStore`
//! - `keys`: storage keys shared with the mobile app
//! - `config`: on-disk configuration and directory resolution

pub mod config;
pub mod error;
pub mod keys;
pub mod session;
pub mod storage;

pub use config::Config;
pub use error::{SessionError, StorageError};
pub use session::{Provider, Session, SessionData, SessionPatch, SessionState, SessionStore};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StoredValue};
