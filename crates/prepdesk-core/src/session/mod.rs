//! Session management for the signed-in user.
//!
//! This module provides:
//! - `Session`, `SessionData`, `SessionPatch`: the persisted user record,
//!   sign-in input and partial profile updates
//! - `SessionStore`: the single authority for who is signed in, kept in
//!   sync with a `KeyValueStore`
//!
//! There is no backend: local email accounts are accepted without any
//! credential check and exist only to partition data on the device.

pub mod ids;
pub mod model;
pub mod store;

pub use model::{Provider, Session, SessionData, SessionPatch};
pub use store::{SessionState, SessionStore};
