use chrono::Utc;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::keys;
use crate::storage::{read_json, KeyValueStore, StoredValue};

use super::ids;
use super::model::{Session, SessionData, SessionPatch, DEFAULT_GUEST_NAME};

/// Snapshot of what the UI needs to know about the session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub session: Option<Session>,
    /// True from construction until `restore_session` finishes
    pub is_loading: bool,
    pub is_first_launch: bool,
}

impl SessionState {
    fn initial() -> Self {
        Self {
            session: None,
            is_loading: true,
            is_first_launch: true,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_guest_mode(&self) -> bool {
        self.session.as_ref().map(|s| s.is_guest).unwrap_or(false)
    }
}

/// Serialized with the derived flags included, in the shape the app consumes
impl Serialize for SessionState {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        let mut state = serializer.serialize_struct("SessionState", 5)?;
        state.serialize_field("session", &self.session)?;
        state.serialize_field("isLoading", &self.is_loading)?;
        state.serialize_field("isFirstLaunch", &self.is_first_launch)?;
        state.serialize_field("isGuestMode", &self.is_guest_mode())?;
        state.serialize_field("isAuthenticated", &self.is_authenticated())?;
        state.end()
    }
}

/// Single authority for who is signed in.
///
/// Construct once at startup and pass by reference. Every operation takes
/// `&mut self`, so lifecycle operations never interleave. In-memory state is
/// only changed after the matching storage write succeeded.
pub struct SessionStore<S> {
    store: S,
    state: watch::Sender<SessionState>,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        let (state, _) = watch::channel(SessionState::initial());
        Self { store, state }
    }

    /// Current state snapshot
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn active_session(&self) -> Option<Session> {
        self.state.borrow().session.clone()
    }

    /// Receiver notified after every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Load the persisted session on startup.
    ///
    /// The primary record wins; otherwise a stored guest record is restored
    /// as a guest. Unreadable or malformed records count as absent, so this
    /// never fails.
    pub async fn restore_session(&mut self) -> SessionState {
        debug!("Checking for stored session");

        let has_launched = match self.store.get(keys::HAS_LAUNCHED).await {
            Ok(flag) => flag.is_some_and(|v| !v.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read launch flag");
                false
            }
        };

        let session = match self.read_session(keys::USER).await {
            Some(session) => Some(session),
            None => self.read_session(keys::GUEST_USER).await.map(|mut session| {
                session.is_guest = true;
                session
            }),
        };

        match &session {
            Some(s) => info!(user = s.label(), guest = s.is_guest, "Session restored"),
            None => debug!("No stored session"),
        }

        self.state.send_modify(|state| {
            state.session = session;
            state.is_loading = false;
            if has_launched {
                state.is_first_launch = false;
            }
        });
        self.state()
    }

    async fn read_session(&self, key: &str) -> Option<Session> {
        match read_json::<_, Session>(&self.store, key).await {
            StoredValue::Found(session) => Some(session),
            StoredValue::Absent => None,
            StoredValue::Malformed(e) => {
                warn!(key, error = %e, "Ignoring malformed stored session");
                None
            }
            StoredValue::Unavailable(e) => {
                warn!(key, error = %e, "Failed to read stored session");
                None
            }
        }
    }

    /// Stamp `data` with the sign-in time, persist it and make it the active
    /// session, replacing any previous one.
    ///
    /// The primary record is written last, so a failed sign-in leaves the
    /// previous primary record on disk.
    pub async fn sign_in(&mut self, data: SessionData) -> Result<Session, SessionError> {
        let session = Session::from_data(data, Utc::now());
        info!(user = session.label(), provider = %session.provider, "Signing in");

        let record = serde_json::to_string(&session)?;
        self.store
            .multi_set(&[
                (keys::HAS_LAUNCHED, keys::LAUNCHED_VALUE.to_string()),
                (keys::USER, record),
            ])
            .await?;

        self.activate(session.clone());
        Ok(session)
    }

    /// Start a guest session under a freshly generated id. The record is
    /// also written under the guest key.
    pub async fn sign_in_as_guest(&mut self, name: Option<&str>) -> Result<Session, SessionError> {
        let now = Utc::now();
        let data = SessionData::guest(ids::guest_id(now), name.unwrap_or(DEFAULT_GUEST_NAME));
        let session = Session::from_data(data, now);
        info!(user = %session.name, id = %session.id, "Signing in as guest");

        let record = serde_json::to_string(&session)?;
        self.store
            .multi_set(&[
                (keys::HAS_LAUNCHED, keys::LAUNCHED_VALUE.to_string()),
                (keys::GUEST_USER, record.clone()),
                (keys::USER, record),
            ])
            .await?;

        self.activate(session.clone());
        Ok(session)
    }

    /// Local sign-in. The password is accepted as-is: there is no backend
    /// to check it against and it is never stored.
    pub async fn sign_in_with_email(
        &mut self,
        email: &str,
        _password: &str,
    ) -> Result<Session, SessionError> {
        debug!(email, "Signing in locally");
        self.sign_in(SessionData::local(email, None, Utc::now())).await
    }

    /// Local sign-up; same as [`Self::sign_in_with_email`] with an optional
    /// display name.
    pub async fn sign_up_with_email(
        &mut self,
        email: &str,
        _password: &str,
        name: Option<&str>,
    ) -> Result<Session, SessionError> {
        debug!(email, "Signing up locally");
        self.sign_in(SessionData::local(email, name, Utc::now())).await
    }

    /// Clear the session. Storage failures are retried once and then only
    /// logged; the in-memory session is always cleared.
    pub async fn sign_out(&mut self) {
        info!("Signing out");
        let session_keys = [keys::USER, keys::GUEST_USER];

        if let Err(e) = self.store.multi_remove(&session_keys).await {
            warn!(error = %e, "Failed to clear stored session, retrying");
            if let Err(e) = self.store.multi_remove(&session_keys).await {
                warn!(error = %e, "Stored session could not be cleared");
            }
        }

        self.state.send_modify(|state| state.session = None);
    }

    /// Merge `patch` into the active session and persist it.
    ///
    /// Fails with [`SessionError::NoActiveSession`] when nobody is signed in.
    /// Nothing changes in memory unless the write succeeded.
    pub async fn update_user(&mut self, patch: SessionPatch) -> Result<Session, SessionError> {
        let current = self.active_session().ok_or(SessionError::NoActiveSession)?;
        let updated = current.merged(patch)?;
        let record = serde_json::to_string(&updated)?;

        if updated.is_guest {
            self.store
                .multi_set(&[(keys::GUEST_USER, record.clone()), (keys::USER, record)])
                .await?;
        } else {
            self.store.set(keys::USER, &record).await?;
        }

        debug!(user = updated.label(), "Session updated");
        self.state
            .send_modify(|state| state.session = Some(updated.clone()));
        Ok(updated)
    }

    /// Remove the session and all of the user's application data.
    pub async fn delete_account(&mut self) -> Result<(), SessionError> {
        info!("Deleting account data");
        self.store.multi_remove(&keys::account_keys()).await?;
        self.state.send_modify(|state| state.session = None);
        Ok(())
    }

    /// Record that onboarding is done. A failed write is logged only.
    pub async fn complete_onboarding(&mut self) {
        if let Err(e) = self
            .store
            .set(keys::HAS_LAUNCHED, keys::LAUNCHED_VALUE)
            .await
        {
            warn!(error = %e, "Failed to persist onboarding flag");
        }
        self.state.send_modify(|state| state.is_first_launch = false);
    }

    fn activate(&mut self, session: Session) {
        self.state.send_modify(|state| {
            state.session = Some(session);
            state.is_first_launch = false;
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
