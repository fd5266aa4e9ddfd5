use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SessionError;

use super::ids;

/// Display name used when a guest signs in without choosing one
pub const DEFAULT_GUEST_NAME: &str = "Guest User";

/// Fields fixed at sign-in
const IMMUTABLE_FIELDS: [&str; 4] = ["id", "provider", "isGuest", "signedInAt"];

/// Every field with a typed home on `Session`
const TYPED_FIELDS: [&str; 7] = [
    "id",
    "name",
    "email",
    "picture",
    "provider",
    "isGuest",
    "signedInAt",
];

/// Where a session's identity comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Provider {
    Guest,
    Local,
    /// Any sign-in provider other than guest/local, kept verbatim (e.g. `google`)
    External(String),
}

impl Provider {
    pub fn as_str(&self) -> &str {
        match self {
            Provider::Guest => "guest",
            Provider::Local => "local",
            Provider::External(name) => name,
        }
    }
}

impl From<String> for Provider {
    fn from(value: String) -> Self {
        match value.as_str() {
            "guest" => Provider::Guest,
            "local" => Provider::Local,
            _ => Provider::External(value),
        }
    }
}

impl From<Provider> for String {
    fn from(provider: Provider) -> Self {
        match provider {
            Provider::External(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sign-in input: a session before it has been stamped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SessionData {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: Option<String>,
    pub picture: Option<String>,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub provider: Provider,
    /// Provider-specific fields, stored alongside the typed ones
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub extra: Map<String, Value>,
}

impl SessionData {
    pub fn guest(id: String, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            email: None,
            picture: None,
            provider: Provider::Guest,
            extra: Map::new(),
        }
    }

    /// Local-only account keyed on the email. `name` falls back to the part
    /// of the email before `@` when missing or empty.
    pub fn local(email: &str, name: Option<&str>, now: DateTime<Utc>) -> Self {
        let name = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => ids::name_from_email(email),
        };
        let mut extra = Map::new();
        extra.insert("isLocal".to_string(), Value::Bool(true));
        Self {
            id: ids::local_id(email, now),
            name,
            email: Some(email.to_string()),
            picture: None,
            provider: Provider::Local,
            extra,
        }
    }
}

/// The signed-in user, as persisted under the primary session key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: Option<String>,
    pub picture: Option<String>,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub provider: Provider,
    #[serde(rename = "isGuest", default)]
    pub is_guest: bool,
    #[serde(rename = "signedInAt")]
    pub signed_in_at: DateTime<Utc>,
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub extra: Map<String, Value>,
}

impl Session {
    /// Stamp sign-in data. Extra fields that shadow a typed field are dropped.
    pub fn from_data(data: SessionData, signed_in_at: DateTime<Utc>) -> Self {
        let mut extra = data.extra;
        extra.retain(|key, _| !TYPED_FIELDS.contains(&key.as_str()));
        Self {
            is_guest: data.provider == Provider::Guest,
            id: data.id,
            name: data.name,
            email: data.email,
            picture: data.picture,
            provider: data.provider,
            signed_in_at,
            extra,
        }
    }

    /// Email if present, otherwise the display name
    pub fn label(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.name)
    }

    /// Shallow-merge a patch into a copy of this session.
    /// Fails without touching anything if the patch targets an immutable field.
    pub fn merged(&self, patch: SessionPatch) -> Result<Session, SessionError> {
        if let Some(key) = patch
            .extra
            .keys()
            .find(|key| IMMUTABLE_FIELDS.contains(&key.as_str()))
        {
            return Err(SessionError::ImmutableField(key.clone()));
        }

        let mut merged = self.clone();
        for (key, value) in patch.extra {
            match key.as_str() {
                "name" => merged.name = serde_json::from_value(value)?,
                "email" => merged.email = serde_json::from_value(value)?,
                "picture" => merged.picture = serde_json::from_value(value)?,
                _ => {
                    merged.extra.insert(key, value);
                }
            }
        }

        if let Some(name) = patch.name {
            merged.name = name;
        }
        if let Some(email) = patch.email {
            merged.email = email;
        }
        if let Some(picture) = patch.picture {
            merged.picture = picture;
        }
        Ok(merged)
    }
}

/// Partial profile update. `None` leaves a field alone; for `email` and
/// `picture`, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub name: Option<String>,
    pub email: Option<Option<String>>,
    pub picture: Option<Option<String>>,
    pub extra: Map<String, Value>,
}

impl SessionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn email(mut self, email: Option<String>) -> Self {
        self.email = Some(email);
        self
    }

    pub fn picture(mut self, picture: Option<String>) -> Self {
        self.picture = Some(picture);
        self
    }

    /// Set an arbitrary JSON field
    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.picture.is_none() && self.extra.is_empty()
    }
}
