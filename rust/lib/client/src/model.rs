//! Wire model for the marketplace backend.
//!
//! Types here are deserialized straight from response bodies. Loosely
//! shaped server data (notification payloads, user extras) is resolved into
//! typed values once, at this boundary.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

// ── Id ──────────────────────────────────────────────────────────────

/// Opaque identifier. The backend sends integers for users and UUID
/// strings for notifications; both are kept as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(String);

impl Id {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for Id {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Id(s),
            Raw::Number(n) => Id(n.to_string()),
        })
    }
}

fn id_at(raw: &Value, key: &str) -> Option<Id> {
    match raw.get(key)? {
        Value::String(s) if !s.is_empty() => Some(Id(s.clone())),
        Value::Number(n) => Some(Id(n.to_string())),
        _ => None,
    }
}

// ── Role / User ─────────────────────────────────────────────────────

/// Account role. A user whose role is missing or unknown is authenticated
/// but unresolved: they get only the base navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Company,
    Admin,
    #[default]
    #[serde(other)]
    Unresolved,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Company => "company",
            Role::Admin => "admin",
            Role::Unresolved => "unresolved",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "company" => Ok(Role::Company),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}', expected client, company or admin")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Role,
    /// Profile fields this client does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// `/auth/me` body: a bare user, or one wrapped in `user` / `data`.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum UserEnvelope {
    Wrapped { user: User },
    Data { data: User },
    Bare(User),
}

impl UserEnvelope {
    pub(crate) fn into_user(self) -> User {
        match self {
            UserEnvelope::Wrapped { user } | UserEnvelope::Data { data: user } => user,
            UserEnvelope::Bare(user) => user,
        }
    }
}

// ── Auth requests ───────────────────────────────────────────────────

#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub password: String,
    pub password_confirmation: String,
    pub role: Role,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Login / register response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    #[serde(alias = "access_token")]
    pub token: String,
}

// ── Notifications ───────────────────────────────────────────────────

/// A client-side route to navigate to, e.g. `/projects/42`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavTarget(String);

impl NavTarget {
    /// Normalise a link from a payload. Absolute URLs keep only their path,
    /// relative ones get a leading `/`.
    pub fn parse(link: &str) -> Option<Self> {
        let link = link.trim();
        if link.is_empty() {
            return None;
        }
        let path = match link.split_once("://") {
            Some((_, rest)) => rest.find('/').map(|i| &rest[i..]).unwrap_or("/"),
            None => link,
        };
        if path.starts_with('/') {
            Some(Self(path.to_string()))
        } else {
            Some(Self(format!("/{path}")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NavTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Typed notification payload, one variant per category family.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Project {
        project_id: Option<Id>,
        target: Option<NavTarget>,
    },
    Milestone {
        project_id: Option<Id>,
        milestone_id: Option<Id>,
        target: Option<NavTarget>,
    },
    Escrow {
        project_id: Option<Id>,
        target: Option<NavTarget>,
    },
    Dispute {
        dispute_id: Option<Id>,
        target: Option<NavTarget>,
    },
    Company {
        company_id: Option<Id>,
        target: Option<NavTarget>,
    },
    General {
        target: Option<NavTarget>,
    },
}

impl Payload {
    /// Resolve the raw payload for a category.
    ///
    /// An explicit `action_url` / `url` / `link` wins; otherwise the target
    /// is derived from the ids the category carries.
    pub fn resolve(category: &str, raw: &Value) -> Self {
        let explicit = ["action_url", "url", "link"]
            .iter()
            .find_map(|k| raw.get(*k).and_then(Value::as_str))
            .and_then(NavTarget::parse);
        let category = category.to_ascii_lowercase();
        let project_id = id_at(raw, "project_id");
        let derive_project = |pid: &Option<Id>| {
            pid.as_ref()
                .and_then(|id| NavTarget::parse(&format!("/projects/{id}")))
        };

        if category.contains("milestone") {
            let milestone_id = id_at(raw, "milestone_id");
            let target = explicit.or_else(|| match (&project_id, &milestone_id) {
                (Some(p), Some(m)) => NavTarget::parse(&format!("/projects/{p}/milestones/{m}")),
                _ => derive_project(&project_id),
            });
            Payload::Milestone {
                project_id,
                milestone_id,
                target,
            }
        } else if category.contains("dispute") {
            let dispute_id = id_at(raw, "dispute_id");
            let target = explicit.or_else(|| {
                dispute_id
                    .as_ref()
                    .and_then(|id| NavTarget::parse(&format!("/disputes/{id}")))
            });
            Payload::Dispute { dispute_id, target }
        } else if category.contains("escrow") || category.contains("payment") {
            let target = explicit.or_else(|| derive_project(&project_id));
            Payload::Escrow { project_id, target }
        } else if category.contains("project") || category.contains("proposal") {
            let target = explicit.or_else(|| derive_project(&project_id));
            Payload::Project { project_id, target }
        } else if category.contains("company") {
            let company_id = id_at(raw, "company_id");
            let target = explicit.or_else(|| {
                company_id
                    .as_ref()
                    .and_then(|id| NavTarget::parse(&format!("/companies/{id}")))
            });
            Payload::Company { company_id, target }
        } else {
            Payload::General { target: explicit }
        }
    }

    pub fn target(&self) -> Option<&NavTarget> {
        match self {
            Payload::Project { target, .. }
            | Payload::Milestone { target, .. }
            | Payload::Escrow { target, .. }
            | Payload::Dispute { target, .. }
            | Payload::Company { target, .. }
            | Payload::General { target } => target.as_ref(),
        }
    }
}

/// Notification as it travels. Laravel database notifications carry the
/// class name in `type` and the body in `data`; newer endpoints send
/// `category` and `payload`. Either spelling, or both, is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireNotification {
    id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default)]
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireNotification", into = "WireNotification")]
pub struct Notification {
    pub id: Id,
    pub category: String,
    pub title: String,
    pub message: String,
    pub payload: Payload,
    /// Server payload as received, for renderers that show extra fields.
    pub raw_payload: Value,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_unread(&self) -> bool {
        self.read_at.is_none()
    }

    pub fn target(&self) -> Option<&NavTarget> {
        self.payload.target()
    }
}

impl From<WireNotification> for Notification {
    fn from(w: WireNotification) -> Self {
        let category = w.category.or(w.kind).unwrap_or_default();
        let raw_payload = w.payload.or(w.data).unwrap_or(Value::Null);
        Self {
            id: w.id,
            payload: Payload::resolve(&category, &raw_payload),
            category,
            title: w.title,
            message: w.message,
            raw_payload,
            read_at: w.read_at,
            created_at: w.created_at,
        }
    }
}

impl From<Notification> for WireNotification {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            category: Some(n.category),
            kind: None,
            title: n.title,
            message: n.message,
            payload: Some(n.raw_payload),
            data: None,
            read_at: n.read_at,
            created_at: n.created_at,
        }
    }
}

/// Pagination metadata returned with every notification page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: u64,
    #[serde(default)]
    pub from: Option<u64>,
    #[serde(default)]
    pub to: Option<u64>,
}

impl PageMeta {
    /// Metadata for an empty first page.
    pub fn empty(per_page: u32) -> Self {
        Self {
            current_page: 1,
            last_page: 1,
            per_page,
            total: 0,
            from: None,
            to: None,
        }
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.last_page
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPage {
    pub data: Vec<Notification>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCount {
    pub count: u64,
}
