use crate::models::feature::FeatureCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Role tag carried by a principal
///
/// Unknown tags are kept verbatim in `Other` so they can be echoed back in
/// denial payloads; they grant nothing through the fallback table.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    SuperAdmin,
    Admin,
    Doctor,
    Nurse,
    Patient,
    Pharmacist,
    LabTechnician,
    Radiologist,
    Receptionist,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
            Role::Patient => "patient",
            Role::Pharmacist => "pharmacist",
            Role::LabTechnician => "lab_technician",
            Role::Radiologist => "radiologist",
            Role::Receptionist => "receptionist",
            Role::Other(tag) => tag,
        }
    }

    pub fn parse(value: &str) -> Self {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "super_admin" | "superadmin" => Role::SuperAdmin,
            "admin" => Role::Admin,
            "doctor" => Role::Doctor,
            "nurse" => Role::Nurse,
            "patient" => Role::Patient,
            "pharmacist" => Role::Pharmacist,
            "lab_technician" => Role::LabTechnician,
            "radiologist" => Role::Radiologist,
            "receptionist" => Role::Receptionist,
            _ => Role::Other(normalized),
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::parse(&value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission-relevant projection of an authenticated user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,
    pub role: Role,
    pub is_superuser: bool,
    /// `None` means "derive from role"
    pub enabled_features: Option<Vec<FeatureCode>>,
}

const ID_KEYS: &[&str] = &["id", "user_id", "userId"];
const ROLE_KEYS: &[&str] = &["role", "user_role", "userRole"];
const SUPERUSER_KEYS: &[&str] = &["is_superuser", "isSuperuser", "is_super_admin", "isSuperAdmin"];
const FEATURE_KEYS: &[&str] = &["enabled_features", "enabledFeatures", "features"];

impl Principal {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            is_superuser: false,
            enabled_features: None,
        }
    }

    pub fn with_superuser(mut self, is_superuser: bool) -> Self {
        self.is_superuser = is_superuser;
        self
    }

    pub fn with_features<I, F>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FeatureCode>,
    {
        self.enabled_features = Some(features.into_iter().map(Into::into).collect());
        self
    }

    /// True for `super_admin` or the independent superuser flag
    pub fn is_all_access(&self) -> bool {
        self.role == Role::SuperAdmin || self.is_superuser
    }

    /// Build a principal from a raw user payload.
    ///
    /// Auth backends and legacy clients disagree on field names
    /// (`is_superuser` / `isSuperuser` / `is_super_admin`, `enabledFeatures` /
    /// `features`, ...). They are reconciled here and nowhere else. Fields with
    /// an unexpected type are treated as absent. Returns `None` when the
    /// payload is not a JSON object.
    pub fn from_raw(raw: &Value) -> Option<Self> {
        let object = raw.as_object()?;

        let id = first_value(object, ID_KEYS)
            .and_then(|value| match value {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_default();

        let role = first_value(object, ROLE_KEYS)
            .and_then(Value::as_str)
            .map(Role::parse)
            .unwrap_or_else(|| Role::Other(String::new()));

        let is_superuser = SUPERUSER_KEYS
            .iter()
            .filter_map(|key| object.get(*key))
            .any(is_truthy);

        let enabled_features = first_value(object, FEATURE_KEYS)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|code| FeatureCode::new(code.trim()))
                    .filter(|code| !code.as_str().is_empty())
                    .collect::<Vec<_>>()
            });

        Some(Self {
            id,
            role,
            is_superuser,
            enabled_features,
        })
    }
}

fn first_value<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    }
}
