use crate::models::feature::FeatureCode;
use crate::models::principal::Role;
use std::collections::{HashMap, HashSet};

/// Role -> default feature grants, used when a principal has no explicit
/// feature list. Built once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct RoleTable {
    grants: HashMap<Role, HashSet<FeatureCode>>,
}

impl RoleTable {
    pub fn empty() -> Self {
        Self {
            grants: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut table = Self::empty();
        for (role, features) in DEFAULT_GRANTS {
            table.grants.insert(
                Role::parse(role),
                features.iter().map(|code| FeatureCode::new(*code)).collect(),
            );
        }
        table
    }

    /// Defaults with per-role overrides applied. An override replaces the
    /// whole grant set of its role.
    pub fn with_overrides(overrides: &HashMap<String, Vec<String>>) -> Self {
        let mut table = Self::with_defaults();
        for (role, features) in overrides {
            table.grants.insert(
                Role::parse(role),
                features.iter().map(|code| FeatureCode::new(code.trim())).collect(),
            );
        }
        table
    }

    pub fn grants(&self, role: &Role, feature: &FeatureCode) -> bool {
        self.grants
            .get(role)
            .map(|features| features.contains(feature))
            .unwrap_or(false)
    }
}

impl Default for RoleTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// No super_admin entry: the evaluator grants it everything before reaching this table.
const DEFAULT_GRANTS: &[(&str, &[&str])] = &[
    (
        "admin",
        &[
            "dashboard",
            "patients",
            "appointments",
            "pathology",
            "radiology",
            "dna_sequencing",
            "pharmacy",
            "billing",
            "reports",
            "practice_management",
            "telemedicine",
            "user_management",
            "settings",
        ],
    ),
    (
        "doctor",
        &[
            "dashboard",
            "patients",
            "appointments",
            "pathology",
            "radiology",
            "dna_sequencing",
            "reports",
            "telemedicine",
        ],
    ),
    ("nurse", &["dashboard", "patients", "appointments"]),
    ("patient", &["dashboard", "appointments", "telemedicine"]),
    ("pharmacist", &["dashboard", "pharmacy"]),
    ("lab_technician", &["dashboard", "pathology", "dna_sequencing"]),
    ("radiologist", &["dashboard", "patients", "radiology"]),
    ("receptionist", &["dashboard", "patients", "appointments", "billing"]),
];
