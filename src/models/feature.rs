use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_ICON: &str = "default";
pub const DEFAULT_COLOR: &str = "default";

/// Short string key identifying a gated module, e.g. `radiology`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureCode(String);

impl FeatureCode {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeatureCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FeatureCode {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Catalogue entry for a feature
///
/// `display_name`, `icon` and `color` are presentation only; access decisions
/// look at `code` and `owned_route_prefixes`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDescriptor {
    pub code: FeatureCode,
    pub display_name: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub owned_route_prefixes: Vec<String>,
}

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl FeatureDescriptor {
    pub fn new(
        code: impl Into<FeatureCode>,
        display_name: impl Into<String>,
        icon: impl Into<String>,
        color: impl Into<String>,
        owned_route_prefixes: &[&str],
    ) -> Self {
        Self {
            code: code.into(),
            display_name: display_name.into(),
            icon: icon.into(),
            color: color.into(),
            owned_route_prefixes: owned_route_prefixes.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Descriptor returned for codes the registry does not know
    pub fn placeholder(code: &FeatureCode) -> Self {
        Self {
            code: code.clone(),
            display_name: code.as_str().to_string(),
            icon: DEFAULT_ICON.to_string(),
            color: DEFAULT_COLOR.to_string(),
            owned_route_prefixes: Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.owned_route_prefixes.is_empty()
            && self.icon == DEFAULT_ICON
            && self.color == DEFAULT_COLOR
            && self.display_name == self.code.as_str()
    }
}
