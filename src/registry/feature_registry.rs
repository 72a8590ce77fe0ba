use crate::models::feature::{FeatureCode, FeatureDescriptor};
use std::collections::HashMap;

/// Read-only catalogue of feature codes and the route prefixes they own.
///
/// Built once through [`FeatureRegistryBuilder`] and shared behind an `Arc`;
/// there are no mutating methods after `build()`.
#[derive(Debug, Clone)]
pub struct FeatureRegistry {
    descriptors: Vec<FeatureDescriptor>,
    index: HashMap<FeatureCode, usize>,
    /// (normalized prefix, descriptor index), in registration order
    prefixes: Vec<(String, usize)>,
}

#[derive(Debug, Default)]
pub struct FeatureRegistryBuilder {
    descriptors: Vec<FeatureDescriptor>,
}

impl FeatureRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. Registering an existing code replaces the
    /// earlier descriptor in place, keeping its registration position.
    pub fn register(mut self, descriptor: FeatureDescriptor) -> Self {
        match self
            .descriptors
            .iter_mut()
            .find(|existing| existing.code == descriptor.code)
        {
            Some(existing) => *existing = descriptor,
            None => self.descriptors.push(descriptor),
        }
        self
    }

    pub fn register_all<I>(self, descriptors: I) -> Self
    where
        I: IntoIterator<Item = FeatureDescriptor>,
    {
        descriptors.into_iter().fold(self, |builder, d| builder.register(d))
    }

    pub fn build(self) -> FeatureRegistry {
        let mut index = HashMap::with_capacity(self.descriptors.len());
        let mut prefixes = Vec::new();

        for (position, descriptor) in self.descriptors.iter().enumerate() {
            index.insert(descriptor.code.clone(), position);
            for prefix in &descriptor.owned_route_prefixes {
                if !prefix.trim().is_empty() {
                    prefixes.push((normalize_route(prefix), position));
                }
            }
        }

        FeatureRegistry {
            descriptors: self.descriptors,
            index,
            prefixes,
        }
    }
}

impl FeatureRegistry {
    pub fn builder() -> FeatureRegistryBuilder {
        FeatureRegistryBuilder::new()
    }

    /// Registry pre-loaded with the platform's built-in modules
    pub fn with_defaults() -> Self {
        Self::builder().register_all(default_features()).build()
    }

    /// Feature owning `route`, if any.
    ///
    /// Query strings and fragments are ignored. A prefix owns a route when the
    /// route equals it or continues with a `/` right after it, so `/radiology`
    /// owns `/radiology/imaging/123` but not `/radiology-archive`. When several
    /// prefixes own the route the longest one wins; equal lengths resolve to
    /// the feature registered first.
    pub fn lookup_feature_by_route(&self, route: &str) -> Option<&FeatureCode> {
        let route = normalize_route(route);

        let mut best: Option<(usize, usize)> = None;
        for (prefix, position) in &self.prefixes {
            if !owns(prefix, &route) {
                continue;
            }
            match best {
                Some((len, _)) if len >= prefix.len() => {}
                _ => best = Some((prefix.len(), *position)),
            }
        }

        best.map(|(_, position)| &self.descriptors[position].code)
    }

    /// Descriptor for `code`, or a placeholder for unknown codes
    pub fn get_feature_info(&self, code: &FeatureCode) -> FeatureDescriptor {
        self.get(code)
            .cloned()
            .unwrap_or_else(|| FeatureDescriptor::placeholder(code))
    }

    pub fn get(&self, code: &FeatureCode) -> Option<&FeatureDescriptor> {
        self.index.get(code).map(|position| &self.descriptors[*position])
    }

    pub fn contains(&self, code: &FeatureCode) -> bool {
        self.index.contains_key(code)
    }

    /// Descriptors in registration order
    pub fn features(&self) -> &[FeatureDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for FeatureRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn normalize_route(route: &str) -> String {
    let path = route
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim();

    let mut normalized = String::with_capacity(path.len() + 1);
    if !path.starts_with('/') {
        normalized.push('/');
    }
    normalized.push_str(path);

    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

fn owns(prefix: &str, route: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    route == prefix
        || (route.starts_with(prefix) && route.as_bytes().get(prefix.len()) == Some(&b'/'))
}

pub fn default_features() -> Vec<FeatureDescriptor> {
    vec![
        FeatureDescriptor::new("dashboard", "Dashboard", "home", "#2563eb", &["/dashboard"]),
        FeatureDescriptor::new("patients", "Patient Management", "users", "#0ea5e9", &["/patients"]),
        FeatureDescriptor::new(
            "appointments",
            "Appointments",
            "calendar",
            "#14b8a6",
            &["/appointments"],
        ),
        FeatureDescriptor::new("pathology", "Pathology", "flask", "#a855f7", &["/pathology"]),
        FeatureDescriptor::new("radiology", "Radiology", "scan", "#f97316", &["/radiology"]),
        FeatureDescriptor::new(
            "dna_sequencing",
            "DNA Sequencing",
            "dna",
            "#22c55e",
            &["/dna-sequencing"],
        ),
        FeatureDescriptor::new("pharmacy", "Pharmacy", "pill", "#84cc16", &["/pharmacy"]),
        FeatureDescriptor::new("billing", "Billing", "credit-card", "#eab308", &["/billing"]),
        FeatureDescriptor::new("reports", "Reports", "bar-chart", "#64748b", &["/reports"]),
        FeatureDescriptor::new(
            "practice_management",
            "Practice Management",
            "briefcase",
            "#0f766e",
            &["/practice"],
        ),
        FeatureDescriptor::new(
            "telemedicine",
            "Telemedicine",
            "video",
            "#ec4899",
            &["/telemedicine"],
        ),
        FeatureDescriptor::new(
            "user_management",
            "User Management",
            "shield",
            "#ef4444",
            &["/admin/users"],
        ),
        FeatureDescriptor::new("settings", "Settings", "settings", "#475569", &["/settings"]),
    ]
}
