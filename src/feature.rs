use std::collections::HashMap;

/// Prefix shared by every synthetic edge-feature name.
///
/// Observation features may not contain whitespace, so no real feature can
/// start with this prefix.
pub(crate) const EDGE_PREFIX: &str = "->\t";
const EDGE_SEPARATOR: &str = "\t->\t";

/// A model parameter: a label paired with a feature name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Feature {
    /// Label ID
    pub label: u32,
    /// Feature name ID (observation feature or edge marker)
    pub name: u32,
}

impl Feature {
    pub fn new(label: u32, name: u32) -> Self {
        Self { label, name }
    }
}

/// Interning map from `(label, feature name)` pairs to dense parameter indices
#[derive(Debug, Clone, Default)]
pub struct FeatureBag {
    ids: HashMap<Feature, u32>,
    features: Vec<Feature>,
}

impl FeatureBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Get or allocate the parameter index of a pair
    pub fn get_or_insert(&mut self, feature: Feature) -> u32 {
        if let Some(&id) = self.ids.get(&feature) {
            return id;
        }
        let id = self.features.len() as u32;
        self.ids.insert(feature, id);
        self.features.push(feature);
        id
    }

    /// Look up the parameter index of a pair
    pub fn get(&self, feature: Feature) -> Option<u32> {
        self.ids.get(&feature).copied()
    }

    /// Resolve a parameter index to its pair
    ///
    /// # Panics
    ///
    /// Panics if `id` was never allocated.
    pub fn feature(&self, id: u32) -> Feature {
        self.features[id as usize]
    }

    /// Iterate over `(parameter index, feature)` in allocation order
    pub fn iter(&self) -> impl Iterator<Item = (u32, Feature)> + '_ {
        self.features
            .iter()
            .enumerate()
            .map(|(id, &f)| (id as u32, f))
    }
}

/// Build the edge-feature name for the given predecessor labels, oldest first
pub(crate) fn edge_marker<'a, I>(labels: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut name = String::from(EDGE_PREFIX);
    for (i, label) in labels.into_iter().enumerate() {
        if i > 0 {
            name.push_str(EDGE_SEPARATOR);
        }
        name.push_str(label);
    }
    name
}

/// Predecessor labels encoded by an edge-feature name, `None` for observation
/// features
pub(crate) fn edge_labels(name: &str) -> Option<impl Iterator<Item = &str> + '_> {
    let rest = name.strip_prefix(EDGE_PREFIX)?;
    Some(rest.split(EDGE_SEPARATOR))
}

/// Number of predecessor labels encoded by an edge-feature name
pub(crate) fn edge_arity(name: &str) -> Option<usize> {
    edge_labels(name).map(Iterator::count)
}
