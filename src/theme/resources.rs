use super::Color;
use indexmap::IndexMap;

/// A pre-built set of resources installed and removed as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBundle {
    source: String,
    colors: IndexMap<String, Color>,
}

impl ResourceBundle {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            colors: IndexMap::new(),
        }
    }

    pub fn with_color(mut self, name: &str, color: Color) -> Self {
        self.colors.insert(name.to_string(), color);
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn color(&self, name: &str) -> Option<Color> {
        self.colors.get(name).copied()
    }
}

/// The application-wide resource table the UI binds to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSet {
    colors: IndexMap<String, Color>,
    bundles: Vec<ResourceBundle>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_color(&mut self, name: &str, color: Color) {
        self.colors.insert(name.to_string(), color);
    }

    /// Looks up `name` in the top-level colors, then in the bundles newest first.
    pub fn color(&self, name: &str) -> Option<Color> {
        self.colors
            .get(name)
            .copied()
            .or_else(|| self.bundles.iter().rev().find_map(|v| v.color(name)))
    }

    pub fn colors(&self) -> impl Iterator<Item = (&str, Color)> {
        self.colors.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn bundles(&self) -> &[ResourceBundle] {
        &self.bundles
    }

    pub fn add_bundle(&mut self, bundle: ResourceBundle) {
        self.bundles.push(bundle);
    }

    /// Removes every bundle whose source matches; returns how many were removed.
    pub fn remove_bundles<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&ResourceBundle) -> bool,
    {
        let len = self.bundles.len();
        self.bundles.retain(|v| !predicate(v));
        len - self.bundles.len()
    }
}
