//! Registry resolving manufacturer tags to platform definitions.

use std::collections::HashMap;
use std::sync::Arc;

use super::definition::PlatformDefinition;
use super::vendors;
use crate::error::{PlatformError, Result};

/// Built-in platforms, compiled in.
const BUILTIN: &[fn() -> PlatformDefinition] = &[
    vendors::cisco::platform,
    vendors::arista::platform,
    vendors::dell::platform,
    vendors::fortinet::platform,
    vendors::h3c::platform,
    vendors::solace::platform,
];

/// Registry for platform definitions.
///
/// Tags (names and aliases) are matched case-insensitively.
#[derive(Debug, Default)]
pub struct PlatformRegistry {
    platforms: Vec<Arc<PlatformDefinition>>,
    tags: HashMap<String, usize>,
}

impl PlatformRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in platform.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for platform in BUILTIN {
            // Built-in tags are distinct.
            let _ = registry.register(platform());
        }
        registry
    }

    /// Register a platform definition under its name and aliases.
    pub fn register(&mut self, platform: PlatformDefinition) -> Result<()> {
        let tags: Vec<String> = std::iter::once(&platform.name)
            .chain(&platform.aliases)
            .map(|tag| tag.to_lowercase())
            .collect();

        if platform.actions.is_empty() {
            return Err(PlatformError::InvalidDefinition {
                message: format!("platform '{}' defines no actions", platform.name),
            }
            .into());
        }
        if let Some(taken) = tags.iter().find(|tag| self.tags.contains_key(*tag)) {
            return Err(PlatformError::AlreadyRegistered { name: taken.clone() }.into());
        }

        let index = self.platforms.len();
        self.platforms.push(Arc::new(platform));
        self.tags.extend(tags.into_iter().map(|tag| (tag, index)));
        Ok(())
    }

    /// Get a platform by tag.
    pub fn get(&self, tag: &str) -> Option<&Arc<PlatformDefinition>> {
        self.tags
            .get(&tag.to_lowercase())
            .map(|&index| &self.platforms[index])
    }

    /// Resolve a device's manufacturer tag.
    pub fn resolve(&self, manufacturer: &str) -> Result<Arc<PlatformDefinition>> {
        self.get(manufacturer).cloned().ok_or_else(|| {
            PlatformError::UnknownManufacturer {
                name: manufacturer.to_string(),
            }
            .into()
        })
    }

    /// Check if a tag is registered.
    pub fn contains(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }

    /// Canonical names of all registered platforms, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.platforms.iter().map(|p| p.name.as_str())
    }
}
