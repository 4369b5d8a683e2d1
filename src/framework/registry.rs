//! # Factory Registry
//!
//! Per-connection map from interface name to [`ServiceFactory`].
//!
//! Lookup is by name; iteration follows registration order, which is what
//! debugging output and [`interface_names`](FactoryRegistry::interface_names)
//! report. Registering a second factory under a name that is already taken
//! replaces the first one (last write wins) but is recorded as a
//! [`RegistrationConflict`]: it is a logic defect in the registering code,
//! even though the program keeps running.

use crate::framework::factory::ServiceFactory;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Record of a duplicate registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationConflict {
    /// The contested interface name.
    pub interface_name: String,
    /// How many factories had been registered under this name before the
    /// one that triggered the conflict (1 for the first duplicate).
    pub previous_registrations: usize,
}

/// Name-keyed factory table with conflict detection.
#[derive(Default)]
pub struct FactoryRegistry {
    factories: IndexMap<String, Arc<dyn ServiceFactory>>,
    registrations: IndexMap<String, usize>,
    conflicts: Vec<RegistrationConflict>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `factory` under its own interface name.
    ///
    /// Returns the conflict record if the name was already taken. The new
    /// factory is installed either way.
    pub fn register(&mut self, factory: Arc<dyn ServiceFactory>) -> Option<RegistrationConflict> {
        let name = factory.interface_name().to_string();
        let count = self.registrations.entry(name.clone()).or_insert(0);
        *count += 1;
        let previous_registrations = *count - 1;

        // IndexMap::insert keeps the original slot, so introspection order
        // stays that of the first registration.
        let replaced = self.factories.insert(name.clone(), factory).is_some();
        if !replaced {
            debug!(interface = %name, "Registered");
            return None;
        }

        warn!(
            interface = %name,
            previous_registrations,
            "Duplicate factory registration; last registration wins"
        );
        let conflict = RegistrationConflict {
            interface_name: name,
            previous_registrations,
        };
        self.conflicts.push(conflict.clone());
        Some(conflict)
    }

    /// Looks up the factory for `interface_name`. Pure lookup.
    pub fn resolve(&self, interface_name: &str) -> Option<Arc<dyn ServiceFactory>> {
        self.factories.get(interface_name).cloned()
    }

    pub fn contains(&self, interface_name: &str) -> bool {
        self.factories.contains_key(interface_name)
    }

    /// Registered interface names, in registration order.
    pub fn interface_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Every duplicate registration seen so far, oldest first.
    pub fn conflicts(&self) -> &[RegistrationConflict] {
        &self.conflicts
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("interfaces", &self.factories.keys().collect::<Vec<_>>())
            .field("conflicts", &self.conflicts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::mock::MockFactory;

    #[test]
    fn test_resolve_registered_and_missing() {
        let mut registry = FactoryRegistry::new();
        let auth = MockFactory::new("Auth");
        assert!(registry.register(auth.shared()).is_none());

        let resolved = registry.resolve("Auth").expect("Auth should resolve");
        assert_eq!(resolved.interface_name(), "Auth");
        assert!(registry.resolve("Storage").is_none());
        assert!(!registry.has_conflicts());
    }

    #[test]
    fn test_duplicate_registration_last_write_wins() {
        let mut registry = FactoryRegistry::new();
        let first = MockFactory::new("Auth");
        let second = MockFactory::new("Auth");
        let second_shared = second.shared();

        registry.register(first.shared());
        let conflict = registry
            .register(second_shared.clone())
            .expect("duplicate should be flagged");

        assert_eq!(conflict.interface_name, "Auth");
        assert_eq!(conflict.previous_registrations, 1);
        assert_eq!(registry.conflicts(), &[conflict]);
        assert_eq!(registry.len(), 1);

        let resolved = registry.resolve("Auth").unwrap();
        assert!(Arc::ptr_eq(&resolved, &second_shared));
    }

    #[test]
    fn test_introspection_keeps_registration_order() {
        let mut registry = FactoryRegistry::new();
        for name in ["Zeta", "Alpha", "Mid"] {
            registry.register(MockFactory::new(name).shared());
        }
        // Re-registering must not move "Zeta" to the back.
        registry.register(MockFactory::new("Zeta").shared());

        let names: Vec<_> = registry.interface_names().collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(registry.conflicts().len(), 1);
    }
}
