//! Component registry and selector resolution.
//!
//! The registry is built once from the loaded component table and
//! self-checks before any selector is parsed: names and aliases are unique
//! (case-insensitively), `all` is reserved, `after`/`supersedes` references
//! resolve, `after` constraints agree with declaration order, and no two
//! components deploy different payloads to one destination unless one
//! supersedes the other.
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use crate::config::components::{Action, Component};
use crate::error::{RegistryError, UsageError};

/// Meta-selector expanding to every component that is not opt-in.
pub const ALL: &str = "all";

/// Validated, immutable set of components in declaration order.
#[derive(Debug)]
pub struct Registry {
    components: Vec<Component>,
    categories: Vec<String>,
    /// Lowercased name or alias → index into `components`.
    index: HashMap<String, usize>,
}

impl Registry {
    /// Build and self-check a registry.
    ///
    /// # Errors
    ///
    /// Returns the first [`RegistryError`] found.
    pub fn new(components: Vec<Component>, categories: Vec<String>) -> Result<Self, RegistryError> {
        let mut index = HashMap::new();
        for (i, component) in components.iter().enumerate() {
            for selector in component.selectors() {
                let key = selector.trim().to_lowercase();
                if key == ALL {
                    return Err(RegistryError::ReservedName {
                        name: selector.to_string(),
                    });
                }
                if index.insert(key, i).is_some() {
                    return Err(RegistryError::DuplicateName {
                        name: selector.to_string(),
                    });
                }
            }
        }

        let registry = Self {
            components,
            categories,
            index,
        };
        registry.check_references()?;
        registry.check_destinations()?;
        Ok(registry)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.index.get(&name.trim().to_lowercase()).copied()
    }

    fn check_references(&self) -> Result<(), RegistryError> {
        for (i, component) in self.components.iter().enumerate() {
            for reference in component.after.iter().chain(&component.supersedes) {
                if self.position(reference).is_none() {
                    return Err(RegistryError::UnknownReference {
                        component: component.name.clone(),
                        reference: reference.clone(),
                    });
                }
            }
            for after in &component.after {
                if self.position(after).is_some_and(|j| j >= i) {
                    return Err(RegistryError::OrderViolation {
                        component: component.name.clone(),
                        after: after.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn supersedes(&self, a: usize, b: usize) -> bool {
        self.components.get(a).is_some_and(|c| {
            c.supersedes
                .iter()
                .any(|name| self.position(name) == Some(b))
        })
    }

    fn check_destinations(&self) -> Result<(), RegistryError> {
        let mut owners: HashMap<&str, Vec<(usize, &PathBuf)>> = HashMap::new();
        for (i, component) in self.components.iter().enumerate() {
            for action in &component.apply {
                let Action::DeployFile {
                    source,
                    destination,
                } = action
                else {
                    continue;
                };
                let claims = owners.entry(destination.as_str()).or_default();
                for &(j, other) in claims.iter() {
                    if j == i || other == source {
                        continue;
                    }
                    if !self.supersedes(i, j) && !self.supersedes(j, i) {
                        return Err(RegistryError::AmbiguousDestination {
                            destination: destination.clone(),
                            first: self
                                .components
                                .get(j)
                                .map(|c| c.name.clone())
                                .unwrap_or_default(),
                            second: component.name.clone(),
                        });
                    }
                }
                claims.push((i, source));
            }
        }
        Ok(())
    }

    /// Resolve selector tokens to components in declaration order.
    ///
    /// Tokens are trimmed and matched case-insensitively against names and
    /// aliases. `all` adds every non-opt-in component; opt-in components are
    /// only selected by name. Duplicates collapse.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::UnknownSelector`] for the first token that
    /// matches nothing, or [`UsageError::NoSelection`] when no token is given.
    pub fn select<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Vec<&Component>, UsageError> {
        let mut chosen = BTreeSet::new();
        let mut saw_token = false;

        for token in tokens {
            let key = token.as_ref().trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            saw_token = true;
            if key == ALL {
                chosen.extend(
                    self.components
                        .iter()
                        .enumerate()
                        .filter(|(_, c)| !c.opt_in)
                        .map(|(i, _)| i),
                );
                continue;
            }
            let i = self
                .position(&key)
                .ok_or_else(|| UsageError::UnknownSelector {
                    token: token.as_ref().trim().to_string(),
                    valid: self.valid_names().join(", "),
                })?;
            chosen.insert(i);
        }

        if !saw_token {
            return Err(UsageError::NoSelection);
        }
        Ok(chosen
            .into_iter()
            .filter_map(|i| self.components.get(i))
            .collect())
    }

    /// Look up a component by name or alias.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Component> {
        self.position(name).and_then(|i| self.components.get(i))
    }

    /// `all` followed by every canonical name, in declaration order.
    #[must_use]
    pub fn valid_names(&self) -> Vec<&str> {
        std::iter::once(ALL)
            .chain(self.components.iter().map(|c| c.name.as_str()))
            .collect()
    }

    /// Components in declaration order.
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Category display order.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }
}
