// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! The Profile Management Representation: the desired set of Profiles.

use std::collections::HashMap;
use std::fmt;

use super::error::{SchemaError, SchemaViolation};
use super::types::Profile;

/// Ordered collection of uniquely named Profiles.
///
/// Iteration follows insertion order so that plans and logs are
/// reproducible across runs.
#[derive(Debug, Clone, Default)]
pub struct ProfilesManagementRepresentation {
    profiles: Vec<Profile>,
    index: HashMap<String, usize>,
}

/// Short alias used across the crate.
pub type Pmr = ProfilesManagementRepresentation;

impl ProfilesManagementRepresentation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a PMR from profiles in order.
    ///
    /// # Errors
    /// Returns a `SchemaError` at `profiles[i].name` on a duplicate name.
    pub fn from_profiles(profiles: impl IntoIterator<Item = Profile>) -> Result<Self, SchemaError> {
        let mut pmr = Self::new();
        for (i, profile) in profiles.into_iter().enumerate() {
            pmr.add_profile(profile)
                .map_err(|e| e.within(&format!("profiles[{}]", i)))?;
        }
        Ok(pmr)
    }

    /// Add a Profile, rejecting a name that is already present.
    pub fn add_profile(&mut self, profile: Profile) -> Result<(), SchemaError> {
        if self.index.contains_key(profile.name()) {
            return Err(SchemaError::new(
                "name",
                SchemaViolation::DuplicateProfile(profile.name().to_string()),
            ));
        }
        self.index
            .insert(profile.name().to_string(), self.profiles.len());
        self.profiles.push(profile);
        Ok(())
    }

    /// Remove a Profile by name, returning it if it was present.
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        let position = self.index.remove(name)?;
        let removed = self.profiles.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    /// Look up a Profile. Absence is a normal outcome, not an error.
    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.index.get(name).map(|&i| &self.profiles[i])
    }

    pub fn has_profile(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.name())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl<'a> IntoIterator for &'a ProfilesManagementRepresentation {
    type Item = &'a Profile;
    type IntoIter = std::slice::Iter<'a, Profile>;

    fn into_iter(self) -> Self::IntoIter {
        self.profiles.iter()
    }
}

impl fmt::Display for ProfilesManagementRepresentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Profiles:")?;
        for profile in &self.profiles {
            write!(f, "-  {}: ", profile.name())?;
            for c in profile.contributors() {
                write!(f, "({}, {}) ", c.name, c.role)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "representation_tests.rs"]
mod tests;
