//! District court lookup table.
//!
//! The registry is a JSON array of `{code, name, identifier}` objects, where
//! `identifier` is the portal's path segment for that court
//! (e.g. `kathmandudc`). Order in the file is the run order.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::CoreError;

/// A district court as listed in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct District {
    pub code: String,
    pub name: String,
    pub identifier: String,
}

impl District {
    /// Directory name for this district's output: `{code}_{name}`.
    pub fn output_dir_name(&self) -> String {
        format!("{}_{}", self.code, self.name)
    }
}

/// The fixed set of district courts for a run, in file order.
#[derive(Debug, Clone)]
pub struct DistrictRegistry {
    districts: Vec<District>,
}

impl DistrictRegistry {
    /// Load the registry from a JSON file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path).map_err(|e| CoreError::registry(path, e))?;
        let registry = Self::from_json(&raw).map_err(|e| match e {
            CoreError::RegistryLoad { reason, .. } => CoreError::registry(path, reason),
            other => other,
        })?;
        info!(path = %path.display(), districts = registry.len(), "loaded district registry");
        Ok(registry)
    }

    /// Parse a registry from JSON text.
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        let districts: Vec<District> =
            serde_json::from_str(raw).map_err(|e| CoreError::registry("<inline>", e))?;
        Self::new(districts)
    }

    /// Build a registry, rejecting empty tables, blank fields and duplicate codes.
    pub fn new(districts: Vec<District>) -> Result<Self, CoreError> {
        if districts.is_empty() {
            return Err(CoreError::registry("<inline>", "registry has no districts"));
        }
        let mut seen = HashSet::new();
        for d in &districts {
            if d.code.trim().is_empty() || d.name.trim().is_empty() || d.identifier.trim().is_empty()
            {
                return Err(CoreError::registry(
                    "<inline>",
                    format!("district entry has a blank field: {d:?}"),
                ));
            }
            if !seen.insert(d.code.as_str()) {
                return Err(CoreError::registry(
                    "<inline>",
                    format!("duplicate district code {:?}", d.code),
                ));
            }
        }
        Ok(Self { districts })
    }

    /// All districts in registry order.
    pub fn all(&self) -> &[District] {
        &self.districts
    }

    pub fn get(&self, code: &str) -> Option<&District> {
        self.districts.iter().find(|d| d.code == code)
    }

    pub fn len(&self) -> usize {
        self.districts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }

    /// Keep only the given codes, preserving registry order.
    ///
    /// An empty `codes` slice keeps everything. Unknown codes are an error so
    /// a typo on the command line does not silently run nothing.
    pub fn restrict_to(self, codes: &[String]) -> Result<Self, CoreError> {
        if codes.is_empty() {
            return Ok(self);
        }
        if let Some(unknown) = codes.iter().find(|c| self.get(c).is_none()) {
            return Err(CoreError::registry(
                "<filter>",
                format!("unknown district code {unknown:?}"),
            ));
        }
        let districts = self
            .districts
            .into_iter()
            .filter(|d| codes.contains(&d.code))
            .collect();
        Ok(Self { districts })
    }

    /// Keep only the first district (debug runs).
    pub fn first_only(mut self) -> Self {
        self.districts.truncate(1);
        self
    }
}
