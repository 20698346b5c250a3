//! The specification registry: one `VersionTables` per supported HL7 version.
//!
//! Definition JSON files are embedded into the crate at compile time and
//! deserialized once, eagerly, when the registry is constructed. A version
//! whose definition fails to deserialize is logged and skipped — it never
//! aborts loading of the other versions.

use std::collections::HashMap;

use crate::VersionTables;

/// Embedded definition files, oldest version first.
const EMBEDDED: &[(&str, &str)] = &[
    ("2.3.1", include_str!("../data/v2_3_1.json")),
    ("2.4", include_str!("../data/v2_4.json")),
    ("2.5", include_str!("../data/v2_5.json")),
    ("2.5.1", include_str!("../data/v2_5_1.json")),
];

/// Lookup of an HL7 version absent from the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported HL7 version: {0:?}")]
pub struct UnsupportedVersion(pub String);

/// Read-only registry of specification tables, keyed by version string.
///
/// Loading happens once per session; the registry is safe for concurrent
/// reads afterwards and is typically shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Registry {
    versions: HashMap<String, VersionTables>,
}

impl Registry {
    /// Load every embedded version definition.
    ///
    /// Per-version failures are isolated: a definition that does not
    /// deserialize is logged at `warn` and left out, and looking it up
    /// later yields [`UnsupportedVersion`].
    pub fn load_embedded() -> Self {
        let mut versions = HashMap::new();
        for (version, json) in EMBEDDED {
            match serde_json::from_str::<VersionTables>(json) {
                Ok(tables) => {
                    versions.insert(tables.version.clone(), tables);
                }
                Err(e) => {
                    log::warn!("skipping embedded HL7 v{version} definition: {e}");
                }
            }
        }
        Self { versions }
    }

    /// Build a registry from pre-constructed tables (test support and
    /// callers with out-of-tree definitions).
    pub fn from_tables(tables: impl IntoIterator<Item = VersionTables>) -> Self {
        Self {
            versions: tables
                .into_iter()
                .map(|t| (t.version.clone(), t))
                .collect(),
        }
    }

    /// Tables for a version, or `None` if the version is not loaded.
    pub fn tables_for(&self, version: &str) -> Option<&VersionTables> {
        self.versions.get(version)
    }

    /// Tables for a version, surfacing the miss as an error.
    pub fn require(&self, version: &str) -> Result<&VersionTables, UnsupportedVersion> {
        self.tables_for(version)
            .ok_or_else(|| UnsupportedVersion(version.to_string()))
    }

    /// The newest loaded version by lexicographic-numeric order, if any.
    ///
    /// Used as the fallback grammar when building a NAK for a message whose
    /// own version could not be determined.
    pub fn newest_version(&self) -> Option<&str> {
        self.versions
            .keys()
            .max_by(|a, b| version_key(a).cmp(&version_key(b)))
            .map(String::as_str)
    }

    /// Iterate over the loaded version strings in unspecified order.
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }

    /// Number of loaded versions.
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Whether no version loaded at all.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Split `"2.5.1"` into numeric parts for ordering; non-numeric parts sort low.
fn version_key(version: &str) -> Vec<u32> {
    version
        .split('.')
        .map(|p| p.parse::<u32>().unwrap_or(0))
        .collect()
}
