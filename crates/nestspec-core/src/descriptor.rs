//! Test identity
//!
//! Names are only unique by path, so a test is identified by the ordered list of
//! context names from the root down to the test itself.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used by the `Display` impl and the default run configuration
pub const DEFAULT_PATH_SEPARATOR: &str = " / ";

/// Identity of a context or leaf test: every name from the root to the node
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TestDescriptor {
    path: Vec<String>,
}

impl TestDescriptor {
    /// Descriptor of a root context
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            path: vec![name.into()],
        }
    }

    /// Descriptor of a node nested directly below this one
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend(self.path.iter().cloned());
        path.push(name.into());
        Self { path }
    }

    /// Build a descriptor from an explicit path
    pub fn from_path<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
        }
    }

    /// All names from the root to this node
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The node's own name, empty for the empty descriptor
    pub fn name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or_default()
    }

    /// Number of names in the path
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Descriptor of the enclosing context, if any
    pub fn parent(&self) -> Option<Self> {
        match self.path.split_last() {
            Some((_, rest)) if !rest.is_empty() => Some(Self {
                path: rest.to_vec(),
            }),
            _ => None,
        }
    }

    /// Join the full path with `separator`
    pub fn joined(&self, separator: &str) -> String {
        self.path.join(separator)
    }

    /// Substring match against the path joined with `separator`
    pub fn matches(&self, filter: &str, separator: &str) -> bool {
        self.joined(separator).contains(filter)
    }

    /// A file-name-safe name derived from the full path.
    ///
    /// Approval/snapshot tooling stores one file per test; the joined path keeps
    /// same-named tests in different contexts apart.
    pub fn snapshot_name(&self) -> String {
        self.path
            .iter()
            .map(|segment| {
                segment
                    .chars()
                    .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for TestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined(DEFAULT_PATH_SEPARATOR))
    }
}
