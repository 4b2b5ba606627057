//! Hierarchical labels.

use crate::error::{Error, Result};
use std::fmt;

/// Separator between components in the byte encoding. Components may not
/// contain it (or any byte below 0x20), which keeps component-wise ordering
/// identical to byte-encoding ordering.
pub const LABEL_SEPARATOR: u8 = 0x1F;

/// A composite label: an ordered sequence of path components.
///
/// The byte encoding (components joined by [`LABEL_SEPARATOR`]) sorts a
/// parent strictly before all of its descendants, which segment merging
/// relies on to see parents before children.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FacetLabel {
    components: Vec<String>,
}

impl FacetLabel {
    /// The empty (root) label.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a label from path components. Empty components or components
    /// containing control characters are rejected.
    pub fn new<S: AsRef<str>>(components: &[S]) -> Result<Self> {
        let mut owned = Vec::with_capacity(components.len());
        for component in components {
            let component = component.as_ref();
            if component.is_empty() {
                return Err(Error::InvalidArgument(
                    "label components may not be empty".to_string(),
                ));
            }
            if component.bytes().any(|b| b < 0x20) {
                return Err(Error::InvalidArgument(format!(
                    "label component {component:?} contains a control character"
                )));
            }
            owned.push(component.to_string());
        }
        Ok(Self { components: owned })
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Number of path components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// The label one level up, or None at the root.
    pub fn parent(&self) -> Option<FacetLabel> {
        if self.components.is_empty() {
            return None;
        }
        Some(Self {
            components: self.components[..self.components.len() - 1].to_vec(),
        })
    }

    /// This label extended by one component.
    pub fn child(&self, component: &str) -> Result<FacetLabel> {
        let mut components = self.components.clone();
        let validated = Self::new(&[component])?;
        components.extend(validated.components);
        Ok(Self { components })
    }

    /// Canonical byte encoding used as an automaton key.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                bytes.push(LABEL_SEPARATOR);
            }
            bytes.extend_from_slice(component.as_bytes());
        }
        bytes
    }

    /// Decode a label from its canonical byte encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Ok(Self::root());
        }
        let mut components = Vec::new();
        for piece in bytes.split(|&b| b == LABEL_SEPARATOR) {
            let component = std::str::from_utf8(piece)
                .map_err(|_| Error::corrupt(0, "label component is not utf-8"))?;
            if component.is_empty() {
                return Err(Error::corrupt(0, "empty label component"));
            }
            components.push(component.to_string());
        }
        Ok(Self { components })
    }
}

impl fmt::Display for FacetLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.components.join("/"))
    }
}
