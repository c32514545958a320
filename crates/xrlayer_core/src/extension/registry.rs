//! Capability policy advertised and enforced by this layer.
//!
//! # Responsibility
//! - Hold the advertised extension table and the implicit/blocked lists.
//! - Describe the layer itself (name, description, versions).
//!
//! # Invariants
//! - Lists are immutable once the registry is built.
//! - Every name is an ASCII identifier that fits the ABI name buffer.
//! - No name is both required-implicit and blocked.

use crate::abi::{make_version, version_patch, CURRENT_API_VERSION, MAX_EXTENSION_NAME_SIZE};
use crate::config::LayerConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Name the loader must put at the head of our chain entry.
pub const LAYER_NAME: &str = "XR_APILAYER_NOVENDOR_template";
pub const LAYER_DESCRIPTION: &str = "An API layer template";
pub const LAYER_VERSION: u32 = 1;

static EXTENSION_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("valid extension name regex"));

/// One advertised extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionEntry {
    pub name: String,
    pub version: u32,
}

impl ExtensionEntry {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

/// Identity reported through layer-properties enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerDescriptor {
    pub name: String,
    pub description: String,
    pub layer_version: u32,
    pub spec_version: u64,
}

impl LayerDescriptor {
    /// Descriptor compiled into this build.
    pub fn builtin() -> Self {
        Self {
            name: LAYER_NAME.to_string(),
            description: LAYER_DESCRIPTION.to_string(),
            layer_version: LAYER_VERSION,
            spec_version: make_version(1, 0, version_patch(CURRENT_API_VERSION)),
        }
    }
}

/// Advertised, implicit and blocked capability lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapabilityRegistry {
    advertised: Vec<ExtensionEntry>,
    required_implicit: Vec<String>,
    blocked: Vec<String>,
}

impl CapabilityRegistry {
    /// Builds a registry after validating every name.
    pub fn new(
        advertised: Vec<ExtensionEntry>,
        required_implicit: Vec<String>,
        blocked: Vec<String>,
    ) -> Result<Self, RegistryError> {
        let mut seen = BTreeSet::new();
        for entry in &advertised {
            validate_name(&entry.name)?;
            if !seen.insert(entry.name.as_str()) {
                return Err(RegistryError::DuplicateAdvertised(entry.name.clone()));
            }
        }
        for name in required_implicit.iter().chain(blocked.iter()) {
            validate_name(name)?;
        }
        // A forced name that is also stripped would reach the next link anyway.
        if let Some(name) = required_implicit.iter().find(|name| blocked.contains(*name)) {
            return Err(RegistryError::ImplicitAndBlocked(name.clone()));
        }

        Ok(Self {
            advertised,
            required_implicit,
            blocked,
        })
    }

    /// Registry compiled into this build: nothing advertised, required or blocked.
    pub fn builtin() -> Self {
        Self::default()
    }

    pub fn from_config(config: &LayerConfig) -> Result<Self, RegistryError> {
        Self::new(
            config.advertised_extensions.clone(),
            config.implicit_extensions.clone(),
            config.blocked_extensions.clone(),
        )
    }

    pub fn advertised(&self) -> &[ExtensionEntry] {
        &self.advertised
    }

    pub fn required_implicit(&self) -> &[String] {
        &self.required_implicit
    }

    pub fn blocked(&self) -> &[String] {
        &self.blocked
    }

    pub fn is_blocked(&self, name: &[u8]) -> bool {
        self.blocked.iter().any(|blocked| blocked.as_bytes() == name)
    }
}

fn validate_name(name: &str) -> Result<(), RegistryError> {
    if name.is_empty() {
        return Err(RegistryError::EmptyName);
    }
    if name.len() >= MAX_EXTENSION_NAME_SIZE {
        return Err(RegistryError::NameTooLong(name.to_string()));
    }
    if !EXTENSION_NAME_RE.is_match(name) {
        return Err(RegistryError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Registry construction errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    EmptyName,
    InvalidName(String),
    NameTooLong(String),
    DuplicateAdvertised(String),
    ImplicitAndBlocked(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "extension name must not be empty"),
            Self::InvalidName(value) => write!(f, "extension name is invalid: {value}"),
            Self::NameTooLong(value) => write!(
                f,
                "extension name exceeds {} bytes: {value}",
                MAX_EXTENSION_NAME_SIZE - 1
            ),
            Self::DuplicateAdvertised(value) => {
                write!(f, "extension advertised more than once: {value}")
            }
            Self::ImplicitAndBlocked(value) => {
                write!(f, "extension is both implicit and blocked: {value}")
            }
        }
    }
}

impl Error for RegistryError {}

#[cfg(test)]
mod tests {
    use super::{CapabilityRegistry, ExtensionEntry, LayerDescriptor, RegistryError, LAYER_NAME};
    use crate::abi::{version_major, version_patch, CURRENT_API_VERSION};

    #[test]
    fn builtin_registry_is_empty() {
        let registry = CapabilityRegistry::builtin();
        assert!(registry.advertised().is_empty());
        assert!(registry.required_implicit().is_empty());
        assert!(registry.blocked().is_empty());
    }

    #[test]
    fn accepts_valid_lists() {
        let registry = CapabilityRegistry::new(
            vec![ExtensionEntry::new("XR_EXT_hand_tracking", 4)],
            vec!["XR_KHR_composition_layer_depth".to_string()],
            vec!["XR_EXT_eye_gaze_interaction".to_string()],
        )
        .expect("valid registry");
        assert!(registry.is_blocked(b"XR_EXT_eye_gaze_interaction"));
        assert!(!registry.is_blocked(b"XR_EXT_hand_tracking"));
    }

    #[test]
    fn rejects_empty_and_malformed_names() {
        let err = CapabilityRegistry::new(vec![], vec![String::new()], vec![])
            .expect_err("empty name must fail");
        assert_eq!(err, RegistryError::EmptyName);

        let err = CapabilityRegistry::new(vec![], vec![], vec!["XR EXT".to_string()])
            .expect_err("space must fail");
        assert_eq!(err, RegistryError::InvalidName("XR EXT".to_string()));
    }

    #[test]
    fn rejects_names_that_overflow_the_abi_buffer() {
        let long = format!("XR_{}", "a".repeat(200));
        let err = CapabilityRegistry::new(vec![ExtensionEntry::new(long.clone(), 1)], vec![], vec![])
            .expect_err("long name must fail");
        assert_eq!(err, RegistryError::NameTooLong(long));
    }

    #[test]
    fn rejects_duplicate_advertised_names() {
        let err = CapabilityRegistry::new(
            vec![ExtensionEntry::new("XR_A", 1), ExtensionEntry::new("XR_A", 2)],
            vec![],
            vec![],
        )
        .expect_err("duplicate must fail");
        assert_eq!(err, RegistryError::DuplicateAdvertised("XR_A".to_string()));
    }

    #[test]
    fn rejects_name_both_implicit_and_blocked() {
        let err = CapabilityRegistry::new(
            vec![],
            vec!["XR_A".to_string(), "XR_X".to_string()],
            vec!["XR_X".to_string()],
        )
        .expect_err("overlap must fail");
        assert_eq!(err, RegistryError::ImplicitAndBlocked("XR_X".to_string()));
    }

    #[test]
    fn descriptor_spec_version_tracks_current_patch() {
        let descriptor = LayerDescriptor::builtin();
        assert_eq!(descriptor.name, LAYER_NAME);
        assert_eq!(version_major(descriptor.spec_version), 1);
        assert_eq!(
            version_patch(descriptor.spec_version),
            version_patch(CURRENT_API_VERSION)
        );
    }
}
