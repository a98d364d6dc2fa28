//! Configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use serde::{Deserialize, Serialize};

use crate::codec::CodecKind;
use crate::error::{GraphError, Result};

/// Settings shared by the live-update handlers of one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrellisConfig {
    /// Pull an entity's check into the current pass when a fresh result
    /// lists it for the first time.
    pub cascade_related: bool,

    /// Wire format for persisted result databases.
    pub codec: CodecKind,
}

impl Default for TrellisConfig {
    fn default() -> Self {
        Self {
            cascade_related: true,
            codec: CodecKind::MessagePack,
        }
    }
}

impl TrellisConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|err| GraphError::Config(err.to_string()))
    }

    pub fn codec(&self) -> CodecKind {
        self.codec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config = TrellisConfig::from_json_str("{}").unwrap();
        assert_eq!(config, TrellisConfig::default());
        assert!(config.cascade_related);
    }

    #[test]
    fn fields_override_defaults() {
        let config =
            TrellisConfig::from_json_str(r#"{ "cascade_related": false, "codec": "json" }"#)
                .unwrap();
        assert!(!config.cascade_related);
        assert_eq!(config.codec(), CodecKind::Json);
    }

    #[test]
    fn bad_input_is_a_config_error() {
        let err = TrellisConfig::from_json_str(r#"{ "codec": "xml" }"#).unwrap_err();
        assert!(matches!(err, GraphError::Config(_)));
    }
}
