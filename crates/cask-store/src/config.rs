use serde::{Deserialize, Serialize};

use cask_digest::HashAlgorithm;
use cask_types::HEX_LEN;

use crate::error::{StoreError, StoreResult};

/// Configuration for a [`Store`](crate::Store).
///
/// Immutable once a store is created: the shard parameters and algorithm
/// together define the on-disk layout, so changing any of them invalidates
/// every previously written object. Two store instances pointed at the same
/// tree must share the same configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Hash algorithm used to derive addresses.
    pub algorithm: HashAlgorithm,
    /// Number of directory-prefix levels in a shard path.
    pub segment_count: usize,
    /// Hex characters per prefix level.
    pub segment_width: usize,
    /// Name of the reserved staging area under the store root. Must contain
    /// a non-hex character so it can never be mistaken for a shard directory.
    pub temp_dir_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            segment_count: 2,
            segment_width: 2,
            temp_dir_name: "tmp".to_string(),
        }
    }
}

impl StoreConfig {
    /// Check the configuration against the digest length.
    ///
    /// The prefix segments must leave a non-empty remainder for the filename
    /// component, and the temp directory name must be distinguishable from
    /// every possible shard directory name.
    pub fn validate(&self) -> StoreResult<()> {
        if self.segment_count > 0 && self.segment_width == 0 {
            return Err(StoreError::InvalidConfiguration {
                reason: "segment_width must be nonzero when segment_count > 0".to_string(),
            });
        }
        if self.segment_count * self.segment_width >= HEX_LEN {
            return Err(StoreError::InvalidConfiguration {
                reason: format!(
                    "{} segments of width {} consume the whole {HEX_LEN}-character digest, \
                     leaving an empty filename component",
                    self.segment_count, self.segment_width
                ),
            });
        }
        if self.temp_dir_name.is_empty() {
            return Err(StoreError::InvalidConfiguration {
                reason: "temp_dir_name must not be empty".to_string(),
            });
        }
        if self.temp_dir_name.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StoreError::InvalidConfiguration {
                reason: format!(
                    "temp_dir_name {:?} is a valid hex string and could collide with a shard \
                     directory",
                    self.temp_dir_name
                ),
            });
        }
        if self.temp_dir_name.contains(['/', '\\']) {
            return Err(StoreError::InvalidConfiguration {
                reason: "temp_dir_name must be a single path component".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        StoreConfig::default().validate().unwrap();
    }

    #[test]
    fn default_values() {
        let config = StoreConfig::default();
        assert_eq!(config.algorithm, HashAlgorithm::Sha256);
        assert_eq!(config.segment_count, 2);
        assert_eq!(config.segment_width, 2);
        assert_eq!(config.temp_dir_name, "tmp");
    }

    #[test]
    fn rejects_segments_consuming_whole_digest() {
        let config = StoreConfig {
            segment_count: 32,
            segment_width: 2,
            ..StoreConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn rejects_segments_exceeding_digest() {
        let config = StoreConfig {
            segment_count: 5,
            segment_width: 16,
            ..StoreConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn accepts_flat_layout() {
        let config = StoreConfig {
            segment_count: 0,
            segment_width: 0,
            ..StoreConfig::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn rejects_zero_width_with_segments() {
        let config = StoreConfig {
            segment_count: 2,
            segment_width: 0,
            ..StoreConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn rejects_hex_temp_dir_name() {
        let config = StoreConfig {
            temp_dir_name: "ab".to_string(),
            ..StoreConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn rejects_empty_temp_dir_name() {
        let config = StoreConfig {
            temp_dir_name: String::new(),
            ..StoreConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn rejects_temp_dir_name_with_separator() {
        let config = StoreConfig {
            temp_dir_name: "tmp/staging".to_string(),
            ..StoreConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn serde_roundtrip() {
        let config = StoreConfig {
            algorithm: HashAlgorithm::Blake3,
            segment_count: 3,
            segment_width: 1,
            temp_dir_name: "staging_".to_string(),
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: StoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn serde_fills_defaults() {
        let parsed: StoreConfig = serde_json::from_str("{\"algorithm\":\"blake3\"}").unwrap();
        assert_eq!(parsed.algorithm, HashAlgorithm::Blake3);
        assert_eq!(parsed.segment_count, 2);
        assert_eq!(parsed.temp_dir_name, "tmp");
    }
}
