//! Staged input assets.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Role an input asset plays in the composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum AssetRole {
    /// Top-region video; supplies the audio track
    Primary,
    /// Bottom-region clip at the given playback index
    BottomClip(usize),
}

impl fmt::Display for AssetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetRole::Primary => f.write_str("primary"),
            AssetRole::BottomClip(i) => write!(f, "bottom_clip[{}]", i),
        }
    }
}

/// A local copy of one remote input.
///
/// Only constructed once the file exists and is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StagedAsset {
    /// Where the asset was fetched from
    pub source_url: String,
    /// Path inside the job workspace
    pub local_path: PathBuf,
    /// Role in the composition
    pub role: AssetRole,
    /// Size on disk in bytes
    pub size_bytes: u64,
}

impl StagedAsset {
    pub fn is_primary(&self) -> bool {
        matches!(self.role, AssetRole::Primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display() {
        assert_eq!(AssetRole::Primary.to_string(), "primary");
        assert_eq!(AssetRole::BottomClip(2).to_string(), "bottom_clip[2]");
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&AssetRole::BottomClip(1)).unwrap();
        assert_eq!(json, r#"{"kind":"bottom_clip","index":1}"#);

        let json = serde_json::to_string(&AssetRole::Primary).unwrap();
        assert_eq!(json, r#"{"kind":"primary"}"#);
    }
}
