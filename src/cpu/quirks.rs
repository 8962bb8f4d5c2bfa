//! Behaviour switches for instructions whose semantics differ between
//! CHIP-8 interpreters.
//!
//! Defaults match the reference interpreter this machine follows. Quirks can
//! be loaded from a JSON file; missing fields take their default.
//!
//! ```json
//! { "shift_uses_vy": true, "clip_sprites": true }
//! ```

use serde::{Serialize, Deserialize};
use std::path::Path;
use thiserror::Error;

/// Instruction-level compatibility options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quirks {
    /// 8XY6/8XYE shift VY and store into VX (COSMAC VIP) instead of
    /// shifting VX in place.
    pub shift_uses_vy: bool,

    /// DXYN drops pixels past the right and bottom edges instead of
    /// wrapping them to the opposite side.
    pub clip_sprites: bool,

    /// BNNN adds VX (X = high nibble of NNN) instead of V0.
    pub jump_uses_vx: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        Self {
            shift_uses_vy: false,
            clip_sprites: false,
            jump_uses_vx: true,
        }
    }
}

impl Quirks {
    /// Original COSMAC VIP behaviour.
    pub fn cosmac_vip() -> Self {
        Self {
            shift_uses_vy: true,
            clip_sprites: true,
            jump_uses_vx: false,
        }
    }

    /// Parse from a JSON string.
    pub fn from_json(source: &str) -> Result<Self, QuirksError> {
        serde_json::from_str(source).map_err(|e| QuirksError::Parse(e.to_string()))
    }

    /// Load from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, QuirksError> {
        let source = std::fs::read_to_string(path.as_ref())
            .map_err(|e| QuirksError::IoError(e.to_string()))?;
        Self::from_json(&source)
    }
}

/// Errors loading a quirks file.
#[derive(Debug, Clone, Error)]
pub enum QuirksError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("invalid quirks file: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let quirks = Quirks::from_json(r#"{ "clip_sprites": true }"#).unwrap();
        assert!(quirks.clip_sprites);
        assert!(!quirks.shift_uses_vy);
        assert!(quirks.jump_uses_vx);
    }

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(Quirks::from_json("{}").unwrap(), Quirks::default());
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(Quirks::from_json("[1, 2"), Err(QuirksError::Parse(_))));
    }
}
