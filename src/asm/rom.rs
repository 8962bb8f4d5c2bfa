//! ROM image files.
//!
//! A ROM is a raw big-endian instruction stream, loaded at 0x200 with no
//! header. Images are checked before execution starts.

use crate::cpu::memory::MAX_PROGRAM_SIZE;
use log::info;
use std::path::Path;
use thiserror::Error;

/// Load a ROM image from disk.
pub fn load_rom<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, RomError> {
    let bytes = std::fs::read(path.as_ref())
        .map_err(|e| RomError::IoError(e.to_string()))?;
    validate(&bytes)?;
    info!("read {} ({} bytes)", path.as_ref().display(), bytes.len());
    Ok(bytes)
}

/// Save a ROM image to disk.
pub fn save_rom<P: AsRef<Path>>(path: P, program: &[u8]) -> Result<(), RomError> {
    validate(program)?;
    std::fs::write(path.as_ref(), program)
        .map_err(|e| RomError::IoError(e.to_string()))
}

/// Check that an image can be loaded at 0x200.
pub fn validate(program: &[u8]) -> Result<(), RomError> {
    if program.is_empty() {
        return Err(RomError::Empty);
    }
    if program.len() > MAX_PROGRAM_SIZE {
        return Err(RomError::TooLarge {
            size: program.len(),
            max: MAX_PROGRAM_SIZE,
        });
    }
    Ok(())
}

/// Errors that can occur during ROM operations.
#[derive(Debug, Clone, Error)]
pub enum RomError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("ROM is empty")]
    Empty,

    #[error("ROM is {size} bytes, at most {max} fit in memory")]
    TooLarge { size: usize, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("chip8-vm-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_rom_roundtrip() {
        let path = temp_path("roundtrip.ch8");
        save_rom(&path, &[0x00, 0xE0, 0x12, 0x00]).unwrap();
        let program = load_rom(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(program, vec![0x00, 0xE0, 0x12, 0x00]);
    }

    #[test]
    fn test_empty_rom_rejected() {
        let path = temp_path("empty.ch8");
        std::fs::write(&path, b"").unwrap();
        let result = load_rom(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(RomError::Empty)));
    }

    #[test]
    fn test_oversized_rom_rejected() {
        let program = vec![0u8; MAX_PROGRAM_SIZE + 1];
        assert!(matches!(
            validate(&program),
            Err(RomError::TooLarge { size, .. }) if size == MAX_PROGRAM_SIZE + 1
        ));
        assert!(validate(&program[..MAX_PROGRAM_SIZE]).is_ok());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(load_rom(temp_path("missing.ch8")), Err(RomError::IoError(_))));
    }
}
