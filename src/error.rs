// Author: Lukas Bower
// Purpose: Error taxonomy shared by all CBFS reader operations.

use thiserror::Error;

/// Failure states reported by CBFS operations.
///
/// The variants map one-to-one to the legacy result codes and the
/// `Display` strings match the legacy error table, so a CLI can print
/// them directly.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CbfsError {
    /// A lookup or accessor ran before a successful header parse and scan.
    #[error("not initialized")]
    NotInitialized,
    /// Master header magic mismatch or inconsistent size fields.
    #[error("bad header")]
    BadHeader,
    /// A file record declared a payload offset inside its own fixed
    /// header, or its name or payload runs past the ROM region.
    #[error("bad file")]
    BadFile,
    /// No file in the archive carries the requested name.
    #[error("file not found")]
    FileNotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_legacy_error_table() {
        assert_eq!(CbfsError::NotInitialized.to_string(), "not initialized");
        assert_eq!(CbfsError::BadHeader.to_string(), "bad header");
        assert_eq!(CbfsError::BadFile.to_string(), "bad file");
        assert_eq!(CbfsError::FileNotFound.to_string(), "file not found");
    }
}
