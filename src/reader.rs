// CLASSIFICATION: COMMUNITY
// Filename: reader.rs v0.3
// Author: Lukas Bower
// Date Modified: 2027-09-14

//! Legacy single-instance session over [`CbfsArchive`].
//!
//! The historical reader kept one process-wide archive and a "last result"
//! code that callers polled after every call. This wrapper keeps both
//! inside an explicit context value instead of ambient global state: every
//! operation records its outcome, readable through [`CbfsReader::result`]
//! and printable through its `Display` string.

use std::fmt;

use crate::archive::{CbfsArchive, FileNode};
use crate::error::CbfsError;
use crate::wire::MasterHeader;

/// Outcome of the most recent session operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CbfsResult {
    /// The last operation completed.
    Success,
    /// The last operation failed.
    Failed(CbfsError),
}

impl fmt::Display for CbfsResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed(err) => write!(f, "{err}"),
        }
    }
}

/// Session wrapper mirroring the legacy `file_cbfs_*` call surface.
///
/// Until an init succeeds, every lookup reports
/// [`CbfsError::NotInitialized`]. A failed init drops any previously
/// cached archive; there is no partial state to fall back on.
#[derive(Debug)]
pub struct CbfsReader<'a> {
    archive: Option<CbfsArchive<'a>>,
    cursor: usize,
    result: CbfsResult,
}

impl<'a> CbfsReader<'a> {
    /// Create a session with no archive attached.
    #[must_use]
    pub fn new() -> Self {
        Self {
            archive: None,
            cursor: 0,
            result: CbfsResult::Failed(CbfsError::NotInitialized),
        }
    }

    /// Initialize against a ROM addressed by its end, resolving the
    /// master header through the trailer in the last four bytes.
    pub fn init(&mut self, rom: &'a [u8]) -> Result<(), CbfsError> {
        self.load(CbfsArchive::from_end(rom))
    }

    /// Initialize against a ROM addressed by its base, with the master
    /// header at the fixed offset from the start.
    pub fn init_mem(&mut self, rom: &'a [u8]) -> Result<(), CbfsError> {
        self.load(CbfsArchive::from_base(rom))
    }

    fn load(&mut self, outcome: Result<CbfsArchive<'a>, CbfsError>) -> Result<(), CbfsError> {
        self.cursor = 0;
        match outcome {
            Ok(archive) => {
                self.archive = Some(archive);
                self.record(Ok(()))
            }
            Err(err) => {
                self.archive = None;
                self.record(Err(err))
            }
        }
    }

    /// Outcome of the most recent operation.
    #[must_use]
    pub fn result(&self) -> CbfsResult {
        self.result
    }

    /// Master header of the initialized archive.
    pub fn get_header(&mut self) -> Result<MasterHeader, CbfsError> {
        let outcome = match &self.archive {
            Some(archive) => Ok(*archive.header()),
            None => Err(CbfsError::NotInitialized),
        };
        self.record(outcome)
    }

    /// First cached file, resetting the iteration cursor. An initialized
    /// but empty archive reports [`CbfsError::FileNotFound`].
    pub fn get_first(&mut self) -> Result<FileNode<'a>, CbfsError> {
        let outcome = match &self.archive {
            Some(archive) => archive.files().first().copied().ok_or(CbfsError::FileNotFound),
            None => Err(CbfsError::NotInitialized),
        };
        self.cursor = usize::from(outcome.is_ok());
        self.record(outcome)
    }

    /// File after the one returned by the previous [`CbfsReader::get_first`]
    /// or [`CbfsReader::get_next`]. `Ok(None)` marks the end of the cache.
    pub fn get_next(&mut self) -> Result<Option<FileNode<'a>>, CbfsError> {
        let outcome = match &self.archive {
            Some(archive) => Ok(archive.files().get(self.cursor).copied()),
            None => Err(CbfsError::NotInitialized),
        };
        if let Ok(Some(_)) = outcome {
            self.cursor += 1;
        }
        self.record(outcome)
    }

    /// First file whose name matches `name` exactly.
    pub fn find(&mut self, name: &str) -> Result<FileNode<'a>, CbfsError> {
        let outcome = match &self.archive {
            Some(archive) => archive.find(name).copied(),
            None => Err(CbfsError::NotInitialized),
        };
        self.record(outcome)
    }

    fn record<T>(&mut self, outcome: Result<T, CbfsError>) -> Result<T, CbfsError> {
        self.result = match &outcome {
            Ok(_) => CbfsResult::Success,
            Err(err) => CbfsResult::Failed(*err),
        };
        outcome
    }
}

impl Default for CbfsReader<'_> {
    fn default() -> Self {
        Self::new()
    }
}
