// Author: Lukas Bower
// Purpose: Provide the coreboot filesystem (CBFS) reader core.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Reader for CBFS, the linear archive format embedded in coreboot ROM
//! images. An archive is a master header plus a run of file records, each
//! starting on an alignment boundary declared by the header. The reader
//! locates the header (either through the trailer at the end of the ROM or
//! at the fixed offset from its base), walks the region once, and serves
//! name lookups and payload reads from the resulting directory.
//!
//! The ROM region is an already mapped, read-only byte slice owned by the
//! caller; the reader copies nothing out of it and the mapping must
//! outlive any [`CbfsArchive`] or [`FileNode`] borrowed from it.

mod archive;
mod error;
mod reader;
mod wire;

pub use archive::{find_uncached, CbfsArchive, FileNode};
pub use error::CbfsError;
pub use reader::{CbfsReader, CbfsResult};
pub use wire::{
    type_name, FileHeader, MasterHeader, FILE_HEADER_LEN, FILE_MAGIC, HEADER_MAGIC,
    HEADER_VERSION_1, HEADER_VERSION_2, MASTER_HEADER_LEN, MASTER_HEADER_OFFSET,
};
