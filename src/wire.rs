// Copyright © 2027 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Decode on-ROM CBFS record layouts from their big-endian wire order.
// Author: Lukas Bower

//! Wire-format layer: the master header and per-file record layouts as they
//! appear in a coreboot ROM, plus the display names for the well-known
//! file-type tags.

use std::borrow::Cow;

use crate::error::CbfsError;

/// Master header magic, the bytes `"ORBC"` read big-endian.
pub const HEADER_MAGIC: u32 = 0x4f52_4243;

/// Version tag for the original master header layout.
pub const HEADER_VERSION_1: u32 = 0x3131_3131;

/// Version tag for the current master header layout.
pub const HEADER_VERSION_2: u32 = 0x3131_3132;

/// Marker bytes opening every file record.
pub const FILE_MAGIC: [u8; 8] = *b"LARCHIVE";

/// Fixed offset of the master header from the ROM base.
pub const MASTER_HEADER_OFFSET: usize = 0x38;

/// Encoded size of the master header.
pub const MASTER_HEADER_LEN: usize = 24;

/// Encoded size of the fixed portion of a file record. The file name
/// occupies the bytes between this and the record's payload offset.
pub const FILE_HEADER_LEN: usize = 24;

/// Archive-wide parameters parsed from the master header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterHeader {
    /// Header layout version tag.
    pub version: u32,
    /// Total size of the ROM region holding file records.
    pub rom_size: u32,
    /// Size of the reserved boot block at the top of the ROM.
    pub boot_block_size: u32,
    /// Alignment every file record starts on; also the probe stride.
    pub align: u32,
    /// Offset of the first file record within the ROM region.
    pub offset: u32,
}

impl MasterHeader {
    /// Parse a master header from the front of `bytes`, converting every
    /// field from its big-endian wire order.
    ///
    /// A wrong magic or a first-file offset reaching into the boot block
    /// is a [`CbfsError::BadHeader`]. A zero alignment is rejected the
    /// same way: the scanner strides by it and would never terminate.
    pub fn parse(bytes: &[u8]) -> Result<Self, CbfsError> {
        if bytes.len() < MASTER_HEADER_LEN {
            return Err(CbfsError::BadHeader);
        }
        if read_be32(bytes, 0) != HEADER_MAGIC {
            return Err(CbfsError::BadHeader);
        }
        let header = Self {
            version: read_be32(bytes, 4),
            rom_size: read_be32(bytes, 8),
            boot_block_size: read_be32(bytes, 12),
            align: read_be32(bytes, 16),
            offset: read_be32(bytes, 20),
        };
        if header.align == 0 {
            return Err(CbfsError::BadHeader);
        }
        if header.boot_block_size > header.rom_size
            || header.offset > header.rom_size - header.boot_block_size
        {
            return Err(CbfsError::BadHeader);
        }
        Ok(header)
    }
}

/// Fixed portion of one file record, with fields in host order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Payload length in bytes.
    pub len: u32,
    /// Opaque coreboot file-type tag.
    pub ftype: u32,
    /// Offset from the record start to the optional attributes block,
    /// zero when absent.
    pub attributes_offset: u32,
    /// Offset from the record start to the payload; the NUL-terminated
    /// file name fills the gap after the fixed header.
    pub offset: u32,
}

impl FileHeader {
    /// Check whether `bytes` opens with the file-record marker.
    #[must_use]
    pub fn magic_matches(bytes: &[u8]) -> bool {
        bytes.len() >= FILE_MAGIC.len() && bytes[..FILE_MAGIC.len()] == FILE_MAGIC
    }

    /// Parse the fixed record fields following the marker. The caller has
    /// already established the marker via [`FileHeader::magic_matches`].
    ///
    /// A payload offset inside the fixed record is a corrupt file and
    /// aborts the scan that hit it.
    pub fn parse(bytes: &[u8]) -> Result<Self, CbfsError> {
        if bytes.len() < FILE_HEADER_LEN {
            return Err(CbfsError::BadFile);
        }
        let header = Self {
            len: read_be32(bytes, 8),
            ftype: read_be32(bytes, 12),
            attributes_offset: read_be32(bytes, 16),
            offset: read_be32(bytes, 20),
        };
        if (header.offset as usize) < FILE_HEADER_LEN {
            return Err(CbfsError::BadFile);
        }
        Ok(header)
    }
}

const TYPE_NAMES: &[(u32, &str)] = &[
    (0x01, "bootblock"),
    (0x02, "cbfs header"),
    (0x10, "stage"),
    (0x20, "payload"),
    (0x21, "fit"),
    (0x30, "optionrom"),
    (0x40, "bootsplash"),
    (0x50, "raw"),
    (0x51, "vsa"),
    (0x52, "mbi"),
    (0x53, "microcode"),
    (0x60, "fsp"),
    (0x61, "mrc"),
    (0xa2, "mrc cache"),
    (0xaa, "cmos default"),
    (0x01aa, "cmos layout"),
    (0xab, "spd"),
    (0xffff_ffff, "null"),
];

/// Display name for a file-type tag. Tags outside the well-known set
/// render as their hex value; the reader itself treats the tag as opaque.
#[must_use]
pub fn type_name(ftype: u32) -> Cow<'static, str> {
    for (tag, name) in TYPE_NAMES {
        if *tag == ftype {
            return Cow::Borrowed(*name);
        }
    }
    Cow::Owned(format!("{ftype:#x}"))
}

fn read_be32(bytes: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    u32::from_be_bytes(buf)
}
