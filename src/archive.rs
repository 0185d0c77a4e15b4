// Copyright © 2027 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Scan CBFS ROM regions and serve cached file lookups.
// Author: Lukas Bower

//! Archive handle and directory scanner.
//!
//! The scanner walks the ROM region once at the header's alignment. A slot
//! that does not open with the file marker is padding or erased flash and
//! is skipped silently; a slot that does is parsed as a file record and
//! emitted in address order. Only a record that contradicts its own layout
//! aborts the walk.

use std::borrow::Cow;

use log::{debug, warn};

use crate::error::CbfsError;
use crate::wire::{FileHeader, MasterHeader, FILE_HEADER_LEN, MASTER_HEADER_LEN, MASTER_HEADER_OFFSET};

/// Directory entry for one file discovered during the scan.
///
/// The name and payload are borrowed straight out of the ROM mapping;
/// nodes own nothing and are cheap to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileNode<'a> {
    name: &'a [u8],
    data: &'a [u8],
    ftype: u32,
    attributes_offset: u32,
}

impl<'a> FileNode<'a> {
    /// File name, lossily decoded. CBFS names are ASCII in practice.
    #[must_use]
    pub fn name(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.name)
    }

    /// Raw name bytes as stored in the record, trimmed at the first NUL.
    #[must_use]
    pub fn name_bytes(&self) -> &'a [u8] {
        self.name
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.data.len() as u32
    }

    /// Opaque coreboot file-type tag.
    #[must_use]
    pub fn ftype(&self) -> u32 {
        self.ftype
    }

    /// Offset of the optional attributes block, zero when absent.
    #[must_use]
    pub fn attributes_offset(&self) -> u32 {
        self.attributes_offset
    }

    /// Full payload slice inside the ROM mapping.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Copy payload bytes into `buffer`, truncated to whichever of the
    /// payload and the buffer is shorter. Returns the count copied.
    ///
    /// The legacy `max_size == 0` unbounded-read convention does not
    /// carry over: an empty buffer copies zero bytes. Callers that want
    /// the whole payload use [`FileNode::data`].
    pub fn read(&self, buffer: &mut [u8]) -> usize {
        let count = self.data.len().min(buffer.len());
        buffer[..count].copy_from_slice(&self.data[..count]);
        count
    }
}

/// A parsed CBFS archive: the master header plus the in-order file cache.
///
/// The archive borrows the caller's ROM mapping and copies nothing out of
/// it, so the mapping must outlive the archive. Independent archives over
/// different mappings (a ROM plus an overlay image, say) can coexist.
#[derive(Debug)]
pub struct CbfsArchive<'a> {
    header: MasterHeader,
    files: Vec<FileNode<'a>>,
}

impl<'a> CbfsArchive<'a> {
    /// Open an archive addressed by its end: the last four bytes of `rom`
    /// hold a little-endian relative offset which, added to one past the
    /// end, yields the master header position.
    pub fn from_end(rom: &'a [u8]) -> Result<Self, CbfsError> {
        let header = load_header_from_end(rom)?;
        Self::build(tail_region(rom, &header)?, header)
    }

    /// Open an archive addressed by its base, with the master header at
    /// the fixed offset from the start of `rom`.
    pub fn from_base(rom: &'a [u8]) -> Result<Self, CbfsError> {
        if rom.len() < MASTER_HEADER_OFFSET + MASTER_HEADER_LEN {
            return Err(CbfsError::BadHeader);
        }
        let header = MasterHeader::parse(&rom[MASTER_HEADER_OFFSET..])?;
        Self::build(head_region(rom, &header)?, header)
    }

    fn build(region: &'a [u8], header: MasterHeader) -> Result<Self, CbfsError> {
        let mut files = Vec::new();
        scan_region(region, &header, |node| {
            files.push(node);
            ScanStep::Continue
        })?;
        debug!("cbfs: cached {} files", files.len());
        Ok(Self { header, files })
    }

    /// Archive-wide parameters from the master header.
    #[must_use]
    pub fn header(&self) -> &MasterHeader {
        &self.header
    }

    /// Number of files discovered by the scan.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the scan found no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Files in scan order, which is ascending ROM address order.
    #[must_use]
    pub fn files(&self) -> &[FileNode<'a>] {
        &self.files
    }

    /// Iterate the cache in scan order. Every call starts a fresh pass.
    pub fn iter(&self) -> impl Iterator<Item = &FileNode<'a>> {
        self.files.iter()
    }

    /// First file whose name matches `name` exactly, byte for byte.
    pub fn find(&self, name: &str) -> Result<&FileNode<'a>, CbfsError> {
        self.files
            .iter()
            .find(|node| node.name_bytes() == name.as_bytes())
            .ok_or(CbfsError::FileNotFound)
    }
}

/// Locate `name` without building a cache: resolve the header through the
/// end-of-ROM trailer and walk the region until the first match.
///
/// The walk shares the scanner, so skip and abort behaviour is identical
/// to [`CbfsArchive::from_end`]. Each call returns a fresh node; nothing
/// is shared between lookups.
pub fn find_uncached<'a>(rom: &'a [u8], name: &str) -> Result<FileNode<'a>, CbfsError> {
    let header = load_header_from_end(rom)?;
    let mut found = None;
    scan_region(tail_region(rom, &header)?, &header, |node| {
        if node.name_bytes() == name.as_bytes() {
            found = Some(node);
            ScanStep::Stop
        } else {
            ScanStep::Continue
        }
    })?;
    found.ok_or(CbfsError::FileNotFound)
}

enum ScanStep {
    Continue,
    Stop,
}

/// Walk the whole of `region` from its start, calling `visit` for every
/// file record found, until the region runs out of whole alignment slots
/// or `visit` stops the walk. The header slot and the boot block fall out
/// through the marker check, not through the first-file offset.
fn scan_region<'a, F>(
    region: &'a [u8],
    header: &MasterHeader,
    mut visit: F,
) -> Result<(), CbfsError>
where
    F: FnMut(FileNode<'a>) -> ScanStep,
{
    let align = header.align as usize;
    let mut cursor = 0;
    while region.len().saturating_sub(cursor) >= align {
        let slot = &region[cursor..];
        if !FileHeader::magic_matches(slot) {
            // Padding, erased flash, or the boot block. Not an error.
            cursor += align;
            continue;
        }
        let record = FileHeader::parse(slot)?;
        let name_end = record.offset as usize;
        let data_end = name_end
            .checked_add(record.len as usize)
            .filter(|end| *end <= slot.len())
            .ok_or_else(|| {
                warn!("cbfs: record at {cursor:#x} runs past the region end");
                CbfsError::BadFile
            })?;
        let node = FileNode {
            name: trim_name(&slot[FILE_HEADER_LEN..name_end]),
            data: &slot[name_end..data_end],
            ftype: record.ftype,
            attributes_offset: record.attributes_offset,
        };
        debug!("cbfs: {} ({} bytes) at {cursor:#x}", node.name(), record.len);
        if let ScanStep::Stop = visit(node) {
            return Ok(());
        }
        // The legacy scanner steps by the padded payload length, not the
        // whole record; intermediate slots inside a long name or header
        // simply fail the marker check on the next probes.
        cursor += round_up_align(record.len as usize, align).max(align);
    }
    Ok(())
}

fn load_header_from_end(rom: &[u8]) -> Result<MasterHeader, CbfsError> {
    if rom.len() < 4 {
        return Err(CbfsError::BadHeader);
    }
    let mut trailer = [0u8; 4];
    trailer.copy_from_slice(&rom[rom.len() - 4..]);
    // Relative offset from one past the last ROM byte, normally negative.
    let at = rom.len() as i64 + i64::from(i32::from_le_bytes(trailer));
    if at < 0 || at as usize + MASTER_HEADER_LEN > rom.len() {
        return Err(CbfsError::BadHeader);
    }
    MasterHeader::parse(&rom[at as usize..])
}

/// Last `rom_size` bytes of the mapping, for end-addressed archives.
fn tail_region<'a>(rom: &'a [u8], header: &MasterHeader) -> Result<&'a [u8], CbfsError> {
    let size = header.rom_size as usize;
    if size > rom.len() {
        return Err(CbfsError::BadHeader);
    }
    Ok(&rom[rom.len() - size..])
}

/// First `rom_size` bytes of the mapping, for base-addressed archives.
fn head_region<'a>(rom: &'a [u8], header: &MasterHeader) -> Result<&'a [u8], CbfsError> {
    let size = header.rom_size as usize;
    if size > rom.len() {
        return Err(CbfsError::BadHeader);
    }
    Ok(&rom[..size])
}

fn trim_name(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|byte| *byte == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}

fn round_up_align(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{FILE_MAGIC, HEADER_VERSION_2};

    fn header(rom_size: u32, align: u32, offset: u32) -> MasterHeader {
        MasterHeader {
            version: HEADER_VERSION_2,
            rom_size,
            boot_block_size: 0,
            align,
            offset,
        }
    }

    fn put_record(region: &mut [u8], at: usize, name: &str, ftype: u32, payload: &[u8]) {
        let offset = (FILE_HEADER_LEN + name.len() + 1) as u32;
        let mut record = Vec::new();
        record.extend_from_slice(&FILE_MAGIC);
        record.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        record.extend_from_slice(&ftype.to_be_bytes());
        record.extend_from_slice(&0u32.to_be_bytes());
        record.extend_from_slice(&offset.to_be_bytes());
        record.extend_from_slice(name.as_bytes());
        record.push(0);
        record.extend_from_slice(payload);
        region[at..at + record.len()].copy_from_slice(&record);
    }

    fn collect<'a>(region: &'a [u8], header: &MasterHeader) -> Result<Vec<FileNode<'a>>, CbfsError> {
        let mut nodes = Vec::new();
        scan_region(region, header, |node| {
            nodes.push(node);
            ScanStep::Continue
        })?;
        Ok(nodes)
    }

    #[test]
    fn scan_emits_records_in_address_order() {
        let mut region = vec![0xffu8; 1024];
        put_record(&mut region, 0, "first", 0x50, b"abcd");
        put_record(&mut region, 64, "second", 0x50, b"efgh");
        let nodes = collect(&region, &header(1024, 64, 0)).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].name(), "first");
        assert_eq!(nodes[0].data(), b"abcd");
        assert_eq!(nodes[1].name(), "second");
        assert_eq!(nodes[1].data(), b"efgh");
    }

    #[test]
    fn scan_skips_slots_without_the_marker() {
        let mut region = vec![0xffu8; 1024];
        region[64..128].fill(0x5a);
        put_record(&mut region, 192, "late", 0x50, b"xyz");
        let nodes = collect(&region, &header(1024, 64, 0)).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name(), "late");
    }

    #[test]
    fn zero_length_payload_still_advances_a_slot() {
        let mut region = vec![0xffu8; 512];
        put_record(&mut region, 0, "empty", 0x50, b"");
        put_record(&mut region, 64, "after", 0x50, b"ok");
        let nodes = collect(&region, &header(512, 64, 0)).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].size(), 0);
        assert_eq!(nodes[1].name(), "after");
    }

    #[test]
    fn record_past_region_end_aborts_the_scan() {
        let mut region = vec![0xffu8; 128];
        // Declares 4096 payload bytes in a 128-byte region.
        put_record(&mut region, 0, "huge", 0x50, b"");
        region[8..12].copy_from_slice(&4096u32.to_be_bytes());
        assert_eq!(collect(&region, &header(128, 64, 0)), Err(CbfsError::BadFile));
    }

    #[test]
    fn corrupt_payload_offset_aborts_the_scan() {
        let mut region = vec![0xffu8; 256];
        put_record(&mut region, 0, "fine", 0x50, b"abcd");
        put_record(&mut region, 64, "bad", 0x50, b"");
        region[64 + 20..64 + 24].copy_from_slice(&4u32.to_be_bytes());
        assert_eq!(collect(&region, &header(256, 64, 0)), Err(CbfsError::BadFile));
    }

    #[test]
    fn scan_covers_slots_below_the_first_file_offset() {
        let mut region = vec![0xffu8; 512];
        // The walk covers the whole region; a record sitting below the
        // header's declared first-file offset is still discovered.
        put_record(&mut region, 0, "early", 0x50, b"no");
        put_record(&mut region, 128, "late", 0x50, b"yes");
        let nodes = collect(&region, &header(512, 64, 128)).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].name(), "early");
        assert_eq!(nodes[1].name(), "late");
    }

    #[test]
    fn read_truncates_to_the_shorter_side() {
        let mut region = vec![0xffu8; 256];
        put_record(&mut region, 0, "blob", 0x50, b"0123456789");
        let nodes = collect(&region, &header(256, 64, 0)).unwrap();
        let node = nodes[0];
        let mut short = [0u8; 4];
        assert_eq!(node.read(&mut short), 4);
        assert_eq!(&short, b"0123");
        let mut exact = [0u8; 10];
        assert_eq!(node.read(&mut exact), 10);
        assert_eq!(&exact, b"0123456789");
        let mut long = [0u8; 32];
        assert_eq!(node.read(&mut long), 10);
        // An empty buffer copies nothing; the whole payload comes from
        // the data accessor instead.
        let mut empty = [0u8; 0];
        assert_eq!(node.read(&mut empty), 0);
        assert_eq!(node.data(), b"0123456789");
    }

    #[test]
    fn name_is_trimmed_at_the_first_nul() {
        let mut region = vec![0xffu8; 256];
        // Name field padded with several NULs before the payload.
        let mut record = Vec::new();
        record.extend_from_slice(&FILE_MAGIC);
        record.extend_from_slice(&3u32.to_be_bytes());
        record.extend_from_slice(&0x50u32.to_be_bytes());
        record.extend_from_slice(&0u32.to_be_bytes());
        record.extend_from_slice(&32u32.to_be_bytes());
        record.extend_from_slice(b"pad\0\0\0\0\0");
        record.extend_from_slice(b"abc");
        region[..record.len()].copy_from_slice(&record);
        let nodes = collect(&region, &header(256, 64, 0)).unwrap();
        assert_eq!(nodes[0].name(), "pad");
        assert_eq!(nodes[0].name_bytes(), b"pad");
        assert_eq!(nodes[0].data(), b"abc");
    }
}
