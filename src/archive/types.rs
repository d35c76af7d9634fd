//! Archive layout constants, header records, and little-endian helpers.
//!
//! Layout of a spanned archive (all integers little-endian):
//!
//! ```text
//! every segment        8B   "LFG!", segment payload length (file len − 8)
//! first segment only  20B   archive name[13], 0, disk count, 0, space needed
//! per member          32B   "FILE", data length to the next member, name[13],
//!                           0, uncompressed length, [2,0,1,0,0,0]
//!                      …    imploded payload
//! ```
//!
//! A member may continue across segments; continuation segments carry only
//! the common 8-byte header before the remaining payload bytes.

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::rc::Rc;

/// Tag opening every segment file.
pub const SEGMENT_TAG: &[u8; 4] = b"LFG!";

/// Tag opening every member record.
pub const MEMBER_TAG: &[u8; 4] = b"FILE";

/// Six member-header bytes of unknown meaning, emitted and accepted
/// verbatim.  A mismatch on read is reported but not fatal.
pub const UNKNOWN_MEMBER_BYTES: [u8; 6] = [2, 0, 1, 0, 0, 0];

/// Common header present on every segment.
pub const SEGMENT_HEADER_LEN: u64 = 8;

/// Common header plus the first-segment archive block.
pub const ARCHIVE_HEADER_LEN: u64 = 28;

/// Full member record ahead of the payload.
pub const MEMBER_HEADER_LEN: u64 = 32;

/// Member-header bytes counted inside the stored data length (everything
/// after the length field itself).
pub const MEMBER_TRAILING_HEADER_LEN: u64 = 24;

/// Name fields hold 13 bytes, NUL-terminated DOS 8.3 names.
pub const NAME_FIELD_LEN: usize = 13;

// ─────────────────────────────────────────────────────────────────────────────
// Header records
// ─────────────────────────────────────────────────────────────────────────────

/// First-segment archive block.
#[derive(Debug, Clone)]
pub struct ArchiveHeader {
    pub name: String,
    pub disk_count: u8,
    /// Total bytes required once every member is extracted.
    pub space_needed: u32,
}

impl ArchiveHeader {
    /// Reads the 20 archive-block bytes following the common header.
    pub fn read(r: &mut dyn Read) -> io::Result<Self> {
        let name = read_name_field(r)?;
        let mut fixed = [0u8; 3];
        r.read_exact(&mut fixed)?;
        let space_needed = read_u32_le(r)?;
        Ok(ArchiveHeader {
            name,
            disk_count: fixed[1],
            space_needed,
        })
    }
}

/// One member record, minus the leading "FILE" tag.
#[derive(Debug, Clone)]
pub struct MemberHeader {
    /// Bytes of data following the length field until the next member.
    pub data_length: u32,
    pub name: String,
    /// Uncompressed length of the member.
    pub final_length: u32,
    pub unknown: [u8; 6],
}

impl MemberHeader {
    /// Reads the record after its "FILE" tag has been consumed.
    pub fn read(r: &mut dyn Read) -> io::Result<Self> {
        let data_length = read_u32_le(r)?;
        let name = read_name_field(r)?;
        let mut pad = [0u8; 1];
        r.read_exact(&mut pad)?;
        let final_length = read_u32_le(r)?;
        let mut unknown = [0u8; 6];
        r.read_exact(&mut unknown)?;
        Ok(MemberHeader {
            data_length,
            name,
            final_length,
            unknown,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Field helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Consumes a 4-byte tag; `false` on mismatch or a short read.
pub fn read_tag(r: &mut dyn Read, tag: &[u8; 4]) -> bool {
    let mut buf = [0u8; 4];
    matches!(r.read_exact(&mut buf), Ok(())) && &buf == tag
}

pub fn read_u32_le(r: &mut dyn Read) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn write_u32_le(w: &mut dyn Write, value: u32) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

/// Reads a 13-byte name field, dropping everything from the first NUL.
pub fn read_name_field(r: &mut dyn Read) -> io::Result<String> {
    let mut buf = [0u8; NAME_FIELD_LEN];
    r.read_exact(&mut buf)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(NAME_FIELD_LEN);
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

/// Writes a name into a 13-byte field, truncated and NUL-padded.
pub fn write_name_field(w: &mut dyn Write, name: &str) -> io::Result<()> {
    let mut buf = [0u8; NAME_FIELD_LEN];
    let bytes = name.as_bytes();
    let take = bytes.len().min(NAME_FIELD_LEN - 1);
    buf[..take].copy_from_slice(&bytes[..take]);
    w.write_all(&buf)
}

/// Advances the disk letter in a segment file name: the 5th character from
/// the end, which sits just before the `.XXX` extension of the 8.3 naming
/// convention (`INDY___C.XXX` → `INDY___D.XXX`).
pub fn bump_segment_name(path: &str) -> String {
    let mut bytes = path.as_bytes().to_vec();
    if bytes.is_empty() {
        return path.to_owned();
    }
    let index = bytes.len().saturating_sub(5);
    bytes[index] = bytes[index].wrapping_add(1);
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Path with any directory prefix removed, as stored in name fields.
pub fn strip_path(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared file handles
// ─────────────────────────────────────────────────────────────────────────────

/// A segment file handle shared between the member walk and the codec's
/// segment-rollover path.  Both sides advance the same cursor, which is
/// exactly what spanning needs.
#[derive(Clone)]
pub struct SharedHandle(pub Rc<RefCell<File>>);

impl SharedHandle {
    pub fn new(file: File) -> Self {
        SharedHandle(Rc::new(RefCell::new(file)))
    }
}

impl Read for SharedHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.borrow_mut().read(buf)
    }
}

impl Write for SharedHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        self.0.borrow_mut().flush()
    }
}

impl Seek for SharedHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.0.borrow_mut().seek(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn name_fields_round_trip_and_truncate() {
        let mut buf = Vec::new();
        write_name_field(&mut buf, "MANIAC.EXE").unwrap();
        assert_eq!(buf.len(), NAME_FIELD_LEN);
        let name = read_name_field(&mut Cursor::new(buf)).unwrap();
        assert_eq!(name, "MANIAC.EXE");

        let mut long = Vec::new();
        write_name_field(&mut long, "AVERYLONGFILENAME.DAT").unwrap();
        let name = read_name_field(&mut Cursor::new(long)).unwrap();
        assert_eq!(name.len(), NAME_FIELD_LEN - 1);
    }

    #[test]
    fn segment_names_advance_the_disk_letter() {
        assert_eq!(bump_segment_name("INDY___C.XXX"), "INDY___D.XXX");
        assert_eq!(bump_segment_name("disks/LOOM___A.XXX"), "disks/LOOM___B.XXX");
    }

    #[test]
    fn member_header_round_trips() {
        let mut buf = Vec::new();
        write_u32_le(&mut buf, 1234).unwrap();
        write_name_field(&mut buf, "ROOM01.LFL").unwrap();
        buf.push(0);
        write_u32_le(&mut buf, 99999).unwrap();
        buf.extend_from_slice(&UNKNOWN_MEMBER_BYTES);

        let header = MemberHeader::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(header.data_length, 1234);
        assert_eq!(header.name, "ROOM01.LFL");
        assert_eq!(header.final_length, 99999);
        assert_eq!(header.unknown, UNKNOWN_MEMBER_BYTES);
    }

    #[test]
    fn tag_check_rejects_short_and_wrong_input() {
        assert!(read_tag(&mut Cursor::new(b"LFG!rest".to_vec()), SEGMENT_TAG));
        assert!(!read_tag(&mut Cursor::new(b"LFG".to_vec()), SEGMENT_TAG));
        assert!(!read_tag(&mut Cursor::new(b"FILE".to_vec()), SEGMENT_TAG));
    }
}
