//! Decoding of filter enumeration pages.
//!
//! The Filter Manager fills a caller buffer with chained
//! `FILTER_FULL_INFORMATION` records:
//!
//! ```text
//! offset  size  field
//!      0     4  NextEntryOffset   (0 terminates the chain)
//!      4     4  FrameID
//!      8     4  NumberOfInstances
//!     12     2  FilterNameLength  (bytes)
//!     14     n  FilterNameBuffer  (UTF-16LE, not NUL-terminated)
//! ```
//!
//! Decoding is bounds-checked throughout. A page whose chain points outside
//! the written bytes ends early instead of failing.

// ============================================================================
// Layout
// ============================================================================

/// `sizeof(FILTER_FULL_INFORMATION)`, including the one-character name
/// buffer.
pub const RECORD_HEADER_LEN: usize = 16;

const NEXT_ENTRY_OFFSET: usize = 0;
const FRAME_ID_OFFSET: usize = 4;
const INSTANCES_OFFSET: usize = 8;
const NAME_LENGTH_OFFSET: usize = 12;
const NAME_OFFSET: usize = 14;

/// A decoded filter record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterRecord {
    /// Filter module name.
    pub name: String,
    /// Filter Manager frame the module is attached in.
    pub frame_id: u32,
    /// Number of volume instances.
    pub instances: u32,
}

fn read_u16(page: &[u8], at: usize) -> Option<u16> {
    let bytes = page.get(at..at.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_u32(page: &[u8], at: usize) -> Option<u32> {
    let bytes = page.get(at..at.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn decode_at(page: &[u8], at: usize) -> Option<FilterRecord> {
    let frame_id = read_u32(page, at + FRAME_ID_OFFSET)?;
    let instances = read_u32(page, at + INSTANCES_OFFSET)?;
    let name_len = usize::from(read_u16(page, at + NAME_LENGTH_OFFSET)?);

    let start = at + NAME_OFFSET;
    let raw = page.get(start..start.checked_add(name_len)?)?;
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    Some(FilterRecord {
        name: String::from_utf16_lossy(&units),
        frame_id,
        instances,
    })
}

/// Decodes every record in the first `page.len()` bytes of a page.
///
/// A record is decoded only if a full header fits before the end of the
/// written bytes. Records with an empty name are skipped. The chain stops at a zero offset, an offset leading past
/// the written bytes, or a name running past them.
#[must_use]
pub fn decode_page(page: &[u8]) -> Vec<FilterRecord> {
    let mut records = Vec::new();
    let mut at = 0usize;

    while at
        .checked_add(RECORD_HEADER_LEN)
        .is_some_and(|end| end <= page.len())
    {
        let Some(record) = decode_at(page, at) else {
            break;
        };
        if !record.name.is_empty() {
            records.push(record);
        }

        let next = match read_u32(page, at + NEXT_ENTRY_OFFSET) {
            Some(0) | None => break,
            Some(next) => next as usize,
        };
        match at.checked_add(next) {
            Some(following) => at = following,
            None => break,
        }
    }

    records
}

/// Encodes records into a chained page, 8-byte aligned like the OS output.
#[cfg(test)]
pub(crate) fn encode_page(records: &[FilterRecord]) -> Vec<u8> {
    let mut page = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let name: Vec<u8> = record
            .name
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .collect();
        let len = (NAME_OFFSET + name.len()).max(RECORD_HEADER_LEN);
        let aligned = len.div_ceil(8) * 8;
        let next = if index + 1 == records.len() { 0 } else { aligned };

        let start = page.len();
        page.resize(start + aligned, 0);
        page[start..start + 4].copy_from_slice(&(next as u32).to_le_bytes());
        page[start + 4..start + 8].copy_from_slice(&record.frame_id.to_le_bytes());
        page[start + 8..start + 12].copy_from_slice(&record.instances.to_le_bytes());
        page[start + 12..start + 14].copy_from_slice(&(name.len() as u16).to_le_bytes());
        page[start + 14..start + 14 + name.len()].copy_from_slice(&name);
    }
    page
}
