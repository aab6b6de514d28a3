// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Binary dataset file format (.tsd)
//!
//! # Layout
//!
//! ```text
//! +---------------------------------------------------------+
//! |                    File Header (64 bytes)                |
//! |  Magic (8) | Version (4) | Flags (4) | Project (4)      |
//! |  TagCount (4) | SampleCount (8) | FirstTs (8)           |
//! |  LastTs (8) | TagTableSize (4) | TagTableCrc (4) | ...  |
//! +---------------------------------------------------------+
//! |                    Tag Table                             |
//! |  (name_len u16 | name bytes)[]                           |
//! +---------------------------------------------------------+
//! |                    Segment 0                             |
//! |  SegmentHeader (32) | Record[] | CRC32 (4)              |
//! +---------------------------------------------------------+
//! |                    Segment 1 ...                         |
//! +---------------------------------------------------------+
//! ```
//!
//! A record is `tag_id u32 | timestamp_ns i64 | value f64 bits`, 20 bytes.
//! All integers are little-endian. Timestamps are nanoseconds since the Unix
//! epoch of the naive wall-clock time.
//!
//! Decoding is strict: bad magic, unknown version, CRC mismatch, an
//! out-of-range tag id, out-of-order records, a repeated `(tag, timestamp)`
//! pair or trailing bytes all fail.

use crate::sample::{from_epoch_nanos, to_epoch_nanos, Sample};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor, Read, Write};
use thiserror::Error;

/// Magic bytes: "TAGSTOR\0"
pub const MAGIC: [u8; 8] = *b"TAGSTOR\0";

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Maximum records per segment.
pub const SEGMENT_CAPACITY: usize = 4096;

const RECORD_SIZE: usize = 20;

/// Dataset file errors.
#[derive(Debug, Error)]
pub enum DatasetFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    #[error("version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: u32, got: u32 },

    #[error("CRC mismatch in tag table")]
    TagTableCrcMismatch,

    #[error("CRC mismatch in segment {segment_id}")]
    CrcMismatch { segment_id: u32 },

    #[error("timestamp {0} cannot be represented in nanoseconds")]
    TimestampOutOfRange(chrono::NaiveDateTime),
}

/// File header (64 bytes, fixed).
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    pub magic: [u8; 8],
    pub version: u32,
    /// Reserved, written as 0.
    pub flags: u32,
    pub project: u32,
    pub tag_count: u32,
    pub sample_count: u64,
    /// First timestamp (ns), 0 when empty.
    pub first_timestamp: i64,
    /// Last timestamp (ns), 0 when empty.
    pub last_timestamp: i64,
    pub tag_table_size: u32,
    pub tag_table_crc: u32,
    pub segment_count: u32,
    pub reserved: u32,
}

impl FileHeader {
    pub const SIZE: usize = 64;

    pub fn new(project: u32) -> Self {
        Self {
            magic: MAGIC,
            version: FORMAT_VERSION,
            flags: 0,
            project,
            tag_count: 0,
            sample_count: 0,
            first_timestamp: 0,
            last_timestamp: 0,
            tag_table_size: 0,
            tag_table_crc: 0,
            segment_count: 0,
            reserved: 0,
        }
    }

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.magic)?;
        w.write_u32::<LittleEndian>(self.version)?;
        w.write_u32::<LittleEndian>(self.flags)?;
        w.write_u32::<LittleEndian>(self.project)?;
        w.write_u32::<LittleEndian>(self.tag_count)?;
        w.write_u64::<LittleEndian>(self.sample_count)?;
        w.write_i64::<LittleEndian>(self.first_timestamp)?;
        w.write_i64::<LittleEndian>(self.last_timestamp)?;
        w.write_u32::<LittleEndian>(self.tag_table_size)?;
        w.write_u32::<LittleEndian>(self.tag_table_crc)?;
        w.write_u32::<LittleEndian>(self.segment_count)?;
        w.write_u32::<LittleEndian>(self.reserved)?;
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self, DatasetFileError> {
        let mut magic = [0u8; 8];
        r.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(DatasetFileError::InvalidFormat(
                "invalid dataset file magic".into(),
            ));
        }

        let version = r.read_u32::<LittleEndian>()?;
        if version != FORMAT_VERSION {
            return Err(DatasetFileError::VersionMismatch {
                expected: FORMAT_VERSION,
                got: version,
            });
        }

        Ok(Self {
            magic,
            version,
            flags: r.read_u32::<LittleEndian>()?,
            project: r.read_u32::<LittleEndian>()?,
            tag_count: r.read_u32::<LittleEndian>()?,
            sample_count: r.read_u64::<LittleEndian>()?,
            first_timestamp: r.read_i64::<LittleEndian>()?,
            last_timestamp: r.read_i64::<LittleEndian>()?,
            tag_table_size: r.read_u32::<LittleEndian>()?,
            tag_table_crc: r.read_u32::<LittleEndian>()?,
            segment_count: r.read_u32::<LittleEndian>()?,
            reserved: r.read_u32::<LittleEndian>()?,
        })
    }
}

/// Segment header (32 bytes).
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentHeader {
    pub segment_id: u32,
    pub record_count: u32,
    pub data_size: u32,
    pub first_timestamp: i64,
    pub last_timestamp: i64,
    pub reserved: u32,
}

impl SegmentHeader {
    pub const SIZE: usize = 32;

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.segment_id)?;
        w.write_u32::<LittleEndian>(self.record_count)?;
        w.write_u32::<LittleEndian>(self.data_size)?;
        w.write_i64::<LittleEndian>(self.first_timestamp)?;
        w.write_i64::<LittleEndian>(self.last_timestamp)?;
        w.write_u32::<LittleEndian>(self.reserved)?;
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            segment_id: r.read_u32::<LittleEndian>()?,
            record_count: r.read_u32::<LittleEndian>()?,
            data_size: r.read_u32::<LittleEndian>()?,
            first_timestamp: r.read_i64::<LittleEndian>()?,
            last_timestamp: r.read_i64::<LittleEndian>()?,
            reserved: r.read_u32::<LittleEndian>()?,
        })
    }
}

/// Decoded file contents.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedDataset {
    pub header: FileHeader,
    pub samples: Vec<Sample>,
}

/// Encode sorted samples into a complete file image.
pub fn encode(project: u32, samples: &[Sample]) -> Result<Vec<u8>, DatasetFileError> {
    let mut tag_ids: HashMap<&str, u32> = HashMap::new();
    let mut tag_table = Vec::new();
    let mut records = Vec::with_capacity(samples.len());

    for sample in samples {
        let next_id = tag_ids.len() as u32;
        let tag_id = *tag_ids.entry(sample.tag.as_str()).or_insert_with(|| next_id);
        if tag_id == next_id {
            let name = sample.tag.as_bytes();
            let len = u16::try_from(name.len()).map_err(|_| {
                DatasetFileError::InvalidFormat(format!("tag name too long: {}", sample.tag))
            })?;
            tag_table.write_u16::<LittleEndian>(len)?;
            tag_table.write_all(name)?;
        }

        let nanos = to_epoch_nanos(sample.timestamp)
            .ok_or(DatasetFileError::TimestampOutOfRange(sample.timestamp))?;
        records.push((tag_id, nanos, sample.value));
    }

    let mut header = FileHeader::new(project);
    header.tag_count = tag_ids.len() as u32;
    header.sample_count = records.len() as u64;
    header.first_timestamp = records.first().map(|r| r.1).unwrap_or(0);
    header.last_timestamp = records.last().map(|r| r.1).unwrap_or(0);
    header.tag_table_size = tag_table.len() as u32;
    header.tag_table_crc = crc32fast::hash(&tag_table);
    header.segment_count = records.chunks(SEGMENT_CAPACITY).count() as u32;

    let mut out = Vec::with_capacity(
        FileHeader::SIZE
            + tag_table.len()
            + records.len() * RECORD_SIZE
            + header.segment_count as usize * (SegmentHeader::SIZE + 4),
    );
    header.write(&mut out)?;
    out.write_all(&tag_table)?;

    for (segment_id, chunk) in records.chunks(SEGMENT_CAPACITY).enumerate() {
        let mut data = Vec::with_capacity(chunk.len() * RECORD_SIZE);
        for &(tag_id, nanos, value) in chunk {
            data.write_u32::<LittleEndian>(tag_id)?;
            data.write_i64::<LittleEndian>(nanos)?;
            data.write_u64::<LittleEndian>(value.to_bits())?;
        }

        let seg_header = SegmentHeader {
            segment_id: segment_id as u32,
            record_count: chunk.len() as u32,
            data_size: data.len() as u32,
            first_timestamp: chunk.first().map(|r| r.1).unwrap_or(0),
            last_timestamp: chunk.last().map(|r| r.1).unwrap_or(0),
            reserved: 0,
        };
        seg_header.write(&mut out)?;
        out.write_all(&data)?;
        out.write_u32::<LittleEndian>(crc32fast::hash(&data))?;
    }

    Ok(out)
}

/// Decode and validate a complete file image.
pub fn decode(bytes: &[u8]) -> Result<DecodedDataset, DatasetFileError> {
    let mut cursor = Cursor::new(bytes);
    let header = FileHeader::read(&mut cursor)?;

    let mut tag_table = vec![0u8; header.tag_table_size as usize];
    cursor.read_exact(&mut tag_table)?;
    if crc32fast::hash(&tag_table) != header.tag_table_crc {
        return Err(DatasetFileError::TagTableCrcMismatch);
    }
    let tags = read_tag_table(&tag_table, header.tag_count)?;

    let mut samples = Vec::with_capacity(header.sample_count.min(bytes.len() as u64) as usize);
    let mut previous = i64::MIN;
    // Tag ids already seen at `previous`.
    let mut at_previous: HashSet<u32> = HashSet::new();

    for expected_id in 0..header.segment_count {
        let seg_header = SegmentHeader::read(&mut cursor)?;
        if seg_header.segment_id != expected_id {
            return Err(DatasetFileError::InvalidFormat(format!(
                "expected segment {expected_id}, found {}",
                seg_header.segment_id
            )));
        }
        if seg_header.data_size as usize != seg_header.record_count as usize * RECORD_SIZE {
            return Err(DatasetFileError::InvalidFormat(format!(
                "segment {expected_id} size does not match its record count"
            )));
        }

        let mut data = vec![0u8; seg_header.data_size as usize];
        cursor.read_exact(&mut data)?;
        let crc = cursor.read_u32::<LittleEndian>()?;
        if crc32fast::hash(&data) != crc {
            return Err(DatasetFileError::CrcMismatch {
                segment_id: expected_id,
            });
        }

        let mut records = Cursor::new(data.as_slice());
        for _ in 0..seg_header.record_count {
            let tag_id = records.read_u32::<LittleEndian>()?;
            let nanos = records.read_i64::<LittleEndian>()?;
            let value = f64::from_bits(records.read_u64::<LittleEndian>()?);

            let tag = tags.get(tag_id as usize).ok_or_else(|| {
                DatasetFileError::InvalidFormat(format!("unknown tag id {tag_id}"))
            })?;
            if nanos < previous {
                return Err(DatasetFileError::InvalidFormat(
                    "records are not in timestamp order".into(),
                ));
            }
            if nanos > previous {
                previous = nanos;
                at_previous.clear();
            }
            if !at_previous.insert(tag_id) {
                return Err(DatasetFileError::InvalidFormat(format!(
                    "duplicate record for tag {tag} at {nanos}"
                )));
            }

            let timestamp = from_epoch_nanos(nanos).ok_or_else(|| {
                DatasetFileError::InvalidFormat(format!("invalid timestamp {nanos}"))
            })?;
            samples.push(Sample::new(tag.clone(), timestamp, value));
        }
    }

    if samples.len() as u64 != header.sample_count {
        return Err(DatasetFileError::InvalidFormat(format!(
            "header declares {} samples, found {}",
            header.sample_count,
            samples.len()
        )));
    }
    if (cursor.position() as usize) != bytes.len() {
        return Err(DatasetFileError::InvalidFormat(
            "trailing bytes after last segment".into(),
        ));
    }

    Ok(DecodedDataset { header, samples })
}

fn read_tag_table(table: &[u8], count: u32) -> Result<Vec<String>, DatasetFileError> {
    let mut cursor = Cursor::new(table);
    let mut tags = Vec::with_capacity(count.min(u16::MAX as u32) as usize);

    for _ in 0..count {
        let len = cursor.read_u16::<LittleEndian>()? as usize;
        let mut name = vec![0u8; len];
        cursor.read_exact(&mut name)?;
        let name = String::from_utf8(name)
            .map_err(|_| DatasetFileError::InvalidFormat("tag name is not UTF-8".into()))?;
        if tags.contains(&name) {
            return Err(DatasetFileError::InvalidFormat(format!(
                "tag {name} appears twice in the tag table"
            )));
        }
        tags.push(name);
    }

    if (cursor.position() as usize) != table.len() {
        return Err(DatasetFileError::InvalidFormat(
            "tag table size does not match tag count".into(),
        ));
    }
    Ok(tags)
}
