//! Binary format of a persisted blackboard key table.
//!
//! ```text
//! offset  size  field
//!      0     4  magic "BlkK"
//!      4     4  endian marker 0x0000FFFE in the writer's byte order
//!      8     2  version, (major << 8) | minor
//!     10     2  oldest version a reader must understand
//!     12    32  reserved
//!     44     4  key count
//!     48     4  offset of the key records
//!     52     4  offset of the string blob
//! ```
//!
//! Version 1.x key records are four `u32`s each: key, slot size, name offset
//! into the string blob and name length in bytes. Names are UTF-8.

use crate::error::KeyFileError;
use crate::key::{BlackboardKey, KeyRecord};
use nom::{
    bytes::complete::take,
    multi::count,
    number::{
        complete::{u16 as parse_u16, u32 as parse_u32},
        Endianness,
    },
    sequence::tuple,
    IResult,
};

pub const MAGIC: &[u8; 4] = b"BlkK";
pub const ENDIAN_MARKER: u32 = 0x0000_FFFE;
pub const VERSION_1_0: u16 = make_version(1, 0);
pub const HEADER_SIZE: usize = 56;
const RESERVED_SIZE: usize = 32;
const RECORD_SIZE: usize = 16;

pub const fn make_version(major: u8, minor: u8) -> u16 {
    ((major as u16) << 8) | minor as u16
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyFileHeader {
    pub endian: Endianness,
    pub version: u16,
    pub min_version: u16,
    pub key_count: u32,
    pub key_indices_offset: u32,
    pub string_blob_offset: u32,
}

impl KeyFileHeader {
    pub fn major(&self) -> u8 {
        (self.version >> 8) as u8
    }

    pub fn minor(&self) -> u8 {
        self.version as u8
    }
}

fn truncated<E>(_: nom::Err<E>) -> KeyFileError {
    KeyFileError::Truncated
}

fn marker_endianness(marker: &[u8]) -> Result<Endianness, KeyFileError> {
    let bytes: [u8; 4] = marker.try_into().map_err(|_| KeyFileError::Truncated)?;
    if u32::from_le_bytes(bytes) == ENDIAN_MARKER {
        Ok(Endianness::Little)
    } else if u32::from_be_bytes(bytes) == ENDIAN_MARKER {
        Ok(Endianness::Big)
    } else {
        Err(KeyFileError::BadEndianMarker(u32::from_le_bytes(bytes)))
    }
}

fn header_fields(endian: Endianness, i: &[u8]) -> IResult<&[u8], KeyFileHeader> {
    let (i, (version, min_version, _, key_count, key_indices_offset, string_blob_offset)) =
        tuple((
            parse_u16(endian),
            parse_u16(endian),
            take(RESERVED_SIZE),
            parse_u32(endian),
            parse_u32(endian),
            parse_u32(endian),
        ))(i)?;
    Ok((
        i,
        KeyFileHeader {
            endian,
            version,
            min_version,
            key_count,
            key_indices_offset,
            string_blob_offset,
        },
    ))
}

fn record(endian: Endianness, i: &[u8]) -> IResult<&[u8], (u32, u32, u32, u32)> {
    tuple((
        parse_u32(endian),
        parse_u32(endian),
        parse_u32(endian),
        parse_u32(endian),
    ))(i)
}

/// Reads and validates the header. Files from a newer major version are
/// accepted only if they declare version 1 as their minimum.
pub fn parse_header(input: &[u8]) -> Result<KeyFileHeader, KeyFileError> {
    if input.len() < HEADER_SIZE {
        return Err(KeyFileError::Truncated);
    }
    if &input[..4] != MAGIC {
        return Err(KeyFileError::BadMagic);
    }
    let endian = marker_endianness(&input[4..8])?;
    let (_, header) = header_fields(endian, &input[8..]).map_err(truncated)?;

    let known = |version: u16| version >> 8 == 1;
    if !known(header.version) && !known(header.min_version) {
        return Err(KeyFileError::UnsupportedVersion {
            version: header.version,
            min_version: header.min_version,
        });
    }
    Ok(header)
}

/// Decodes a whole key table, converting from the writer's byte order.
pub fn decode(input: &[u8]) -> Result<Vec<KeyRecord>, KeyFileError> {
    let header = parse_header(input)?;
    let key_count = header.key_count as usize;

    let records = input
        .get(header.key_indices_offset as usize..)
        .ok_or(KeyFileError::Malformed("key records start past the end"))?;
    if records.len() / RECORD_SIZE < key_count {
        return Err(KeyFileError::Truncated);
    }
    let (_, raw) =
        count(|i| record(header.endian, i), key_count)(records).map_err(truncated)?;

    let blob = input
        .get(header.string_blob_offset as usize..)
        .ok_or(KeyFileError::Malformed("string blob starts past the end"))?;

    raw.into_iter()
        .map(|(key, size, name_offset, name_len)| {
            let start = name_offset as usize;
            let bytes = start
                .checked_add(name_len as usize)
                .and_then(|end| blob.get(start..end))
                .ok_or(KeyFileError::Malformed("key name outside the string blob"))?;
            let name = std::str::from_utf8(bytes)
                .map_err(|_| KeyFileError::Malformed("key name is not UTF-8"))?;
            Ok(KeyRecord {
                key: BlackboardKey::new(key),
                size: size as usize,
                name: name.to_string(),
            })
        })
        .collect()
}

/// Encodes a key table in native byte order.
pub fn encode(records: &[KeyRecord]) -> Result<Vec<u8>, KeyFileError> {
    encode_in(records, Endianness::Native)
}

fn encode_in(records: &[KeyRecord], endian: Endianness) -> Result<Vec<u8>, KeyFileError> {
    let put_u16 = |buf: &mut Vec<u8>, v: u16| match endian {
        Endianness::Big => buf.extend_from_slice(&v.to_be_bytes()),
        Endianness::Little => buf.extend_from_slice(&v.to_le_bytes()),
        Endianness::Native => buf.extend_from_slice(&v.to_ne_bytes()),
    };
    let put_u32 = |buf: &mut Vec<u8>, v: u32| match endian {
        Endianness::Big => buf.extend_from_slice(&v.to_be_bytes()),
        Endianness::Little => buf.extend_from_slice(&v.to_le_bytes()),
        Endianness::Native => buf.extend_from_slice(&v.to_ne_bytes()),
    };
    let to_u32 = |v: usize| {
        u32::try_from(v).map_err(|_| KeyFileError::Malformed("value exceeds 32 bits"))
    };

    let records_offset = HEADER_SIZE;
    let blob_offset = records_offset + records.len() * RECORD_SIZE;

    let mut buf = Vec::with_capacity(blob_offset);
    buf.extend_from_slice(MAGIC);
    put_u32(&mut buf, ENDIAN_MARKER);
    put_u16(&mut buf, VERSION_1_0);
    put_u16(&mut buf, VERSION_1_0);
    buf.extend_from_slice(&[0; RESERVED_SIZE]);
    put_u32(&mut buf, to_u32(records.len())?);
    put_u32(&mut buf, to_u32(records_offset)?);
    put_u32(&mut buf, to_u32(blob_offset)?);

    let mut blob = Vec::new();
    for record in records {
        put_u32(&mut buf, record.key.get());
        put_u32(&mut buf, to_u32(record.size)?);
        put_u32(&mut buf, to_u32(blob.len())?);
        put_u32(&mut buf, to_u32(record.name.len())?);
        blob.extend_from_slice(record.name.as_bytes());
    }
    buf.extend_from_slice(&blob);
    Ok(buf)
}
