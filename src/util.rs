use alloc::{string::ToString, vec::Vec};
use core::{
    any::type_name,
    ops::{Add, Rem, Sub},
};

use zerocopy::FromBytes;

use crate::ReadError;

pub fn read<T: FromBytes + Copy>(resource: &[u8]) -> Result<T, ReadError> {
    T::read_from_prefix(resource)
        .map_err(|_| ReadError(type_name::<T>().to_string()))
        .map(|(value, _)| value)
}

pub fn aligned_to<T: Add<Output = T> + Sub<Output = T> + Rem<Output = T> + Eq + Copy + Default>(
    value: T, alignment: T,
) -> T {
    if value % alignment == T::default() {
        return value;
    }
    value + alignment - (value % alignment)
}

/// Pad the buffer with zeroes until its length is a multiple of the alignment.
pub fn pad_to(data: &mut Vec<u8>, alignment: usize) {
    data.resize(aligned_to(data.len(), alignment), 0);
}

/// Number of UTF-16 code units needed to encode the string.
pub fn u16_len<S: AsRef<str>>(string: S) -> usize { string.as_ref().encode_utf16().count() }

/// Encode the string as little-endian UTF-16 without a terminator.
pub fn string_to_u16<S: AsRef<str>>(string: S) -> Vec<u8> {
    let string = string.as_ref();
    let mut data = Vec::with_capacity(string.len() * 2);
    data.extend(string.encode_utf16().flat_map(|c| c.to_le_bytes()));
    data
}

/// Decode `length` little-endian UTF-16 code units, replacing invalid surrogates.
pub fn read_u16_string(data: &[u8], length: usize) -> Result<alloc::string::String, ReadError> {
    if data.len() < length * 2 {
        return Err(ReadError(alloc::format!(
            "string of {} code units exceeds {} available bytes",
            length,
            data.len()
        )));
    }
    let units = data[..length * 2].chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]]));
    Ok(core::char::decode_utf16(units)
        .map(|c| c.unwrap_or(core::char::REPLACEMENT_CHARACTER))
        .collect())
}
