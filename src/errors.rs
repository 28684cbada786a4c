//! Errors specific to building, serializing or reading resource data.

use alloc::string::String;

/// Error that can occur when reading and parsing bytes.
#[derive(Debug)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
#[cfg_attr(feature = "std", error("{0}"))]
pub struct ReadError(pub String);

/// Errors that can occur when modifying version info data.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum VersionInfoError {
    #[cfg_attr(feature = "std", error("invalid version string: {0:?}"))]
    InvalidVersion(String),
    #[cfg_attr(feature = "std", error("version info exceeds maximum length: {0} > 65535"))]
    TooLarge(u64),
}

/// Errors that can occur when modifying or reading resource data.
#[derive(Debug)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum ResourceError {
    #[cfg_attr(feature = "std", error("duplicate resource name: {0:?}"))]
    DuplicateName(String),
    #[cfg_attr(feature = "std", error("duplicate resource id: {0}"))]
    DuplicateId(u32),
    #[cfg_attr(feature = "std", error("invalid resource id: {0:#x}"))]
    InvalidId(u32),
    #[cfg_attr(feature = "std", error("resource name too long: {0} code units"))]
    NameTooLong(usize),
    #[cfg_attr(feature = "std", error("invalid directory: {0}"))]
    InvalidDirectory(usize),
    #[cfg_attr(feature = "std", error("resource section too large: {0} bytes"))]
    SectionTooLarge(u64),
    #[cfg_attr(feature = "std", error("invalid table: {0}"))]
    InvalidTable(String),
    #[cfg_attr(feature = "std", error("invalid bytes: {0}"))]
    InvalidBytes(ReadError),
}
impl From<ReadError> for ResourceError {
    fn from(error: ReadError) -> Self { ResourceError::InvalidBytes(error) }
}
