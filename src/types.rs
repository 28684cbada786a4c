//! Resource section data types.
//!
//! These types are a one-to-one mapping of the data described in <https://learn.microsoft.com/en-us/windows/win32/debug/pe-format#the-rsrc-section>
//! and <https://learn.microsoft.com/en-us/windows/win32/menurc/version-information-structures>.

use zerocopy::{FromBytes, Immutable, IntoBytes};

use crate::constants::*;

#[repr(C, packed(2))]
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, FromBytes, IntoBytes, Immutable, Default,
)]
pub struct VersionU16 {
    pub major: u16,
    pub minor: u16,
}

#[repr(C, packed(2))]
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, FromBytes, IntoBytes, Immutable, Default,
)]
pub struct ResourceDirectoryTable {
    pub characteristics:        u32,
    pub time_date_stamp:        u32,
    pub version:                VersionU16,
    pub number_of_name_entries: u16,
    pub number_of_id_entries:   u16,
}

#[repr(C, packed(4))]
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, FromBytes, IntoBytes, Immutable, Default,
)]
pub struct ResourceDirectoryEntry {
    pub name_offset_or_integer_id:         u32,
    pub data_entry_or_subdirectory_offset: u32,
}

#[repr(C, packed(4))]
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, FromBytes, IntoBytes, Immutable, Default,
)]
pub struct ResourceDataEntry {
    pub data_rva: u32,
    pub size:     u32,
    pub codepage: u32,
    pub reserved: u32,
}

/// `VS_FIXEDFILEINFO`, the value of the root `VS_VERSIONINFO` block.
#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, FromBytes, IntoBytes, Immutable)]
pub struct FixedFileInfo {
    pub signature:          u32,
    pub struct_version:     u32,
    pub file_version_ms:    u32,
    pub file_version_ls:    u32,
    pub product_version_ms: u32,
    pub product_version_ls: u32,
    pub file_flags_mask:    u32,
    pub file_flags:         u32,
    pub file_os:            u32,
    pub file_type:          u32,
    pub file_subtype:       u32,
    pub file_date:          u64,
}
impl Default for FixedFileInfo {
    fn default() -> Self {
        Self {
            signature:          VS_FIXEDFILEINFO_SIGNATURE,
            struct_version:     VS_FIXEDFILEINFO_VERSION,
            file_version_ms:    0,
            file_version_ls:    0,
            product_version_ms: 0,
            product_version_ls: 0,
            file_flags_mask:    0,
            file_flags:         0,
            file_os:            VOS_UNKNOWN,
            file_type:          VFT_UNKNOWN,
            file_subtype:       VFT2_UNKNOWN,
            file_date:          0,
        }
    }
}

/// Header shared by every block of a `VS_VERSIONINFO` resource.
#[repr(C, packed(2))]
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, FromBytes, IntoBytes, Immutable, Default,
)]
pub struct VersionHeader {
    pub length:       u16,
    pub value_length: u16,
    pub type_:        u16,
}
