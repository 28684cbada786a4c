//! Builder for `VS_VERSIONINFO` resources.
//! See <https://learn.microsoft.com/en-us/windows/win32/menurc/vs-versioninfo> for the layout.
//!
//! A [`VersionInfo`] is populated through its setters and then frozen into a [`FrozenVersionInfo`],
//! which holds the computed length fields of every block and builds the raw resource bytes.

use alloc::{
    format,
    string::{String, ToString},
    vec::Vec,
};
use core::mem::size_of;

use ahash::RandomState;
use indexmap::IndexMap;
use log::{debug, trace};
use zerocopy::IntoBytes;

use crate::{constants::*, errors::*, types::*, util::*};

const VERSION_HEADER_SIZE: usize = size_of::<VersionHeader>();
const VERSION_ALIGNMENT: usize = 4;

/// Parse a version string of one to four dot-separated 16-bit components into a packed version number.
/// Missing trailing components are zero.
///
/// # Returns
/// Returns an error containing the input if it has more than four components, a non-numeric component or a component larger than 65535.
pub fn parse_version_string<S: AsRef<str>>(version: S) -> Result<u64, VersionInfoError> {
    let version = version.as_ref();
    let invalid = || VersionInfoError::InvalidVersion(version.to_string());
    let mut value = 0u64;
    for (i, component) in version.split('.').enumerate() {
        if i >= 4 || component.is_empty() || !component.bytes().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let component = component.parse::<u16>().map_err(|_| invalid())?;
        value |= (component as u64) << (48 - 16 * i);
    }
    Ok(value)
}

/// Format a packed version number as four dot-separated components.
pub fn format_version_string(version: u64) -> String {
    format!(
        "{}.{}.{}.{}",
        (version >> 48) & 0xffff,
        (version >> 32) & 0xffff,
        (version >> 16) & 0xffff,
        version & 0xffff
    )
}

/// Localized key-value strings for one language and codepage pair.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StringTable {
    language: LANGID,
    codepage: WORD,
    strings:  IndexMap<String, String, RandomState>,
}
impl StringTable {
    fn new(language: LANGID, codepage: WORD) -> Self {
        Self {
            language,
            codepage,
            strings: IndexMap::default(),
        }
    }

    /// Returns the language id of the table.
    pub fn language(&self) -> LANGID { self.language }

    /// Returns the codepage id of the table.
    pub fn codepage(&self) -> WORD { self.codepage }

    /// Returns the block key of the table, the language and codepage as eight hex digits.
    pub fn key(&self) -> String { format!("{:04x}{:04x}", self.language, self.codepage) }

    /// Get a string from the table.
    pub fn get(&self, key: &str) -> Option<&str> { self.strings.get(key).map(String::as_str) }

    /// Returns the strings in insertion order.
    pub fn strings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.strings.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize { self.strings.len() }

    pub fn is_empty(&self) -> bool { self.strings.is_empty() }

    fn to_block(&self) -> VersionBlock {
        VersionBlock::new(
            self.key(),
            VS_TYPE_TEXT,
            Vec::new(),
            self.strings
                .iter()
                .map(|(key, value)| {
                    VersionBlock::new(key.clone(), VS_TYPE_TEXT, string_to_u16(value), Vec::new())
                })
                .collect(),
        )
    }
}

/// Version information resource.
///
/// Holds the fixed file information, the string tables and the translation list.
/// Every mutation is checked against the 16-bit length limit of the resource format and rolled back if exceeded,
/// so [`VersionInfo::freeze`] cannot fail.
///
/// The root `VS_VERSION_INFO` block and the `Translation` block are written with type `0` (binary) as the
/// Windows resource compiler does, all other blocks with type `1` (text).
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct VersionInfo {
    file_version:    u64,
    product_version: u64,
    file_flags_mask: u32,
    file_flags:      u32,
    file_os:         u32,
    file_type:       u32,
    file_subtype:    u32,
    string_tables:   IndexMap<(LANGID, WORD), StringTable, RandomState>,
    translations:    Vec<(LANGID, WORD)>,
}
impl VersionInfo {
    pub fn new() -> Self { Self::default() }

    /// Set the file version from a dot-separated version string.
    pub fn set_file_version_string<S: AsRef<str>>(
        &mut self, version: S,
    ) -> Result<(), VersionInfoError> {
        self.file_version = parse_version_string(version)?;
        Ok(())
    }

    /// Returns the file version as a dot-separated version string.
    pub fn file_version_string(&self) -> String { format_version_string(self.file_version) }

    /// Set the product version from a dot-separated version string.
    pub fn set_product_version_string<S: AsRef<str>>(
        &mut self, version: S,
    ) -> Result<(), VersionInfoError> {
        self.product_version = parse_version_string(version)?;
        Ok(())
    }

    /// Returns the product version as a dot-separated version string.
    pub fn product_version_string(&self) -> String { format_version_string(self.product_version) }

    pub fn file_version(&self) -> u64 { self.file_version }

    pub fn set_file_version(&mut self, version: u64) { self.file_version = version; }

    pub fn product_version(&self) -> u64 { self.product_version }

    pub fn set_product_version(&mut self, version: u64) { self.product_version = version; }

    pub fn file_flags_mask(&self) -> u32 { self.file_flags_mask }

    pub fn set_file_flags_mask(&mut self, mask: u32) { self.file_flags_mask = mask; }

    pub fn file_flags(&self) -> u32 { self.file_flags }

    pub fn set_file_flags(&mut self, flags: u32) { self.file_flags = flags; }

    pub fn file_os(&self) -> u32 { self.file_os }

    pub fn set_file_os(&mut self, os: u32) { self.file_os = os; }

    pub fn file_type(&self) -> u32 { self.file_type }

    pub fn set_file_type(&mut self, file_type: u32) { self.file_type = file_type; }

    pub fn file_subtype(&self) -> u32 { self.file_subtype }

    pub fn set_file_subtype(&mut self, subtype: u32) { self.file_subtype = subtype; }

    /// Set a string in the table for the given language and codepage.
    /// The table is created if it doesn't exist yet. An existing string with the same key is replaced in place.
    ///
    /// # Returns
    /// Returns an error if the resulting version info would exceed the maximum resource length.
    /// The version info is left unchanged in that case.
    pub fn set_string<K: Into<String>, V: Into<String>>(
        &mut self, language: LANGID, codepage: WORD, key: K, value: V,
    ) -> Result<(), VersionInfoError> {
        let table_key = (language, codepage);
        let new_table = !self.string_tables.contains_key(&table_key);
        let table = self
            .string_tables
            .entry(table_key)
            .or_insert_with(|| StringTable::new(language, codepage));
        let (index, previous) = table.strings.insert_full(key.into(), value.into());

        if let Err(error) = self.check_size() {
            if new_table {
                self.string_tables.pop();
            } else if let Some(table) = self.string_tables.get_mut(&table_key) {
                match previous {
                    Some(previous) => table.strings[index] = previous,
                    None => {
                        table.strings.pop();
                    }
                }
            }
            return Err(error);
        }
        trace!("set string {:04x}{:04x} #{}", language, codepage, index);
        Ok(())
    }

    /// Get a string from the table for the given language and codepage.
    ///
    /// # Returns
    /// Returns `None` if either the table or the key doesn't exist.
    pub fn string(&self, language: LANGID, codepage: WORD, key: &str) -> Option<&str> {
        self.string_tables.get(&(language, codepage)).and_then(|table| table.get(key))
    }

    /// Get the string table for the given language and codepage.
    pub fn string_table(&self, language: LANGID, codepage: WORD) -> Option<&StringTable> {
        self.string_tables.get(&(language, codepage))
    }

    /// Returns the string tables in insertion order.
    pub fn string_tables(&self) -> impl Iterator<Item = &StringTable> { self.string_tables.values() }

    /// Add a language and codepage pair to the translation list in the `VarFileInfo` block.
    /// Adding a pair that is already listed has no effect.
    pub fn add_translation(
        &mut self, language: LANGID, codepage: WORD,
    ) -> Result<(), VersionInfoError> {
        if self.translations.contains(&(language, codepage)) {
            return Ok(());
        }
        self.translations.push((language, codepage));
        if let Err(error) = self.check_size() {
            self.translations.pop();
            return Err(error);
        }
        Ok(())
    }

    /// Returns the translation list.
    pub fn translations(&self) -> &[(LANGID, WORD)] { &self.translations }

    /// Returns the fixed file information as stored in the resource.
    pub fn fixed_file_info(&self) -> FixedFileInfo {
        FixedFileInfo {
            file_version_ms: (self.file_version >> 32) as u32,
            file_version_ls: self.file_version as u32,
            product_version_ms: (self.product_version >> 32) as u32,
            product_version_ls: self.product_version as u32,
            file_flags_mask: self.file_flags_mask,
            file_flags: self.file_flags,
            file_os: self.file_os,
            file_type: self.file_type,
            file_subtype: self.file_subtype,
            ..Default::default()
        }
    }

    /// Returns the size of the resulting resource in bytes.
    pub fn size(&self) -> u16 { self.to_block().measure() as u16 }

    /// Compute the length fields of all blocks.
    /// The version info can be recovered with [`FrozenVersionInfo::into_inner`] to be modified and frozen again.
    pub fn freeze(self) -> FrozenVersionInfo {
        let mut root = self.to_block();
        root.freeze();
        debug!("froze version info: length {}, value length {}", root.length, root.value_length);
        FrozenVersionInfo { info: self, root }
    }

    fn check_size(&self) -> Result<(), VersionInfoError> {
        let size = self.to_block().measure();
        if size > u16::MAX as u64 {
            return Err(VersionInfoError::TooLarge(size));
        }
        Ok(())
    }

    fn to_block(&self) -> VersionBlock {
        let mut children = Vec::new();
        if !self.string_tables.is_empty() {
            children.push(VersionBlock::new(
                VS_STRING_FILE_INFO_KEY,
                VS_TYPE_TEXT,
                Vec::new(),
                self.string_tables.values().map(StringTable::to_block).collect(),
            ));
        }
        if !self.translations.is_empty() {
            let translations = self
                .translations
                .iter()
                .flat_map(|&(language, codepage)| {
                    (language as u32 | (codepage as u32) << 16).to_le_bytes()
                })
                .collect();
            children.push(VersionBlock::new(
                VS_VAR_FILE_INFO_KEY,
                VS_TYPE_TEXT,
                Vec::new(),
                Vec::from([VersionBlock::new(
                    VS_TRANSLATION_KEY,
                    VS_TYPE_BINARY,
                    translations,
                    Vec::new(),
                )]),
            ));
        }
        VersionBlock::new(
            VS_VERSION_INFO_KEY,
            VS_TYPE_BINARY,
            self.fixed_file_info().as_bytes().to_vec(),
            children,
        )
    }
}

/// Block of a version info resource.
/// Each block consists of a header, its key, its value and its child blocks.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VersionBlock {
    key:          String,
    value_type:   WORD,
    value:        Vec<u8>,
    children:     Vec<VersionBlock>,
    length:       u16,
    value_length: u16,
}
impl VersionBlock {
    fn new<K: Into<String>>(
        key: K, value_type: WORD, value: Vec<u8>, children: Vec<VersionBlock>,
    ) -> Self {
        Self {
            key: key.into(),
            value_type,
            value,
            children,
            length: 0,
            value_length: 0,
        }
    }

    // header and key padded to the value, then every child aligned, without trailing padding
    fn block_length(&self, children: impl Iterator<Item = u64>) -> u64 {
        let header = VERSION_HEADER_SIZE as u64 + u16_len(&self.key) as u64 * 2;
        let length = aligned_to(header, VERSION_ALIGNMENT as u64) + self.value.len() as u64;
        children.fold(length, |length, child| aligned_to(length, VERSION_ALIGNMENT as u64) + child)
    }

    fn measure(&self) -> u64 { self.block_length(self.children.iter().map(VersionBlock::measure)) }

    fn freeze(&mut self) {
        self.children.iter_mut().for_each(VersionBlock::freeze);
        let length = self.block_length(self.children.iter().map(|child| child.length as u64));
        debug_assert!(length <= u16::MAX as u64, "version block {} too large", self.key);
        self.length = length as u16;
        self.value_length = self.value.len() as u16;
        trace!("{}: length {}, value length {}", self.key, self.length, self.value_length);
    }

    fn write(&self, data: &mut Vec<u8>) {
        let start = data.len();
        let header = VersionHeader {
            length:       self.length,
            value_length: self.value_length,
            type_:        self.value_type,
        };
        data.extend_from_slice(header.as_bytes());
        data.extend(string_to_u16(&self.key));
        pad_to(data, VERSION_ALIGNMENT);
        data.extend_from_slice(&self.value);
        for child in &self.children {
            pad_to(data, VERSION_ALIGNMENT);
            child.write(data);
        }
        debug_assert_eq!(data.len() - start, self.length as usize);
    }

    /// Returns the key of the block.
    pub fn key(&self) -> &str { &self.key }

    /// Returns the value type, `1` for text and `0` for binary data.
    pub fn value_type(&self) -> WORD { self.value_type }

    /// Returns the raw value bytes.
    pub fn value(&self) -> &[u8] { &self.value }

    /// Returns the total length of the block including its children.
    pub fn length(&self) -> u16 { self.length }

    /// Returns the length of the value in bytes.
    pub fn value_length(&self) -> u16 { self.value_length }

    pub fn children(&self) -> &[VersionBlock] { &self.children }

    pub fn child(&self, key: &str) -> Option<&VersionBlock> {
        self.children.iter().find(|child| child.key == key)
    }
}

/// Version info with computed block lengths, ready to be built.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FrozenVersionInfo {
    info: VersionInfo,
    root: VersionBlock,
}
impl FrozenVersionInfo {
    pub fn info(&self) -> &VersionInfo { &self.info }

    /// Returns the version info to be modified again.
    pub fn into_inner(self) -> VersionInfo { self.info }

    /// Returns the root `VS_VERSION_INFO` block.
    pub fn root(&self) -> &VersionBlock { &self.root }

    pub fn length(&self) -> u16 { self.root.length }

    pub fn value_length(&self) -> u16 { self.root.value_length }

    /// Returns the `StringFileInfo` block, present if any string is set.
    pub fn string_file_info(&self) -> Option<&VersionBlock> {
        self.root.child(VS_STRING_FILE_INFO_KEY)
    }

    /// Returns the `VarFileInfo` block, present if any translation is set.
    pub fn var_file_info(&self) -> Option<&VersionBlock> { self.root.child(VS_VAR_FILE_INFO_KEY) }

    /// Returns the string table block for the given language and codepage.
    pub fn string_table(&self, language: LANGID, codepage: WORD) -> Option<&VersionBlock> {
        let key = format!("{:04x}{:04x}", language, codepage);
        self.string_file_info().and_then(|info| info.child(&key))
    }

    /// Build the version info into raw bytes to be included as resource data.
    pub fn build(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.root.length as usize);
        self.root.write(&mut data);
        data
    }
}
