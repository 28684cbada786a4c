//! Data types for building the resource section.
//! The resource section contains the resource directory and the resource data.
//! See <https://learn.microsoft.com/en-us/windows/win32/debug/pe-format#the-rsrc-section> for more information.
//!
//! The directory tree is stored as an arena of [`ResourceTable`]s addressed by [`DirectoryId`].
//! Freezing a [`ResourceTree`] assigns every table, entry, name string and data entry its offset in the section,
//! laid out as directory tables, name strings, data entry descriptions and finally the raw data.

use alloc::{
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};
use core::{convert::Infallible, ops::Range};

use ahash::RandomState;
use debug_ignore::DebugIgnore;
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace, warn};
use zerocopy::IntoBytes;

use crate::{constants::*, errors::*, types::*, util::*, version_info::*};

/// Handle of a table in a [`ResourceTree`].
///
/// Handles are plain indices and are only meaningful for the tree that returned them.
/// A handle from another tree is rejected only if it is out of range for this one.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DirectoryId(usize);
impl DirectoryId {
    /// Returns the index of the table in the tree.
    pub fn index(&self) -> usize { self.0 }
}

/// Resource directory entry name.
/// This can either be a raw id or a name.
///
/// Names order before ids, names by string comparison and ids numerically.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ResourceEntryName {
    Name(String),
    ID(u32),
}
impl ResourceEntryName {
    pub fn from_string<S: AsRef<str>>(string: S) -> Self { Self::Name(string.as_ref().to_string()) }

    /// Returns the name if this is a named entry.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::ID(_) => None,
        }
    }

    /// Returns the id if this is an id entry.
    pub fn id(&self) -> Option<u32> {
        match self {
            Self::Name(_) => None,
            Self::ID(id) => Some(*id),
        }
    }

    // 2 byte length + UTF-16 data
    fn string_size(&self) -> u32 {
        match self {
            Self::Name(name) => 2 + u16_len(name) as u32 * 2,
            Self::ID(_) => 0,
        }
    }
}
impl From<&str> for ResourceEntryName {
    fn from(name: &str) -> Self { Self::Name(name.to_string()) }
}
impl From<String> for ResourceEntryName {
    fn from(name: String) -> Self { Self::Name(name) }
}
impl From<u32> for ResourceEntryName {
    fn from(id: u32) -> Self { Self::ID(id) }
}
impl From<u16> for ResourceEntryName {
    fn from(id: u16) -> Self { Self::ID(id as u32) }
}

/// Raw resource data.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ResourceData {
    data:     DebugIgnore<Vec<u8>>,
    codepage: u32,
}
impl ResourceData {
    pub fn new<D: Into<Vec<u8>>>(data: D) -> Self {
        Self {
            data:     DebugIgnore(data.into()),
            codepage: 0,
        }
    }

    /// Returns the raw data.
    pub fn data(&self) -> &[u8] { &self.data }

    /// Returns the codepage of the data.
    pub fn codepage(&self) -> u32 { self.codepage }

    /// Set the raw data.
    pub fn set_data(&mut self, data: Vec<u8>) { self.data = data.into(); }

    /// Set the codepage of the data.
    pub fn set_codepage(&mut self, codepage: u32) { self.codepage = codepage; }

    pub fn len(&self) -> usize { self.data.len() }

    pub fn is_empty(&self) -> bool { self.data.is_empty() }
}
impl From<Vec<u8>> for ResourceData {
    fn from(data: Vec<u8>) -> Self { Self::new(data) }
}
impl From<&[u8]> for ResourceData {
    fn from(data: &[u8]) -> Self { Self::new(data) }
}

/// Resource entry in a resource table.
/// This can be either a child table or raw data.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ResourceEntry {
    Table(DirectoryId),
    Data(ResourceData),
}
impl ResourceEntry {
    pub fn as_table(&self) -> Option<DirectoryId> {
        match self {
            ResourceEntry::Table(table) => Some(*table),
            ResourceEntry::Data(_) => None,
        }
    }

    pub fn as_data(&self) -> Option<&ResourceData> {
        match self {
            ResourceEntry::Table(_) => None,
            ResourceEntry::Data(data) => Some(data),
        }
    }

    // entry, description and aligned data, not counting a child table
    fn size_bound(&self) -> u64 {
        match self {
            ResourceEntry::Table(_) => RESOURCE_DIRECTORY_ENTRY_SIZE as u64,
            ResourceEntry::Data(data) => {
                (RESOURCE_DIRECTORY_ENTRY_SIZE + RESOURCE_DATA_ENTRY_SIZE) as u64
                    + aligned_to(data.len() as u64, RESOURCE_DATA_ALIGNMENT as u64)
            }
        }
    }
}

/// Portable executable resource table.
/// Named entries are kept before id entries, each sorted by their name.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ResourceTable {
    characteristics: u32,
    name_entries:    Vec<(ResourceEntryName, ResourceEntry)>,
    id_entries:      Vec<(ResourceEntryName, ResourceEntry)>,
}
impl ResourceTable {
    fn new(characteristics: u32) -> Self {
        Self {
            characteristics,
            ..Default::default()
        }
    }

    pub fn characteristics(&self) -> u32 { self.characteristics }

    /// Returns the entries in serialization order, named entries first.
    pub fn entries(&self) -> impl Iterator<Item = (&ResourceEntryName, &ResourceEntry)> {
        self.name_entries.iter().chain(self.id_entries.iter()).map(|(name, entry)| (name, entry))
    }

    pub fn name_entries(&self) -> &[(ResourceEntryName, ResourceEntry)] { &self.name_entries }

    pub fn id_entries(&self) -> &[(ResourceEntryName, ResourceEntry)] { &self.id_entries }

    /// Get the first resource entry with the given name.
    pub fn get<N: Into<ResourceEntryName>>(&self, name: N) -> Option<&ResourceEntry> {
        let name = name.into();
        self.entries().find(|(entry_name, _)| **entry_name == name).map(|(_, entry)| entry)
    }

    /// Returns the child tables in serialization order.
    pub fn subdirectories(&self) -> impl Iterator<Item = DirectoryId> + '_ {
        self.entries().filter_map(|(_, entry)| entry.as_table())
    }

    /// Returns the data entries in serialization order.
    pub fn datas(&self) -> impl Iterator<Item = &ResourceData> {
        self.entries().filter_map(|(_, entry)| entry.as_data())
    }

    pub fn len(&self) -> usize { self.name_entries.len() + self.id_entries.len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    fn entries_mut(
        &mut self, name: &ResourceEntryName,
    ) -> &mut Vec<(ResourceEntryName, ResourceEntry)> {
        match name {
            ResourceEntryName::Name(_) => &mut self.name_entries,
            ResourceEntryName::ID(_) => &mut self.id_entries,
        }
    }

    fn contains(&self, name: &ResourceEntryName) -> bool {
        let entries = match name {
            ResourceEntryName::Name(_) => &self.name_entries,
            ResourceEntryName::ID(_) => &self.id_entries,
        };
        entries.binary_search_by(|(entry_name, _)| entry_name.cmp(name)).is_ok()
    }

    // after any entries with an equal name, keeping insertion order
    fn push(&mut self, name: ResourceEntryName, entry: ResourceEntry) {
        let entries = self.entries_mut(&name);
        let index = entries.partition_point(|(entry_name, _)| *entry_name <= name);
        entries.insert(index, (name, entry));
    }
}

/// Portable executable resource directory tree.
///
/// Tables are added below existing tables by name or id and are never removed.
/// Entries with duplicate names are accepted unless [`ResourceTree::set_unique_keys`] is enabled.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResourceTree {
    tables:      Vec<ResourceTable>,
    unique_keys: bool,
    // upper bound of the section size, ignoring string deduplication
    size_bound:  u64,
}
impl Default for ResourceTree {
    fn default() -> Self { Self::new() }
}
impl ResourceTree {
    /// Create a tree with an empty root table.
    pub fn new() -> Self { Self::with_characteristics(0) }

    /// Create a tree with an empty root table with the given characteristics.
    pub fn with_characteristics(characteristics: u32) -> Self {
        Self {
            tables:      vec![ResourceTable::new(characteristics)],
            unique_keys: false,
            size_bound:  (RESOURCE_DIRECTORY_TABLE_SIZE + RESOURCE_DATA_ENTRY_ALIGNMENT) as u64,
        }
    }

    /// Parse a resource section built for the given virtual address.
    ///
    /// # Returns
    /// Returns an error if the section is truncated, references data outside the section or contains a table more than once.
    pub fn parse(section: &[u8], virtual_address: u32) -> Result<Self, ResourceError> {
        let root = read::<ResourceDirectoryTable>(section)?;
        let mut tree = Self::with_characteristics(root.characteristics);
        let mut visited = IndexSet::<u32, RandomState>::default();
        visited.insert(0);

        // tables still to be read, nesting depth is limited only by the section
        let mut pending = vec![(0u32, tree.root(), 0usize)];
        while let Some((offset, directory, level)) = pending.pop() {
            tree.parse_table(
                section,
                virtual_address,
                offset,
                directory,
                level,
                &mut visited,
                &mut pending,
            )?;
        }
        debug!("parsed resource tree with {} tables", tree.tables.len());
        Ok(tree)
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_table(
        &mut self, section: &[u8], virtual_address: u32, table_offset: u32, directory: DirectoryId,
        level: usize, visited: &mut IndexSet<u32, RandomState>,
        pending: &mut Vec<(u32, DirectoryId, usize)>,
    ) -> Result<(), ResourceError> {
        let table = read::<ResourceDirectoryTable>(section_from(section, table_offset)?)?;
        trace!("table {} at {:#x} level {}: {:#x?}", directory.0, table_offset, level, table);

        let count = table.number_of_name_entries as u32 + table.number_of_id_entries as u32;
        for i in 0..count {
            let entry_offset = table_offset as u64
                + RESOURCE_DIRECTORY_TABLE_SIZE as u64
                + i as u64 * RESOURCE_DIRECTORY_ENTRY_SIZE as u64;
            let entry_offset = u32::try_from(entry_offset).map_err(|_| {
                ReadError(format!("entry offset {:#x} outside section", entry_offset))
            })?;
            let entry = read::<ResourceDirectoryEntry>(section_from(section, entry_offset)?)?;
            trace!("entry at {:#x}: {:#x?}", entry_offset, entry);

            let name = parse_name(section, entry.name_offset_or_integer_id)?;
            let target = entry.data_entry_or_subdirectory_offset;
            if target & RESOURCE_SUBDIRECTORY_FLAG != 0 {
                let offset = target & !RESOURCE_SUBDIRECTORY_FLAG;
                if !visited.insert(offset) {
                    return Err(ResourceError::InvalidTable(format!(
                        "table at {:#x} referenced more than once",
                        offset
                    )));
                }
                let child_table = read::<ResourceDirectoryTable>(section_from(section, offset)?)?;
                let child = self.insert_subdirectory(directory, name, child_table.characteristics)?;
                pending.push((offset, child, level + 1));
            } else {
                let description = read::<ResourceDataEntry>(section_from(section, target)?)?;
                let start = description.data_rva.checked_sub(virtual_address);
                let end = start.and_then(|start| start.checked_add(description.size));
                let (start, end) = match (start, end) {
                    (Some(start), Some(end)) if end as usize <= section.len() => (start, end),
                    _ => {
                        return Err(ResourceError::InvalidTable(format!(
                            "resource data at {:#x} with size {:#x} outside section of {:#x} bytes",
                            description.data_rva,
                            description.size,
                            section.len()
                        )));
                    }
                };
                trace!("data {:#x?}..{:#x?}", start, end);
                let mut data = ResourceData::new(&section[start as usize..end as usize]);
                data.set_codepage(description.codepage);
                self.insert_data(directory, name, data)?;
            }
        }
        Ok(())
    }

    /// Returns the root table handle.
    pub fn root(&self) -> DirectoryId { DirectoryId(0) }

    /// Returns the table for the given handle.
    pub fn table(&self, directory: DirectoryId) -> Option<&ResourceTable> {
        self.tables.get(directory.0)
    }

    /// Returns the number of tables in the tree, including the root.
    pub fn tables_count(&self) -> usize { self.tables.len() }

    /// Returns whether duplicate names are rejected on insertion.
    pub fn unique_keys(&self) -> bool { self.unique_keys }

    /// Reject entries whose name already exists in the same table instead of accepting them.
    pub fn set_unique_keys(&mut self, unique_keys: bool) { self.unique_keys = unique_keys; }

    /// Add raw data to a table under the given name.
    pub fn add_data_by_name<S: Into<String>, D: Into<Vec<u8>>>(
        &mut self, directory: DirectoryId, name: S, data: D,
    ) -> Result<(), ResourceError> {
        self.insert_data(directory, ResourceEntryName::Name(name.into()), ResourceData::new(data))
    }

    /// Add raw data to a table under the given id.
    pub fn add_data_by_id<D: Into<Vec<u8>>>(
        &mut self, directory: DirectoryId, id: u32, data: D,
    ) -> Result<(), ResourceError> {
        self.insert_data(directory, ResourceEntryName::ID(id), ResourceData::new(data))
    }

    /// Add an empty child table to a table under the given name.
    /// # Returns
    /// The handle of the new table.
    pub fn add_subdirectory_by_name<S: Into<String>>(
        &mut self, directory: DirectoryId, name: S, characteristics: u32,
    ) -> Result<DirectoryId, ResourceError> {
        self.insert_subdirectory(directory, ResourceEntryName::Name(name.into()), characteristics)
    }

    /// Add an empty child table to a table under the given id.
    /// # Returns
    /// The handle of the new table.
    pub fn add_subdirectory_by_id(
        &mut self, directory: DirectoryId, id: u32, characteristics: u32,
    ) -> Result<DirectoryId, ResourceError> {
        self.insert_subdirectory(directory, ResourceEntryName::ID(id), characteristics)
    }

    /// Add a data entry to a table.
    pub fn insert_data<N: Into<ResourceEntryName>>(
        &mut self, directory: DirectoryId, name: N, data: ResourceData,
    ) -> Result<(), ResourceError> {
        let name = name.into();
        let entry = ResourceEntry::Data(data);
        self.size_bound = self.check_insert(directory, &name, &entry)?;
        self.tables[directory.0].push(name, entry);
        Ok(())
    }

    /// Add an empty child table to a table.
    /// # Returns
    /// The handle of the new table.
    pub fn insert_subdirectory<N: Into<ResourceEntryName>>(
        &mut self, directory: DirectoryId, name: N, characteristics: u32,
    ) -> Result<DirectoryId, ResourceError> {
        let name = name.into();
        let child = DirectoryId(self.tables.len());
        let entry = ResourceEntry::Table(child);
        self.size_bound = self.check_insert(directory, &name, &entry)?;
        self.tables.push(ResourceTable::new(characteristics));
        self.tables[directory.0].push(name, entry);
        Ok(child)
    }

    /// Get the first child table with the given name.
    pub fn subdirectory<N: Into<ResourceEntryName>>(
        &self, directory: DirectoryId, name: N,
    ) -> Option<DirectoryId> {
        self.table(directory)?.get(name)?.as_table()
    }

    /// Insert resource data addressed by type, name and language.
    /// Missing type and name tables are created, existing data for the language is replaced.
    pub fn insert_resource<T: Into<ResourceEntryName>, N: Into<ResourceEntryName>>(
        &mut self, type_: T, name: N, language: LANGID, data: ResourceData,
    ) -> Result<(), ResourceError> {
        let root = self.root();
        let type_table = self.subdirectory_or_insert(root, type_.into())?;
        let name_table = self.subdirectory_or_insert(type_table, name.into())?;

        let language = ResourceEntryName::ID(language as u32);
        let position = self.tables[name_table.0]
            .id_entries
            .iter()
            .position(|(entry_name, _)| *entry_name == language);
        match position {
            None => self.insert_data(name_table, language, data),
            Some(index) => {
                let existing = &self.tables[name_table.0].id_entries[index].1;
                if let ResourceEntry::Table(_) = existing {
                    return Err(ResourceError::InvalidTable(format!(
                        "language entry {:#x?} is a table",
                        language
                    )));
                }
                let entry = ResourceEntry::Data(data);
                let size = self.size_bound - existing.size_bound() + entry.size_bound();
                if size > u32::MAX as u64 {
                    return Err(ResourceError::SectionTooLarge(size));
                }
                self.tables[name_table.0].id_entries[index].1 = entry;
                self.size_bound = size;
                Ok(())
            }
        }
    }

    /// Set the version info resource for the given language.
    pub fn set_version_info(
        &mut self, language: LANGID, version_info: &FrozenVersionInfo,
    ) -> Result<(), ResourceError> {
        self.insert_resource(RT_VERSION, 1u32, language, ResourceData::new(version_info.build()))
    }

    /// Set the application manifest resource.
    pub fn set_manifest<S: AsRef<str>>(&mut self, manifest: S) -> Result<(), ResourceError> {
        self.insert_resource(
            RT_MANIFEST,
            CREATEPROCESS_MANIFEST_RESOURCE_ID,
            LANGUAGE_ID_EN_US,
            ResourceData::new(manifest.as_ref().as_bytes()),
        )
    }

    /// Visit every table depth-first, parents before their children, named entries before id entries.
    /// The walk stops at the first error returned by the visitor.
    pub fn walk<E, F>(&self, mut visitor: F) -> Result<(), E>
    where
        F: FnMut(DirectoryId, &ResourceTable) -> Result<(), E>,
    {
        let mut pending = vec![self.root()];
        while let Some(directory) = pending.pop() {
            let table = &self.tables[directory.0];
            visitor(directory, table)?;
            // reversed so the first child is visited next
            let start = pending.len();
            pending.extend(table.subdirectories());
            pending[start..].reverse();
        }
        Ok(())
    }

    /// Returns the size of the resulting resource section in bytes.
    pub fn size(&self) -> u32 { ResourceLayout::compute(self).size }

    /// Compute the offsets of all tables, entries, strings and data in the resource section.
    /// The tree can be recovered with [`FrozenResourceTree::into_inner`] to be modified and frozen again.
    pub fn freeze(self) -> FrozenResourceTree {
        let layout = ResourceLayout::compute(&self);
        debug!(
            "froze resource tree: {} tables, {} strings, {} data entries, {:#x} bytes",
            layout.order.len(),
            layout.strings.len(),
            layout.data_entries.len(),
            layout.size
        );
        FrozenResourceTree { tree: self, layout }
    }

    fn order(&self) -> Vec<DirectoryId> {
        let mut order = Vec::with_capacity(self.tables.len());
        self.walk::<Infallible, _>(|directory, _| {
            order.push(directory);
            Ok(())
        })
        .unwrap_or_else(|never| match never {});
        order
    }

    fn subdirectory_or_insert(
        &mut self, directory: DirectoryId, name: ResourceEntryName,
    ) -> Result<DirectoryId, ResourceError> {
        let existing = self
            .table(directory)
            .ok_or(ResourceError::InvalidDirectory(directory.0))?
            .get(name.clone())
            .map(ResourceEntry::as_table);
        match existing {
            Some(Some(child)) => Ok(child),
            Some(None) => Err(ResourceError::InvalidTable(format!(
                "entry {:?} is not a table",
                name
            ))),
            None => self.insert_subdirectory(directory, name, 0),
        }
    }

    /// Returns the size bound of the tree after the insertion.
    fn check_insert(
        &self, directory: DirectoryId, name: &ResourceEntryName, entry: &ResourceEntry,
    ) -> Result<u64, ResourceError> {
        let table = self
            .table(directory)
            .ok_or(ResourceError::InvalidDirectory(directory.0))?;
        match name {
            ResourceEntryName::ID(id) if id & RESOURCE_NAME_FLAG != 0 => {
                return Err(ResourceError::InvalidId(*id));
            }
            ResourceEntryName::Name(string) if u16_len(string) > u16::MAX as usize => {
                return Err(ResourceError::NameTooLong(u16_len(string)));
            }
            _ => {}
        }
        let entries = match name {
            ResourceEntryName::Name(_) => &table.name_entries,
            ResourceEntryName::ID(_) => &table.id_entries,
        };
        if entries.len() >= u16::MAX as usize {
            return Err(ResourceError::InvalidTable(format!(
                "table {} has too many entries",
                directory.0
            )));
        }
        if table.contains(name) {
            if self.unique_keys {
                return Err(match name {
                    ResourceEntryName::Name(string) => ResourceError::DuplicateName(string.clone()),
                    ResourceEntryName::ID(id) => ResourceError::DuplicateId(*id),
                });
            }
            warn!("table {} already contains an entry {:?}", directory.0, name);
        }
        let mut size = self.size_bound + name.string_size() as u64 + entry.size_bound();
        if let ResourceEntry::Table(_) = entry {
            size += RESOURCE_DIRECTORY_TABLE_SIZE as u64;
        }
        if size > u32::MAX as u64 {
            return Err(ResourceError::SectionTooLarge(size));
        }
        Ok(size)
    }
}

fn section_from(section: &[u8], offset: u32) -> Result<&[u8], ReadError> {
    section.get(offset as usize..).ok_or_else(|| {
        ReadError(format!("offset {:#x} outside section of {:#x} bytes", offset, section.len()))
    })
}

fn parse_name(section: &[u8], name: u32) -> Result<ResourceEntryName, ReadError> {
    if name & RESOURCE_NAME_FLAG != 0 {
        let data = section_from(section, name & !RESOURCE_NAME_FLAG)?;
        let length = read::<u16>(data)? as usize;
        trace!("reading resource name of length {}", length);
        Ok(ResourceEntryName::Name(read_u16_string(&data[2..], length)?))
    } else {
        Ok(ResourceEntryName::ID(name))
    }
}

/// Location of a data entry in the built resource section.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct DataPlacement {
    /// Table containing the entry.
    pub directory:         DirectoryId,
    /// Index of the entry in the table, named entries first.
    pub index:             usize,
    /// Offset of the data entry description. Its first field is the data RVA.
    pub descriptor_offset: u32,
    /// Offset of the raw data.
    pub data_offset:       u32,
    pub size:              u32,
}

/// Offset ranges of the regions of the built resource section.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResourceRegions {
    pub tables:       Range<u32>,
    pub strings:      Range<u32>,
    pub descriptions: Range<u32>,
    pub data:         Range<u32>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
struct ResourceLayout {
    order:         Vec<DirectoryId>,
    table_offsets: Vec<u32>,
    entries:       Vec<Vec<ResourceDirectoryEntry>>,
    strings:       IndexMap<String, u32, RandomState>,
    data_entries:  Vec<DataPlacement>,
    regions:       ResourceRegions,
    size:          u32,
}
impl ResourceLayout {
    fn compute(tree: &ResourceTree) -> Self {
        let order = tree.order();

        // tables and their entries in walk order
        let mut offset = 0u32;
        let mut table_offsets = vec![0u32; tree.tables.len()];
        for directory in &order {
            let table = &tree.tables[directory.0];
            table_offsets[directory.0] = offset;
            trace!("table {} at {:#x}", directory.0, offset);
            offset += RESOURCE_DIRECTORY_TABLE_SIZE + table.len() as u32 * RESOURCE_DIRECTORY_ENTRY_SIZE;
        }
        let tables = 0..offset;

        // names in order of first reference, stored once per distinct name
        let mut strings = IndexMap::<String, u32, RandomState>::default();
        for directory in &order {
            for (name, _) in tree.tables[directory.0].entries() {
                if let ResourceEntryName::Name(string) = name {
                    if !strings.contains_key(string) {
                        strings.insert(string.clone(), offset);
                        offset += name.string_size();
                    }
                }
            }
        }
        let strings_range = tables.end..offset;

        offset = aligned_to(offset, RESOURCE_DATA_ENTRY_ALIGNMENT);
        let descriptions_start = offset;
        let mut data_entries = Vec::new();
        let mut entries = vec![Vec::new(); tree.tables.len()];
        for directory in &order {
            for (index, (name, entry)) in tree.tables[directory.0].entries().enumerate() {
                let name_offset_or_integer_id = match name {
                    ResourceEntryName::Name(string) => strings[string] | RESOURCE_NAME_FLAG,
                    ResourceEntryName::ID(id) => *id,
                };
                let data_entry_or_subdirectory_offset = match entry {
                    ResourceEntry::Table(child) => {
                        table_offsets[child.0] | RESOURCE_SUBDIRECTORY_FLAG
                    }
                    ResourceEntry::Data(data) => {
                        let descriptor_offset = offset;
                        data_entries.push(DataPlacement {
                            directory: *directory,
                            index,
                            descriptor_offset,
                            data_offset: 0,
                            size: data.len() as u32,
                        });
                        offset += RESOURCE_DATA_ENTRY_SIZE;
                        descriptor_offset
                    }
                };
                entries[directory.0].push(ResourceDirectoryEntry {
                    name_offset_or_integer_id,
                    data_entry_or_subdirectory_offset,
                });
            }
        }
        let descriptions = descriptions_start..offset;

        let data_start = offset;
        for placement in &mut data_entries {
            offset = aligned_to(offset, RESOURCE_DATA_ALIGNMENT);
            placement.data_offset = offset;
            offset += placement.size;
        }

        Self {
            order,
            table_offsets,
            entries,
            strings,
            data_entries,
            regions: ResourceRegions {
                tables,
                strings: strings_range,
                descriptions,
                data: data_start..offset,
            },
            size: offset,
        }
    }
}

/// Resource tree with computed offsets, ready to be built.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FrozenResourceTree {
    tree:   ResourceTree,
    layout: ResourceLayout,
}
impl FrozenResourceTree {
    pub fn tree(&self) -> &ResourceTree { &self.tree }

    /// Returns the tree to be modified again.
    pub fn into_inner(self) -> ResourceTree { self.tree }

    /// Returns the size of the resulting resource section in bytes.
    pub fn size(&self) -> u32 { self.layout.size }

    /// Returns the offset ranges of the tables, strings, data entry descriptions and raw data.
    pub fn regions(&self) -> &ResourceRegions { &self.layout.regions }

    /// Returns the tables in the order they are laid out.
    pub fn order(&self) -> &[DirectoryId] { &self.layout.order }

    pub fn table_offset(&self, directory: DirectoryId) -> Option<u32> {
        self.layout.table_offsets.get(directory.0).copied()
    }

    /// Returns the offset of the entry at the given index of a table, named entries first.
    pub fn entry_offset(&self, directory: DirectoryId, index: usize) -> Option<u32> {
        let table = self.tree.table(directory)?;
        if index >= table.len() {
            return None;
        }
        Some(
            self.layout.table_offsets[directory.0]
                + RESOURCE_DIRECTORY_TABLE_SIZE
                + index as u32 * RESOURCE_DIRECTORY_ENTRY_SIZE,
        )
    }

    /// Returns the offset of the length-prefixed name string.
    pub fn string_offset(&self, name: &str) -> Option<u32> { self.layout.strings.get(name).copied() }

    /// Returns the data entries in the order they are laid out.
    /// The data RVA of each entry has to be relocated by the object writer if the section address is not known when building.
    pub fn data_entries(&self) -> &[DataPlacement] { &self.layout.data_entries }

    pub fn walk<E, F>(&self, visitor: F) -> Result<(), E>
    where
        F: FnMut(DirectoryId, &ResourceTable) -> Result<(), E>,
    {
        self.tree.walk(visitor)
    }

    fn data(&self, placement: &DataPlacement) -> &ResourceData {
        match self.tree.tables[placement.directory.0].entries().nth(placement.index) {
            Some((_, ResourceEntry::Data(data))) => data,
            _ => unreachable!("data placement does not point to a data entry"),
        }
    }

    /// Build the resource section into raw bytes to be included in an image or object file.
    /// The virtual address is added to the data offsets to form the data RVAs, pass `0` to leave them section-relative.
    pub fn build(&self, virtual_address: u32) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.layout.size as usize);

        for directory in &self.layout.order {
            let table = &self.tree.tables[directory.0];
            debug_assert_eq!(data.len() as u32, self.layout.table_offsets[directory.0]);
            let header = ResourceDirectoryTable {
                characteristics: table.characteristics,
                number_of_name_entries: table.name_entries.len() as u16,
                number_of_id_entries: table.id_entries.len() as u16,
                ..Default::default()
            };
            data.extend_from_slice(header.as_bytes());
            for entry in &self.layout.entries[directory.0] {
                data.extend_from_slice(entry.as_bytes());
            }
        }

        for (string, offset) in &self.layout.strings {
            debug_assert_eq!(data.len() as u32, *offset);
            data.extend_from_slice(&(u16_len(string) as u16).to_le_bytes());
            data.extend(string_to_u16(string));
        }

        pad_to(&mut data, RESOURCE_DATA_ENTRY_ALIGNMENT as usize);
        for placement in &self.layout.data_entries {
            debug_assert_eq!(data.len() as u32, placement.descriptor_offset);
            let description = ResourceDataEntry {
                data_rva: virtual_address.wrapping_add(placement.data_offset),
                size:     placement.size,
                codepage: self.data(placement).codepage(),
                reserved: 0,
            };
            data.extend_from_slice(description.as_bytes());
        }

        for placement in &self.layout.data_entries {
            pad_to(&mut data, RESOURCE_DATA_ALIGNMENT as usize);
            debug_assert_eq!(data.len() as u32, placement.data_offset);
            data.extend_from_slice(self.data(placement).data());
        }

        debug_assert_eq!(data.len() as u32, self.layout.size);
        debug!("built resource section of {:#x} bytes", data.len());
        data
    }
}
