//! Builder for the **r**e**s**ou**rc**e section of **p**ortable **e**xecutables.
//!
//! Supports:
//! * Building resource directory trees addressed by name or id
//! * Building `VS_VERSIONINFO` resources with fixed file information, string tables and translations
//! * Serializing the resource section with the data offsets needed for RVA fixups
//!
//! See [`ResourceTree`] for the resource directory and [`VersionInfo`] for version information.
//!
//! # Examples
//!
//! ### Version info resource
//! ```
//! use pe_rsrc::{constants::*, ResourceTree, VersionInfo};
//!
//! // populate the version info
//! let mut version_info = VersionInfo::new();
//! version_info.set_file_version_string("1.2.3.4")?;
//! version_info.set_string(LANGUAGE_ID_EN_US, CODE_PAGE_ID_EN_US, VS_PRODUCT_NAME, "Example")?;
//! version_info.add_translation(LANGUAGE_ID_EN_US, CODE_PAGE_ID_EN_US)?;
//!
//! // place it in the resource directory
//! let mut resources = ResourceTree::new();
//! resources.set_version_info(LANGUAGE_ID_EN_US, &version_info.freeze())?;
//!
//! // compute offsets and build the section for its virtual address
//! let resources = resources.freeze();
//! let section = resources.build(SECTION_VIRTUAL_ADDRESS);
//! ```
//!
//! ### Custom resource tree
//! ```
//! use pe_rsrc::{constants::*, ResourceTree};
//!
//! let mut resources = ResourceTree::new();
//! let root = resources.root();
//! let data = resources.add_subdirectory_by_id(root, RT_RCDATA as u32, 0)?;
//! let name = resources.add_subdirectory_by_name(data, "CONFIG", 0)?;
//! resources.add_data_by_id(name, LANGUAGE_ID_NEUTRAL as u32, CONFIG_BYTES)?;
//!
//! // build with section-relative data addresses and report where they need to be relocated
//! let resources = resources.freeze();
//! let section = resources.build(0);
//! let fixups = resources.data_entries();
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg_hide))]
#![cfg_attr(docsrs, doc(cfg_hide(doc)))]

extern crate alloc;

pub(crate) mod errors;
pub(crate) mod resource;
pub(crate) mod util;
pub(crate) mod version_info;

pub mod constants;
pub mod types;

pub use crate::{errors::*, resource::*, version_info::*};
