//! Index Manager: creates, opens, closes and destroys index files.
//!
//! An index over columns `c0, c1, ...` of relation `name` lives in
//! `{base_dir}/name.c0.c1...`. The manager tracks which of its files are
//! open and refuses a second open of the same file, or destroying one
//! that is open.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::buffer::BufferPoolManager;
use crate::common::config::{IndexConfig, MIN_FANOUT};
use crate::common::{Error, Result};
use crate::storage::page::Page;
use crate::storage::DiskManager;

use super::btree::codec::{max_keys_for, IndexHeader};
use super::btree::IndexHandle;
use super::key::AttrType;

/// File name of the index over `columns` of relation `name`.
///
/// # Example
/// ```
/// use minirel::index::index_file_name;
///
/// assert_eq!(index_file_name("table", &[0, 2]), "table.0.2");
/// ```
pub fn index_file_name(name: &str, columns: &[usize]) -> String {
    let mut file_name = name.to_string();
    for column in columns {
        file_name.push('.');
        file_name.push_str(&column.to_string());
    }
    file_name
}

type OpenSet = Arc<Mutex<HashSet<String>>>;

/// Marks a file as open for as long as its handle lives.
pub(crate) struct Registration {
    open: OpenSet,
    file_name: String,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.open.lock().remove(&self.file_name);
    }
}

/// Entry point for index files in one directory.
pub struct IndexManager {
    base_dir: PathBuf,
    config: IndexConfig,
    open: OpenSet,
}

impl IndexManager {
    /// Manage indexes stored in `base_dir`, which must already exist.
    pub fn new(base_dir: impl AsRef<Path>, config: IndexConfig) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            config,
            open: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Create an empty index over `columns` of relation `name`.
    ///
    /// `attr_length` is the total key width in bytes: 4 per INT column.
    /// The order comes from [`IndexConfig::max_keys`], or is derived from
    /// the page size when unset.
    ///
    /// # Errors
    /// - `InvalidConfig` if the manager's pool size is zero
    /// - `UnsupportedType` unless `attr_type` is INT
    /// - `InvalidAttrLength` unless `attr_length` is a positive multiple of 4
    /// - `InvalidFanout` if the configured order is out of range
    /// - `IndexExists` if the file is already there
    pub fn create_index(
        &self,
        name: &str,
        columns: &[usize],
        attr_type: AttrType,
        attr_length: usize,
    ) -> Result<()> {
        self.config.validate()?;
        if attr_type != AttrType::Int {
            return Err(Error::UnsupportedType(attr_type.to_string()));
        }
        if attr_length == 0 || attr_length % 4 != 0 {
            return Err(Error::InvalidAttrLength(attr_length));
        }

        let num_attrs = attr_length / 4;
        let limit = max_keys_for(num_attrs);
        if limit < MIN_FANOUT {
            return Err(Error::InvalidAttrLength(attr_length));
        }
        let max_keys = self.config.max_keys.unwrap_or(limit);
        if !(MIN_FANOUT..=limit).contains(&max_keys) {
            return Err(Error::InvalidFanout {
                requested: max_keys,
                min: MIN_FANOUT,
                max: limit,
            });
        }

        let file_name = index_file_name(name, columns);
        let mut disk = match DiskManager::create(self.base_dir.join(&file_name)) {
            Ok(disk) => disk,
            Err(Error::Io(e)) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::IndexExists(file_name));
            }
            Err(e) => return Err(e),
        };

        let header_page = disk.allocate_page()?;
        let mut page = Page::new();
        IndexHeader::new(num_attrs, attr_type, max_keys).encode(&mut page);
        disk.write_page(header_page, &page)?;
        disk.sync()?;

        info!(index = %file_name, num_attrs, max_keys, "created index");
        Ok(())
    }

    /// Open an existing index.
    ///
    /// # Errors
    /// - `InvalidConfig` if the manager's pool size is zero
    /// - `IndexNotFound` if there is no such file
    /// - `IndexAlreadyOpen` if this manager already has it open
    /// - `Corrupted` if the header page fails validation
    pub fn open_index(&self, name: &str, columns: &[usize]) -> Result<IndexHandle> {
        self.config.validate()?;
        let file_name = index_file_name(name, columns);

        if !self.open.lock().insert(file_name.clone()) {
            return Err(Error::IndexAlreadyOpen(file_name));
        }
        // From here on the registration releases the entry on any error.
        let registration = Registration {
            open: Arc::clone(&self.open),
            file_name: file_name.clone(),
        };

        let disk = match DiskManager::open(self.base_dir.join(&file_name)) {
            Ok(disk) => disk,
            Err(Error::Io(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::IndexNotFound(file_name));
            }
            Err(e) => return Err(e),
        };
        let pool = BufferPoolManager::new(self.config.pool_size, disk);
        let handle = IndexHandle::open(file_name, pool, &self.config, registration)?;

        info!(
            index = %handle.name(),
            height = handle.height(),
            max_keys = handle.max_keys(),
            "opened index"
        );
        Ok(handle)
    }

    /// Flush and fsync an index, then release it.
    pub fn close_index(&self, handle: IndexHandle) -> Result<()> {
        let file_name = handle.name().to_string();
        handle.close()?;
        info!(index = %file_name, "closed index");
        Ok(())
    }

    /// Delete an index file.
    ///
    /// # Errors
    /// - `IndexInUse` while the index is open
    /// - `IndexNotFound` if there is no such file
    pub fn destroy_index(&self, name: &str, columns: &[usize]) -> Result<()> {
        let file_name = index_file_name(name, columns);
        let open = self.open.lock();
        if open.contains(&file_name) {
            return Err(Error::IndexInUse(file_name));
        }

        match std::fs::remove_file(self.base_dir.join(&file_name)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::IndexNotFound(file_name));
            }
            Err(e) => return Err(e.into()),
        }
        drop(open);

        info!(index = %file_name, "destroyed index");
        Ok(())
    }

    pub fn is_open(&self, name: &str, columns: &[usize]) -> bool {
        self.open.lock().contains(&index_file_name(name, columns))
    }
}
