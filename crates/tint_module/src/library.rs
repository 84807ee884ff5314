//! Dynamic module libraries
//!
//! A module library exports a single [`ModuleDeclaration`] under the symbol
//! `{id}_tint_module`, where `id` is the four character module id that also
//! precedes the suffix in the file name:
//!
//! ```text
//!   libtint_lcm2_tint_module.so ──► symbol lcm2_tint_module
//!                                    └─ ModuleDeclaration { abi, core, build }
//! ```
//!
//! Libraries are shared through a [`LibraryCache`]. Every consumer holds a
//! [`LibraryLease`]; the library is unmapped when the last lease is gone.

use crate::error::{ModuleError, Result};
use crate::info::ModuleDecl;
use libloading::{Library, Symbol};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

/// ABI version of [`ModuleDeclaration`]
pub const MODULE_ABI_VERSION: u32 = 1;

/// Version of the object core modules must be built against
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// File name and symbol suffix of module libraries
pub const MODULE_SUFFIX: &str = "_tint_module";

/// Length of a module id
pub const MODULE_ID_LEN: usize = 4;

/// Declaration exported by a module library
#[repr(C)]
pub struct ModuleDeclaration {
    pub abi_version: u32,
    pub core_version: &'static str,
    pub build: fn() -> ModuleDecl,
}

/// Export a module declaration from a library.
///
/// ```ignore
/// fn build() -> ModuleDecl { /* ... */ }
/// tint_module::export_module!(lcm2_tint_module, build);
/// ```
#[macro_export]
macro_rules! export_module {
    ($symbol:ident, $build:path) => {
        #[no_mangle]
        #[allow(non_upper_case_globals)]
        pub static $symbol: $crate::library::ModuleDeclaration =
            $crate::library::ModuleDeclaration {
                abi_version: $crate::library::MODULE_ABI_VERSION,
                core_version: $crate::library::CORE_VERSION,
                build: $build,
            };
    };
}

/// Module id encoded in a library file name, e.g. `lcm2` for
/// `libtint_lcm2_tint_module.so`
pub fn module_id_from_file_name(file_name: &str) -> Option<&str> {
    let end = file_name.find(MODULE_SUFFIX)?;
    let start = end.checked_sub(MODULE_ID_LEN)?;
    file_name.get(start..end)
}

/// Symbol of the declaration exported by module `id`
pub fn declaration_symbol(id: &str) -> String {
    format!("{}{}", id, MODULE_SUFFIX)
}

// ========== Library cache ==========

struct CacheEntry {
    library: Arc<Library>,
    consumers: usize,
}

/// Shared, reference counted cache of opened libraries
pub struct LibraryCache {
    entries: Mutex<HashMap<PathBuf, CacheEntry>>,
}

static SHARED: LazyLock<Arc<LibraryCache>> = LazyLock::new(|| Arc::new(LibraryCache::new()));

impl LibraryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Process-wide cache
    pub fn shared() -> Arc<LibraryCache> {
        SHARED.clone()
    }

    /// Open `path`, or reuse the library if it is already open
    pub fn acquire(self: &Arc<Self>, path: impl AsRef<Path>) -> Result<LibraryLease> {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.entries.lock();
        let library = match entries.get_mut(&path) {
            Some(entry) => {
                entry.consumers += 1;
                entry.library.clone()
            }
            None => {
                let library = unsafe {
                    Library::new(&path).map_err(|e| ModuleError::load_error(&path, e.to_string()))?
                };
                let library = Arc::new(library);
                entries.insert(
                    path.clone(),
                    CacheEntry {
                        library: library.clone(),
                        consumers: 1,
                    },
                );
                log::info!("Opened module library '{}'", path.display());
                library
            }
        };
        drop(entries);
        Ok(LibraryLease {
            library,
            path,
            cache: self.clone(),
        })
    }

    /// Give a lease back. Returns the remaining number of consumers.
    pub fn release(&self, lease: LibraryLease) -> usize {
        let path = lease.path.clone();
        drop(lease);
        self.open_count(&path)
    }

    fn release_path(&self, path: &Path) {
        let removed = {
            let mut entries = self.entries.lock();
            match entries.get_mut(path) {
                Some(entry) if entry.consumers > 1 => {
                    entry.consumers -= 1;
                    None
                }
                Some(_) => entries.remove(path),
                None => {
                    log::warn!("Released library '{}' that is not open", path.display());
                    None
                }
            }
        };
        if removed.is_some() {
            log::info!("Closing module library '{}'", path.display());
        }
    }

    pub fn is_open(&self, path: impl AsRef<Path>) -> bool {
        self.entries.lock().contains_key(path.as_ref())
    }

    /// Number of consumers of `path`, `0` when closed
    pub fn open_count(&self, path: impl AsRef<Path>) -> usize {
        self.entries
            .lock()
            .get(path.as_ref())
            .map_or(0, |e| e.consumers)
    }

    /// Number of open libraries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LibraryCache {
    fn default() -> Self {
        Self::new()
    }
}

/// One consumer's hold on an open library
pub struct LibraryLease {
    library: Arc<Library>,
    path: PathBuf,
    cache: Arc<LibraryCache>,
}

impl LibraryLease {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve the module declaration of `id` and build the module record
    pub fn load_declaration(&self, id: &str) -> Result<ModuleDecl> {
        let symbol = declaration_symbol(id);
        let mut name = symbol.clone().into_bytes();
        name.push(0);

        let declaration: Symbol<*const ModuleDeclaration> = unsafe {
            self.library
                .get(&name)
                .map_err(|_| ModuleError::symbol_not_found(self.path.display().to_string(), &symbol))?
        };
        let declaration = unsafe { &**declaration };

        if declaration.abi_version != MODULE_ABI_VERSION {
            return Err(ModuleError::AbiMismatch {
                library: self.path.display().to_string(),
                found: declaration.abi_version.to_string(),
                expected: MODULE_ABI_VERSION.to_string(),
            });
        }
        if declaration.core_version != CORE_VERSION {
            return Err(ModuleError::AbiMismatch {
                library: self.path.display().to_string(),
                found: format!("core {}", declaration.core_version),
                expected: format!("core {}", CORE_VERSION),
            });
        }

        let decl = (declaration.build)();
        if decl.id() != id {
            log::warn!(
                "Library '{}' declares module '{}' under symbol '{}'",
                self.path.display(),
                decl.id(),
                symbol
            );
        }
        Ok(decl)
    }
}

impl Drop for LibraryLease {
    fn drop(&mut self) {
        self.cache.release_path(&self.path);
    }
}

impl fmt::Debug for LibraryLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryLease")
            .field("path", &self.path)
            .finish()
    }
}
