// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The in-memory filesystem backend.
//!
//! [`MemFs`] keeps a whole filesystem - nodes, hard links, symbolic links,
//! permissions, timestamps - in process memory, behind the same [`Vfs`]
//! surface the other backends implement. It exists so application and test
//! code can run against a filesystem that is fast, hermetic and
//! indistinguishable from the host one.
//!
//! The node graph lives behind a single reader/writer lock: read-only
//! operations share it, mutations serialise on it, and a rename across
//! directories is therefore atomic and deadlock-free by construction.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use avfs_core::{
    DummyIdm, Features, FileMode, IdentityMgr, OsErrors, OsType, PathError, PathUtils, UserReader,
    UserRecord, WindowsError,
};
use tracing::debug;

mod file;
mod node;
mod resolver;
mod vfs;

pub use file::MemFile;

use node::{NodeId, NodeStore, StoreError};

/// Per-process source of backend instance ids, so `same_file` never matches
/// descriptors of two different instances.
static NEXT_FS_ID: AtomicU64 = AtomicU64::new(1);

/// Default symlink hop budget, matching common POSIX `ELOOP` limits.
const DEFAULT_MAX_SYMLINKS: u32 = 40;

pub(crate) struct MemFsInner {
    name: String,
    os_type: OsType,
    utils: PathUtils,
    errs: OsErrors,
    features: Features,
    idm: Arc<dyn IdentityMgr>,
    /// Per-instance override of the process umask, so concurrent suites do
    /// not collide.
    umask: AtomicU32,
    fs_id: u64,
    next_fd: AtomicU64,
    max_symlinks: u32,
    store: RwLock<NodeStore>,
    /// Effective root for resolution; changed by `chroot`.
    root: RwLock<NodeId>,
    cur_dir: RwLock<String>,
    user: RwLock<Arc<dyn UserReader>>,
}

/// The in-memory filesystem. Cloning is cheap and yields a second handle to
/// the same filesystem.
#[derive(Clone)]
pub struct MemFs {
    pub(crate) inner: Arc<MemFsInner>,
}

/// Configures and builds a [`MemFs`].
pub struct MemFsBuilder {
    name: String,
    os_type: OsType,
    idm: Option<Arc<dyn IdentityMgr>>,
    system_dirs: bool,
    windows_symlinks: bool,
    max_symlinks: u32,
}

impl MemFsBuilder {
    fn new() -> Self {
        MemFsBuilder {
            name: String::new(),
            os_type: OsType::current(),
            idm: None,
            system_dirs: false,
            windows_symlinks: false,
            max_symlinks: DEFAULT_MAX_SYMLINKS,
        }
    }

    /// Names the instance (shows up in [`avfs_core::Vfs::name`]).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Selects the personality. Defaults to the host's.
    pub fn os_type(mut self, os_type: OsType) -> Self {
        self.os_type = os_type;
        self
    }

    /// Attaches an identity manager; the effective user becomes its admin
    /// and the manager's features are advertised.
    pub fn idm(mut self, idm: Arc<dyn IdentityMgr>) -> Self {
        self.idm = Some(idm);
        self
    }

    /// Creates the personality's base directories at construction.
    pub fn system_dirs(mut self) -> Self {
        self.system_dirs = true;
        self
    }

    /// Enables symbolic links on the Windows personality (they require a
    /// privilege there and are off by default).
    pub fn windows_symlinks(mut self) -> Self {
        self.windows_symlinks = true;
        self
    }

    /// Overrides the symlink hop budget.
    pub fn max_symlinks(mut self, max: u32) -> Self {
        self.max_symlinks = max;
        self
    }

    pub fn build(self) -> MemFs {
        let os_type = self.os_type;

        let mut features = Features::BASIC_FS | Features::HARDLINK;
        match os_type {
            OsType::Linux => features |= Features::SYMLINK | Features::CHROOT,
            OsType::Windows => {
                if self.windows_symlinks {
                    features |= Features::SYMLINK;
                }
            }
        }

        let (idm, user): (Arc<dyn IdentityMgr>, Arc<dyn UserReader>) = match self.idm {
            Some(idm) => {
                features |= idm.features();
                let admin = idm.admin_user();
                (idm, admin)
            }
            None => (Arc::new(DummyIdm::new(os_type)), Arc::new(UserRecord::not_implemented())),
        };

        if self.system_dirs {
            features |= Features::SYSTEM_DIRS;
        }

        let store = NodeStore::new(os_type);
        let root = store.root();
        let cur_dir = match os_type {
            OsType::Linux => "/".to_string(),
            OsType::Windows => "C:\\".to_string(),
        };

        let fs = MemFs {
            inner: Arc::new(MemFsInner {
                name: self.name,
                os_type,
                utils: PathUtils::new(os_type),
                errs: OsErrors::new(os_type),
                features,
                idm,
                umask: AtomicU32::new(avfs_core::umask().bits()),
                fs_id: NEXT_FS_ID.fetch_add(1, Ordering::Relaxed),
                next_fd: AtomicU64::new(1),
                max_symlinks: self.max_symlinks,
                store: RwLock::new(store),
                root: RwLock::new(root),
                cur_dir: RwLock::new(cur_dir),
                user: RwLock::new(user),
            }),
        };

        if self.system_dirs {
            fs.create_system_dirs();
        }

        fs
    }
}

impl MemFs {
    /// A filesystem with the host personality and no identity manager.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> MemFsBuilder {
        MemFsBuilder::new()
    }

    // Crate-internal accessors used by the op surface and file handles.

    pub(crate) fn store_read(&self) -> RwLockReadGuard<'_, NodeStore> {
        self.inner.store.read().expect("node store poisoned")
    }

    pub(crate) fn store_write(&self) -> RwLockWriteGuard<'_, NodeStore> {
        self.inner.store.write().expect("node store poisoned")
    }

    pub(crate) fn errs(&self) -> &OsErrors {
        &self.inner.errs
    }

    pub(crate) fn effective_root(&self) -> NodeId {
        *self.inner.root.read().expect("root poisoned")
    }

    pub(crate) fn user(&self) -> Arc<dyn UserReader> {
        self.inner.user.read().expect("user poisoned").clone()
    }

    pub(crate) fn next_fd(&self) -> u64 {
        self.inner.next_fd.fetch_add(1, Ordering::Relaxed)
    }

    /// The absolute, cleaned form of `path` against the working directory.
    pub(crate) fn abs(&self, path: &str) -> String {
        let cur_dir = self.inner.cur_dir.read().expect("cur_dir poisoned");
        self.inner.utils.abs(&cur_dir, path)
    }

    pub(crate) fn set_cur_dir(&self, dir: String) {
        *self.inner.cur_dir.write().expect("cur_dir poisoned") = dir;
    }

    /// Builds the base directories as the admin user with a zero umask.
    fn create_system_dirs(&self) {
        let mut store = self.store_write();
        let root = store.root();
        let ut = self.inner.utils;

        for dir in avfs_core::system_dirs(self.inner.os_type) {
            let mut cur = root;
            let mut pi = avfs_core::PathIterator::new(ut, dir.path.to_string());
            while pi.next() {
                let part = pi.part().to_string();
                cur = match store.lookup(cur, &part) {
                    Some(id) => id,
                    None => {
                        let perm =
                            if pi.is_last() { dir.perm } else { FileMode::new(0o755) };
                        store
                            .create_directory(cur, &part, perm, 0, 0)
                            .expect("system dir bootstrap on a fresh store")
                    }
                };
            }
        }

        debug!(os_type = %self.inner.os_type, "created system directories");
    }

    // Volume management (Windows personality only).

    /// Registers a new volume with an empty root directory.
    pub fn volume_add(&self, name: &str) -> Result<(), PathError> {
        const OP: &str = "volumeadd";

        if self.inner.os_type != OsType::Windows {
            return Err(PathError::new(OP, name, WindowsError::VolumeWindowsOnly));
        }
        if !is_volume_name(name) {
            return Err(PathError::new(OP, name, WindowsError::VolumeNameInvalid));
        }

        let mut store = self.store_write();
        match store.volume_add(name) {
            Ok(_) => {
                debug!(volume = name, "added volume");
                Ok(())
            }
            Err(StoreError::Exists) => {
                Err(PathError::new(OP, name, WindowsError::VolumeAlreadyExists))
            }
            Err(_) => Err(PathError::new(OP, name, self.inner.errs.invalid_argument)),
        }
    }

    /// Removes a volume and everything on it.
    pub fn volume_delete(&self, name: &str) -> Result<(), PathError> {
        const OP: &str = "volumedelete";

        if self.inner.os_type != OsType::Windows {
            return Err(PathError::new(OP, name, WindowsError::VolumeWindowsOnly));
        }
        if !is_volume_name(name) {
            return Err(PathError::new(OP, name, WindowsError::VolumeNameInvalid));
        }

        let mut store = self.store_write();
        match store.volume_delete(name) {
            Ok(()) => {
                debug!(volume = name, "deleted volume");
                Ok(())
            }
            Err(_) => Err(PathError::new(OP, name, self.inner.errs.no_such_dir)),
        }
    }

    /// The registered volume names, sorted. Empty on the POSIX personality.
    pub fn volume_list(&self) -> Vec<String> {
        self.store_read().volume_names()
    }
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

fn is_volume_name(name: &str) -> bool {
    let b = name.as_bytes();
    b.len() == 2 && b[0].is_ascii_alphabetic() && b[1] == b':'
}
