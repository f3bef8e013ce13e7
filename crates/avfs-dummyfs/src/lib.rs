// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The no-op backend.
//!
//! [`DummyFs`] advertises no features and denies every operation with the
//! personality's permission error, wrapped in the envelope the real call
//! would use. It anchors the feature-skipping mechanism of the conformance
//! suite and serves as the template for new backends: implement the trait,
//! then replace denials with behaviour one capability at a time.

use std::sync::Arc;
use std::time::SystemTime;

use avfs_core::{
    DummyIdm, Features, FileInfo, FileMode, IdentityMgr, IdmError, LinkError, OpenOptions,
    OsErrors, OsType, PathError, UserReader, UserRecord, Vfs, VfsFile,
};

/// A backend that implements nothing.
pub struct DummyFs {
    os_type: OsType,
    errs: OsErrors,
    idm: Arc<DummyIdm>,
    user: Arc<UserRecord>,
}

impl DummyFs {
    pub fn new() -> Self {
        Self::with_os_type(OsType::current())
    }

    pub fn with_os_type(os_type: OsType) -> Self {
        DummyFs {
            os_type,
            errs: OsErrors::new(os_type),
            idm: Arc::new(DummyIdm::new(os_type)),
            user: Arc::new(UserRecord::not_implemented()),
        }
    }

    fn denied(&self, op: &'static str, path: &str) -> PathError {
        PathError::new(op, path, self.errs.perm_denied)
    }

    fn denied_link(&self, op: &'static str, old: &str, new: &str) -> LinkError {
        LinkError::new(op, old, new, self.errs.perm_denied)
    }
}

impl Default for DummyFs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs for DummyFs {
    fn name(&self) -> String {
        String::new()
    }

    fn os_type(&self) -> OsType {
        self.os_type
    }

    fn features(&self) -> Features {
        Features::NONE
    }

    fn idm(&self) -> Arc<dyn IdentityMgr> {
        self.idm.clone()
    }

    fn current_user(&self) -> Arc<dyn UserReader> {
        self.user.clone()
    }

    fn set_user(&self, _name: &str) -> Result<Arc<dyn UserReader>, IdmError> {
        Err(IdmError::PermDenied)
    }

    fn umask(&self) -> FileMode {
        avfs_core::umask()
    }

    fn set_umask(&self, mask: FileMode) {
        avfs_core::set_umask(mask)
    }

    fn chdir(&self, dir: &str) -> Result<(), PathError> {
        Err(self.denied("chdir", dir))
    }

    fn getwd(&self) -> Result<String, PathError> {
        Err(self.denied("getwd", ""))
    }

    fn chroot(&self, path: &str) -> Result<(), PathError> {
        Err(self.denied("chroot", path))
    }

    fn mkdir(&self, name: &str, _perm: FileMode) -> Result<(), PathError> {
        Err(self.denied("mkdir", name))
    }

    fn mkdir_all(&self, path: &str, _perm: FileMode) -> Result<(), PathError> {
        Err(self.denied("mkdir", path))
    }

    fn open_file(
        &self,
        name: &str,
        _flags: OpenOptions,
        _perm: FileMode,
    ) -> Result<Box<dyn VfsFile>, PathError> {
        Err(self.denied("open", name))
    }

    fn link(&self, old_name: &str, new_name: &str) -> Result<(), LinkError> {
        Err(self.denied_link("link", old_name, new_name))
    }

    fn symlink(&self, old_name: &str, new_name: &str) -> Result<(), LinkError> {
        Err(self.denied_link("symlink", old_name, new_name))
    }

    fn readlink(&self, name: &str) -> Result<String, PathError> {
        Err(self.denied("readlink", name))
    }

    fn eval_symlinks(&self, path: &str) -> Result<String, PathError> {
        Err(self.denied("lstat", path))
    }

    fn remove(&self, name: &str) -> Result<(), PathError> {
        Err(self.denied("remove", name))
    }

    fn remove_all(&self, path: &str) -> Result<(), PathError> {
        Err(self.denied("removeall", path))
    }

    fn rename(&self, old_name: &str, new_name: &str) -> Result<(), LinkError> {
        Err(self.denied_link("rename", old_name, new_name))
    }

    fn stat(&self, path: &str) -> Result<FileInfo, PathError> {
        Err(self.denied("stat", path))
    }

    fn lstat(&self, path: &str) -> Result<FileInfo, PathError> {
        Err(self.denied("lstat", path))
    }

    fn chmod(&self, name: &str, _mode: FileMode) -> Result<(), PathError> {
        Err(self.denied("chmod", name))
    }

    fn chown(&self, name: &str, _uid: u32, _gid: u32) -> Result<(), PathError> {
        Err(self.denied("chown", name))
    }

    fn lchown(&self, name: &str, _uid: u32, _gid: u32) -> Result<(), PathError> {
        Err(self.denied("lchown", name))
    }

    fn chtimes(&self, name: &str, _atime: SystemTime, _mtime: SystemTime) -> Result<(), PathError> {
        Err(self.denied("chtimes", name))
    }

    fn truncate(&self, name: &str, _size: i64) -> Result<(), PathError> {
        Err(self.denied("truncate", name))
    }
}
