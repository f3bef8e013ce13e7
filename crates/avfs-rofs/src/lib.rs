// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The read-only overlay backend.
//!
//! [`RoFs`] wraps any backend and rejects every mutation with the
//! personality's permission error, while read operations pass straight
//! through. It advertises [`Features::READ_ONLY`], which is how the
//! conformance suite knows to run only its reading half against it.

use std::sync::Arc;
use std::time::SystemTime;

use avfs_core::{
    Features, FileInfo, FileMode, IdentityMgr, IdmError, LinkError, OpenOptions, OsErrors, OsType,
    PathError, UserReader, Vfs, VfsFile,
};

/// A write-rejecting adaptor over any [`Vfs`] implementation.
pub struct RoFs<B> {
    base: B,
    errs: OsErrors,
}

impl<B: Vfs> RoFs<B> {
    pub fn new(base: B) -> Self {
        let errs = OsErrors::new(base.os_type());

        RoFs { base, errs }
    }

    fn denied(&self, op: &'static str, path: &str) -> PathError {
        PathError::new(op, path, self.errs.perm_denied)
    }

    fn denied_link(&self, op: &'static str, old: &str, new: &str) -> LinkError {
        LinkError::new(op, old, new, self.errs.perm_denied)
    }
}

impl<B: Vfs> Vfs for RoFs<B> {
    fn name(&self) -> String {
        self.base.name()
    }

    fn os_type(&self) -> OsType {
        self.base.os_type()
    }

    fn features(&self) -> Features {
        self.base.features() | Features::READ_ONLY
    }

    fn idm(&self) -> Arc<dyn IdentityMgr> {
        self.base.idm()
    }

    fn current_user(&self) -> Arc<dyn UserReader> {
        self.base.current_user()
    }

    fn set_user(&self, name: &str) -> Result<Arc<dyn UserReader>, IdmError> {
        self.base.set_user(name)
    }

    fn umask(&self) -> FileMode {
        self.base.umask()
    }

    fn set_umask(&self, mask: FileMode) {
        self.base.set_umask(mask)
    }

    // Navigation does not mutate the filesystem.

    fn chdir(&self, dir: &str) -> Result<(), PathError> {
        self.base.chdir(dir)
    }

    fn getwd(&self) -> Result<String, PathError> {
        self.base.getwd()
    }

    fn chroot(&self, path: &str) -> Result<(), PathError> {
        Err(self.denied("chroot", path))
    }

    // Mutations are rejected up front.

    fn mkdir(&self, name: &str, _perm: FileMode) -> Result<(), PathError> {
        Err(self.denied("mkdir", name))
    }

    fn mkdir_all(&self, path: &str, _perm: FileMode) -> Result<(), PathError> {
        Err(self.denied("mkdir", path))
    }

    fn open_file(
        &self,
        name: &str,
        flags: OpenOptions,
        perm: FileMode,
    ) -> Result<Box<dyn VfsFile>, PathError> {
        if flags.want_write() || flags.create || flags.create_new {
            return Err(self.denied("open", name));
        }

        // A read-only handle cannot write, so it passes through unwrapped.
        self.base.open_file(name, flags, perm)
    }

    fn link(&self, old_name: &str, new_name: &str) -> Result<(), LinkError> {
        Err(self.denied_link("link", old_name, new_name))
    }

    fn symlink(&self, old_name: &str, new_name: &str) -> Result<(), LinkError> {
        Err(self.denied_link("symlink", old_name, new_name))
    }

    fn readlink(&self, name: &str) -> Result<String, PathError> {
        self.base.readlink(name)
    }

    fn eval_symlinks(&self, path: &str) -> Result<String, PathError> {
        self.base.eval_symlinks(path)
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
        self.base.stat(path)
    }

    fn lstat(&self, path: &str) -> Result<FileInfo, PathError> {
        self.base.lstat(path)
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

    fn temp_dir(&self) -> String {
        self.base.temp_dir()
    }
}
