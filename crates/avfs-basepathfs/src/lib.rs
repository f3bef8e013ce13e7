// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The base-path overlay backend.
//!
//! [`BasePathFs`] restricts every operation of an underlying backend to a
//! fixed directory prefix: incoming paths are joined with the prefix,
//! outgoing paths (`getwd`, handle names, error envelopes) have it stripped
//! again. Operations that would reveal paths outside the prefix - symlink
//! creation and inspection - are denied outright, so the overlay never
//! advertises [`Features::SYMLINK`].
//!
//! Construction on a prefix that is not an existing directory panics: that
//! is a programmer error, not a runtime condition.

use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use avfs_core::{
    Features, FileInfo, FileMode, IdentityMgr, IdmError, LinkError, OpenOptions, OsType,
    PathError, UserReader, Vfs, VfsFile,
};
use tracing::debug;

struct BasePathInner<B> {
    base: B,
    /// The prefix, cleaned and absolute; cleared by `chroot` because the
    /// underlying backend then treats it as its root.
    base_path: RwLock<String>,
}

/// A prefix-rewriting adaptor over any [`Vfs`] implementation.
pub struct BasePathFs<B> {
    inner: Arc<BasePathInner<B>>,
}

impl<B> Clone for BasePathFs<B> {
    fn clone(&self) -> Self {
        BasePathFs { inner: self.inner.clone() }
    }
}

impl<B: Vfs> BasePathFs<B> {
    /// Wraps `base`, confining all operations below `path`.
    ///
    /// # Panics
    ///
    /// Panics if `path` does not name an existing directory on `base`.
    pub fn new(base: B, path: &str) -> Self {
        let base_path = base.utils().clean(path);

        let info = base
            .stat(&base_path)
            .unwrap_or_else(|err| panic!("base path {base_path}: {err}"));
        assert!(info.is_dir(), "base path {base_path} is not a directory");

        debug!(base_path = %base_path, "base-path overlay created");

        BasePathFs { inner: Arc::new(BasePathInner { base, base_path: RwLock::new(base_path) }) }
    }

    fn base(&self) -> &B {
        &self.inner.base
    }

    fn base_path(&self) -> String {
        self.inner.base_path.read().expect("base path poisoned").clone()
    }

    /// Maps a caller path onto the underlying backend.
    pub fn to_base_path(&self, path: &str) -> String {
        let ut = self.base().utils();
        if path.is_empty() || ut.is_abs(path) {
            // The prefix carries the volume; drop the caller's.
            let vol_len = ut.volume_name_len(path);

            return ut.join(&[&self.base_path(), &path[vol_len..]]);
        }

        // Relative paths resolve against the (already confined) cwd.
        path.to_string()
    }

    /// Maps an underlying path back into the caller's namespace.
    ///
    /// # Panics
    ///
    /// Panics if `path` does not lie under the prefix; only paths produced
    /// by the underlying backend are valid here.
    pub fn from_base_path(&self, path: &str) -> String {
        let base_path = self.base_path();
        let stripped = path
            .strip_prefix(&base_path)
            .unwrap_or_else(|| panic!("path {path} is outside the base path {base_path}"));

        if stripped.is_empty() {
            (self.base().utils().separator() as char).to_string()
        } else {
            stripped.to_string()
        }
    }

    /// Rewrites the path inside an error envelope back to the caller's
    /// namespace.
    fn restore_error(&self, mut err: PathError) -> PathError {
        let base_path = self.base_path();
        if let Some(stripped) = err.path.strip_prefix(&base_path) {
            err.path = if stripped.is_empty() {
                (self.base().utils().separator() as char).to_string()
            } else {
                stripped.to_string()
            };
        }

        err
    }

    fn restore_link_error(&self, mut err: LinkError) -> LinkError {
        let base_path = self.base_path();
        for path in [&mut err.old, &mut err.new] {
            if let Some(stripped) = path.strip_prefix(&base_path) {
                if !stripped.is_empty() {
                    *path = stripped.to_string();
                }
            }
        }

        err
    }
}

impl<B: Vfs + 'static> Vfs for BasePathFs<B> {
    fn name(&self) -> String {
        self.base().name()
    }

    fn os_type(&self) -> OsType {
        self.base().os_type()
    }

    fn features(&self) -> Features {
        self.base().features().without(Features::SYMLINK)
    }

    fn idm(&self) -> Arc<dyn IdentityMgr> {
        self.base().idm()
    }

    fn current_user(&self) -> Arc<dyn UserReader> {
        self.base().current_user()
    }

    fn set_user(&self, name: &str) -> Result<Arc<dyn UserReader>, IdmError> {
        self.base().set_user(name)
    }

    fn umask(&self) -> FileMode {
        self.base().umask()
    }

    fn set_umask(&self, mask: FileMode) {
        self.base().set_umask(mask)
    }

    fn chdir(&self, dir: &str) -> Result<(), PathError> {
        self.base().chdir(&self.to_base_path(dir)).map_err(|e| self.restore_error(e))
    }

    fn getwd(&self) -> Result<String, PathError> {
        let cwd = self.base().getwd().map_err(|e| self.restore_error(e))?;

        Ok(self.from_base_path(&cwd))
    }

    fn chroot(&self, path: &str) -> Result<(), PathError> {
        self.base().chroot(&self.to_base_path(path)).map_err(|e| self.restore_error(e))?;

        // The underlying backend now treats the prefix as its root.
        self.inner.base_path.write().expect("base path poisoned").clear();

        Ok(())
    }

    fn mkdir(&self, name: &str, perm: FileMode) -> Result<(), PathError> {
        self.base().mkdir(&self.to_base_path(name), perm).map_err(|e| self.restore_error(e))
    }

    fn mkdir_all(&self, path: &str, perm: FileMode) -> Result<(), PathError> {
        self.base().mkdir_all(&self.to_base_path(path), perm).map_err(|e| self.restore_error(e))
    }

    fn open_file(
        &self,
        name: &str,
        flags: OpenOptions,
        perm: FileMode,
    ) -> Result<Box<dyn VfsFile>, PathError> {
        let file = self
            .base()
            .open_file(&self.to_base_path(name), flags, perm)
            .map_err(|e| self.restore_error(e))?;

        Ok(Box::new(BasePathFile { fs: self.clone(), file }))
    }

    fn link(&self, old_name: &str, new_name: &str) -> Result<(), LinkError> {
        self.base()
            .link(&self.to_base_path(old_name), &self.to_base_path(new_name))
            .map_err(|e| self.restore_link_error(e))
    }

    fn symlink(&self, old_name: &str, new_name: &str) -> Result<(), LinkError> {
        // A link target could name a path outside the prefix.
        Err(LinkError::new(
            "symlink",
            old_name,
            new_name,
            avfs_core::OsErrors::new(self.os_type()).perm_denied,
        ))
    }

    fn readlink(&self, name: &str) -> Result<String, PathError> {
        Err(PathError::new(
            "readlink",
            name,
            avfs_core::OsErrors::new(self.os_type()).perm_denied,
        ))
    }

    fn eval_symlinks(&self, path: &str) -> Result<String, PathError> {
        Err(PathError::new("lstat", path, avfs_core::OsErrors::new(self.os_type()).perm_denied))
    }

    fn remove(&self, name: &str) -> Result<(), PathError> {
        self.base().remove(&self.to_base_path(name)).map_err(|e| self.restore_error(e))
    }

    fn remove_all(&self, path: &str) -> Result<(), PathError> {
        self.base().remove_all(&self.to_base_path(path)).map_err(|e| self.restore_error(e))
    }

    fn rename(&self, old_name: &str, new_name: &str) -> Result<(), LinkError> {
        self.base()
            .rename(&self.to_base_path(old_name), &self.to_base_path(new_name))
            .map_err(|e| self.restore_link_error(e))
    }

    fn stat(&self, path: &str) -> Result<FileInfo, PathError> {
        self.base().stat(&self.to_base_path(path)).map_err(|e| self.restore_error(e))
    }

    fn lstat(&self, path: &str) -> Result<FileInfo, PathError> {
        self.base().lstat(&self.to_base_path(path)).map_err(|e| self.restore_error(e))
    }

    fn chmod(&self, name: &str, mode: FileMode) -> Result<(), PathError> {
        self.base().chmod(&self.to_base_path(name), mode).map_err(|e| self.restore_error(e))
    }

    fn chown(&self, name: &str, uid: u32, gid: u32) -> Result<(), PathError> {
        self.base().chown(&self.to_base_path(name), uid, gid).map_err(|e| self.restore_error(e))
    }

    fn lchown(&self, name: &str, uid: u32, gid: u32) -> Result<(), PathError> {
        self.base().lchown(&self.to_base_path(name), uid, gid).map_err(|e| self.restore_error(e))
    }

    fn chtimes(&self, name: &str, atime: SystemTime, mtime: SystemTime) -> Result<(), PathError> {
        self.base()
            .chtimes(&self.to_base_path(name), atime, mtime)
            .map_err(|e| self.restore_error(e))
    }

    fn truncate(&self, name: &str, size: i64) -> Result<(), PathError> {
        self.base().truncate(&self.to_base_path(name), size).map_err(|e| self.restore_error(e))
    }

    fn temp_dir(&self) -> String {
        self.base().temp_dir()
    }
}

/// A handle wrapper that keeps the prefix out of `name()` and error paths.
pub struct BasePathFile<B> {
    fs: BasePathFs<B>,
    file: Box<dyn VfsFile>,
}

impl<B> std::fmt::Debug for BasePathFile<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasePathFile").field("file", &self.file).finish()
    }
}

impl<B: Vfs> BasePathFile<B> {
    fn restore<T>(&self, result: Result<T, PathError>) -> Result<T, PathError> {
        result.map_err(|e| self.fs.restore_error(e))
    }
}

impl<B: Vfs + 'static> VfsFile for BasePathFile<B> {
    fn chdir(&self) -> Result<(), PathError> {
        self.restore(self.file.chdir())
    }

    fn chmod(&self, mode: FileMode) -> Result<(), PathError> {
        self.restore(self.file.chmod(mode))
    }

    fn chown(&self, uid: u32, gid: u32) -> Result<(), PathError> {
        self.restore(self.file.chown(uid, gid))
    }

    fn close(&self) -> Result<(), PathError> {
        self.restore(self.file.close())
    }

    fn fd(&self) -> u64 {
        self.file.fd()
    }

    fn name(&self) -> String {
        let name = self.file.name();
        let base_path = self.fs.base_path();

        match name.strip_prefix(&base_path) {
            Some("") | None => name,
            Some(stripped) => stripped.to_string(),
        }
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, PathError> {
        self.restore(self.file.read(buf))
    }

    fn read_at(&self, buf: &mut [u8], off: i64) -> Result<usize, PathError> {
        self.restore(self.file.read_at(buf, off))
    }

    fn readdir(&self, n: i64) -> Result<Vec<FileInfo>, PathError> {
        self.restore(self.file.readdir(n))
    }

    fn readdirnames(&self, n: i64) -> Result<Vec<String>, PathError> {
        self.restore(self.file.readdirnames(n))
    }

    fn seek(&self, offset: i64, whence: avfs_core::Whence) -> Result<i64, PathError> {
        self.restore(self.file.seek(offset, whence))
    }

    fn stat(&self) -> Result<FileInfo, PathError> {
        self.restore(self.file.stat())
    }

    fn sync(&self) -> Result<(), PathError> {
        self.restore(self.file.sync())
    }

    fn truncate(&self, size: i64) -> Result<(), PathError> {
        self.restore(self.file.truncate(size))
    }

    fn write(&self, buf: &[u8]) -> Result<usize, PathError> {
        self.restore(self.file.write(buf))
    }

    fn write_at(&self, buf: &[u8], off: i64) -> Result<usize, PathError> {
        self.restore(self.file.write_at(buf, off))
    }
}
