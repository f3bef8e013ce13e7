// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The capability trait every backend implements, and the open-file trait
//! its handles implement.
//!
//! The surface is thin but wide: each method maps onto one familiar
//! filesystem call, takes paths as personality-native strings and reports
//! failures through [`PathError`]/[`LinkError`] envelopes. Convenience
//! operations (`read_file`, `glob`, temp names, ...) have default bodies
//! delegating to [`crate::vfsutils`], so backends only implement the
//! primitives.

use std::sync::Arc;
use std::time::SystemTime;

use crate::errors::{FsError, LinkError, PathError};
use crate::features::Features;
use crate::idm::{IdentityMgr, IdmError, UserReader};
use crate::path_utils::PathUtils;
use crate::types::{FileInfo, FileMode, OpenOptions, Whence};
use crate::{vfsutils, OsType};

/// A virtual filesystem backend.
pub trait Vfs: Send + Sync {
    /// The configured name of this instance (may be empty).
    fn name(&self) -> String;

    /// The personality presented by this backend.
    fn os_type(&self) -> OsType;

    /// The capabilities this backend advertises.
    fn features(&self) -> Features;

    fn has_feature(&self, feature: Features) -> bool {
        self.features().contains(feature)
    }

    /// Path utilities for this backend's personality.
    fn utils(&self) -> PathUtils {
        PathUtils::new(self.os_type())
    }

    // Identity.

    /// The identity manager consulted for users and groups.
    fn idm(&self) -> Arc<dyn IdentityMgr>;

    /// The effective user of this instance.
    fn current_user(&self) -> Arc<dyn UserReader>;

    /// Switches the effective user to the named account, resolved through
    /// the identity manager. The replacement is atomic.
    fn set_user(&self, name: &str) -> Result<Arc<dyn UserReader>, IdmError>;

    // Umask.

    /// The file-mode creation mask applied by creating operations.
    fn umask(&self) -> FileMode;

    fn set_umask(&self, mask: FileMode);

    // Working directory and root.

    fn chdir(&self, dir: &str) -> Result<(), PathError>;

    fn getwd(&self) -> Result<String, PathError>;

    /// Rebinds the effective root for subsequent resolution. Requires root
    /// privileges and the [`Features::CHROOT`] capability.
    fn chroot(&self, path: &str) -> Result<(), PathError>;

    // Directories.

    fn mkdir(&self, name: &str, perm: FileMode) -> Result<(), PathError>;

    /// Creates the directory and any missing ancestors; an existing
    /// directory at any level is not an error.
    fn mkdir_all(&self, path: &str, perm: FileMode) -> Result<(), PathError>;

    // Files.

    /// Opens for reading: `open_file(name, read_only, 0)`.
    fn open(&self, name: &str) -> Result<Box<dyn VfsFile>, PathError> {
        self.open_file(name, OpenOptions::read_only(), FileMode::default())
    }

    /// Creates or truncates: `open_file(name, create_rw, 0o666)`.
    fn create(&self, name: &str) -> Result<Box<dyn VfsFile>, PathError> {
        self.open_file(name, OpenOptions::create_rw(), FileMode::new(0o666))
    }

    fn open_file(
        &self,
        name: &str,
        flags: OpenOptions,
        perm: FileMode,
    ) -> Result<Box<dyn VfsFile>, PathError>;

    // Namespace.

    /// Creates `new_name` as a hard link to `old_name`. Fails on
    /// directories.
    fn link(&self, old_name: &str, new_name: &str) -> Result<(), LinkError>;

    /// Creates `new_name` as a symbolic link to `old_name`; the target need
    /// not exist.
    fn symlink(&self, old_name: &str, new_name: &str) -> Result<(), LinkError>;

    fn readlink(&self, name: &str) -> Result<String, PathError>;

    /// The path with every symbolic link evaluated, cleaned.
    fn eval_symlinks(&self, path: &str) -> Result<String, PathError>;

    fn remove(&self, name: &str) -> Result<(), PathError>;

    /// Removes the whole subtree; a missing target is not an error.
    fn remove_all(&self, path: &str) -> Result<(), PathError>;

    fn rename(&self, old_name: &str, new_name: &str) -> Result<(), LinkError>;

    // Metadata.

    fn stat(&self, path: &str) -> Result<FileInfo, PathError>;

    /// Like `stat` but does not follow a final symbolic link.
    fn lstat(&self, path: &str) -> Result<FileInfo, PathError>;

    /// True if both descriptors refer to the same node of the same backend
    /// instance (hard links included).
    fn same_file(&self, fi1: &FileInfo, fi2: &FileInfo) -> bool {
        fi1.fs_id != 0 && fi1.fs_id == fi2.fs_id && fi1.node_id == fi2.node_id
    }

    fn chmod(&self, name: &str, mode: FileMode) -> Result<(), PathError>;

    fn chown(&self, name: &str, uid: u32, gid: u32) -> Result<(), PathError>;

    /// Like `chown` but does not follow a final symbolic link.
    fn lchown(&self, name: &str, uid: u32, gid: u32) -> Result<(), PathError>;

    fn chtimes(&self, name: &str, atime: SystemTime, mtime: SystemTime) -> Result<(), PathError>;

    fn truncate(&self, name: &str, size: i64) -> Result<(), PathError>;

    // Convenience.

    fn read_file(&self, name: &str) -> Result<Vec<u8>, PathError> {
        vfsutils::read_file(self, name)
    }

    fn write_file(&self, name: &str, data: &[u8], perm: FileMode) -> Result<(), PathError> {
        vfsutils::write_file(self, name, data, perm)
    }

    /// The directory's entries, sorted by name.
    fn read_dir(&self, name: &str) -> Result<Vec<FileInfo>, PathError> {
        vfsutils::read_dir(self, name)
    }

    /// The names of all files matching the pattern, sorted. I/O errors are
    /// ignored; the only reported failure is a malformed pattern.
    fn glob(&self, pattern: &str) -> Result<Vec<String>, FsError> {
        vfsutils::glob(self, pattern)
    }

    /// Visits every file below `root` depth-first in lexical order, without
    /// following symbolic links.
    fn walk(
        &self,
        root: &str,
        visit: &mut dyn FnMut(&str, &FileInfo),
    ) -> Result<(), PathError> {
        vfsutils::walk(self, root, visit)
    }

    // Temporary files.

    /// The personality's default directory for temporary files.
    fn temp_dir(&self) -> String {
        self.os_type().tmp_dir().to_string()
    }

    /// Creates a fresh directory under `dir` (or the default temp dir) with
    /// a name built from the pattern and a random suffix.
    fn make_temp_dir(&self, dir: &str, pattern: &str) -> Result<String, PathError> {
        vfsutils::mkdir_temp(self, dir, pattern)
    }

    /// Creates and opens a fresh file under `dir` (or the default temp
    /// dir), named from the pattern and a random suffix.
    fn make_temp_file(&self, dir: &str, pattern: &str) -> Result<Box<dyn VfsFile>, PathError> {
        vfsutils::create_temp(self, dir, pattern)
    }
}

/// An open file (or directory) handle.
///
/// Methods take `&self`: the handle carries its own interior-mutable offset
/// and cursor, so it can be shared the way a POSIX descriptor can. After
/// [`VfsFile::close`] every operation reports the closed-file error and
/// [`VfsFile::fd`] returns `u64::MAX`; dropping an open handle closes it.
pub trait VfsFile: Send + Sync + std::fmt::Debug {
    /// Makes this (directory) handle the working directory of its backend.
    fn chdir(&self) -> Result<(), PathError>;

    fn chmod(&self, mode: FileMode) -> Result<(), PathError>;

    fn chown(&self, uid: u32, gid: u32) -> Result<(), PathError>;

    /// Closes the handle. A second close reports the closed-file error.
    fn close(&self) -> Result<(), PathError>;

    /// The handle's descriptor number; `u64::MAX` once closed.
    fn fd(&self) -> u64;

    /// The path this handle was opened with.
    fn name(&self) -> String;

    /// Reads at the current offset, advancing it. Returns 0 at end of file.
    fn read(&self, buf: &mut [u8]) -> Result<usize, PathError>;

    /// Reads at an explicit offset without touching the handle offset.
    fn read_at(&self, buf: &mut [u8], off: i64) -> Result<usize, PathError>;

    /// Directory entries from the handle's cursor: at most `n` of them when
    /// `n > 0`, all remaining otherwise.
    fn readdir(&self, n: i64) -> Result<Vec<FileInfo>, PathError>;

    /// Like `readdir`, names only.
    fn readdirnames(&self, n: i64) -> Result<Vec<String>, PathError>;

    /// Repositions the offset; the result may exceed the file size (writes
    /// will extend), but may not be negative.
    fn seek(&self, offset: i64, whence: Whence) -> Result<i64, PathError>;

    fn stat(&self) -> Result<FileInfo, PathError>;

    /// Flushes buffered state. A no-op on in-memory backends, but still
    /// fails once closed.
    fn sync(&self) -> Result<(), PathError>;

    fn truncate(&self, size: i64) -> Result<(), PathError>;

    /// Writes at the current offset (or at end of file when opened for
    /// append), advancing it.
    fn write(&self, buf: &[u8]) -> Result<usize, PathError>;

    /// Writes at an explicit offset; a gap past end of file zero-fills.
    fn write_at(&self, buf: &[u8], off: i64) -> Result<usize, PathError>;

    fn write_string(&self, s: &str) -> Result<usize, PathError> {
        self.write(s.as_bytes())
    }
}
