// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The `Vfs` operation surface of the in-memory backend.
//!
//! Every operation makes the path absolute against the working directory,
//! resolves it under the store lock, applies the permission rules of the
//! final step and wraps failures in an envelope carrying the canonical
//! lowercase syscall name and the path the caller passed.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use avfs_core::{
    Features, FileInfo, FileMode, FsError, IdentityMgr, IdmError, LinkError, OpenOptions, OsType,
    PathError, UserReader, Vfs, VfsFile, WindowsError,
};
use tracing::debug;

use crate::file::MemFile;
use crate::node::{NodeId, NodeKind, NodeStore, StoreError, SETTABLE_MODE};
use crate::resolver::{resolve, Resolved, ResolveErrorKind, ResolveFailure};
use crate::MemFs;

fn system_time_ns(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_nanos() as i64,
        Err(e) => -(e.duration().as_nanos() as i64),
    }
}

impl MemFs {
    /// Builds the outward metadata view of a node. The Windows personality
    /// reports degenerate permissions and link counts.
    pub(crate) fn file_info(&self, store: &NodeStore, name: &str, id: NodeId) -> FileInfo {
        let node = store.node(id);

        let size = match &node.kind {
            NodeKind::File { data } => data.len() as i64,
            NodeKind::Symlink { target } => target.len() as i64,
            NodeKind::Directory { .. } => 0,
        };

        let mode = match self.inner.os_type {
            OsType::Linux => node.mode,
            OsType::Windows => match &node.kind {
                NodeKind::Directory { .. } => FileMode::DIR | FileMode::new(0o777),
                NodeKind::Symlink { .. } => FileMode::SYMLINK | FileMode::new(0o777),
                NodeKind::File { .. } => FileMode::new(0o666),
            },
        };

        let nlink = match (&node.kind, self.inner.os_type) {
            (NodeKind::Directory { .. }, OsType::Linux) => 2 + store.subdir_count(id),
            (NodeKind::Directory { .. }, OsType::Windows) => 1,
            _ => node.nlink,
        };

        FileInfo {
            name: name.to_string(),
            size,
            mode,
            mtime_ns: node.mtime_ns,
            uid: node.uid,
            gid: node.gid,
            nlink,
            fs_id: self.inner.fs_id,
            node_id: id.0,
        }
    }

    /// Absolutises a caller path; an empty path is never valid.
    fn abs_checked(&self, path: &str) -> Result<String, FsError> {
        if path.is_empty() {
            return Err(self.errs().no_such_dir);
        }

        Ok(self.abs(path))
    }

    fn map_failure(&self, failure: &ResolveFailure) -> FsError {
        let errs = self.errs();
        match failure.kind {
            ResolveErrorKind::NoSuchDir => errs.no_such_dir,
            ResolveErrorKind::NotADirectory => errs.not_a_directory,
            ResolveErrorKind::PermDenied => errs.perm_denied,
            ResolveErrorKind::TooManySymlinks => errs.too_many_symlinks,
        }
    }

    fn resolve_in(
        &self,
        store: &NodeStore,
        abs_path: &str,
        follow_final: bool,
    ) -> Result<Resolved, FsError> {
        let user = self.user();

        resolve(
            store,
            self.inner.utils,
            user.as_ref(),
            self.effective_root(),
            abs_path,
            follow_final,
            self.inner.max_symlinks,
        )
        .map_err(|f| self.map_failure(&f))
    }

    /// Write + search permission on a directory about to be mutated.
    fn check_dir_write(&self, store: &NodeStore, dir: NodeId) -> Result<(), FsError> {
        let user = self.user();
        if store.node(dir).check_perm(user.as_ref(), false, true, true) {
            Ok(())
        } else {
            Err(self.errs().perm_denied)
        }
    }

    fn effective_perm(&self, perm: FileMode) -> FileMode {
        perm & !Vfs::umask(self)
    }

    fn map_store_err(&self, err: StoreError) -> FsError {
        let errs = self.errs();
        match err {
            StoreError::Exists => errs.file_exists,
            StoreError::NotEmpty => errs.dir_not_empty,
            StoreError::NotFound => errs.no_such_file,
            StoreError::OpNotPermitted => errs.op_not_permitted,
            StoreError::Invalid => errs.invalid_argument,
        }
    }

    fn stat_op(&self, path: &str, op: &'static str, follow: bool) -> Result<FileInfo, PathError> {
        let abs = self.abs_checked(path).map_err(|e| PathError::new(op, path, e))?;
        let store = self.store_read();

        let resolved =
            self.resolve_in(&store, &abs, follow).map_err(|e| PathError::new(op, path, e))?;
        let id = resolved
            .id
            .ok_or_else(|| PathError::new(op, path, self.errs().no_such_file))?;

        Ok(self.file_info(&store, &self.inner.utils.base(&abs), id))
    }

    fn remove_tree(
        &self,
        store: &mut NodeStore,
        parent: NodeId,
        name: &str,
        id: NodeId,
        user: &dyn UserReader,
    ) -> Result<(), FsError> {
        if store.node(id).is_dir() {
            if !store.node(id).check_perm(user, false, true, true) {
                return Err(self.errs().perm_denied);
            }

            let mut names: Vec<String> = match store.node(id).children() {
                Some(children) => children.keys().cloned().collect(),
                None => Vec::new(),
            };
            names.sort();

            for child_name in names {
                if let Some(child) = store.lookup(id, &child_name) {
                    self.remove_tree(store, id, &child_name, child, user)?;
                }
            }
        }

        store.unlink(parent, name).map_err(|e| self.map_store_err(e))
    }
}

impl Vfs for MemFs {
    fn name(&self) -> String {
        self.inner.name.clone()
    }

    fn os_type(&self) -> OsType {
        self.inner.os_type
    }

    fn features(&self) -> Features {
        self.inner.features
    }

    // Identity.

    fn idm(&self) -> Arc<dyn IdentityMgr> {
        self.inner.idm.clone()
    }

    fn current_user(&self) -> Arc<dyn UserReader> {
        self.user()
    }

    fn set_user(&self, name: &str) -> Result<Arc<dyn UserReader>, IdmError> {
        let user = self.inner.idm.lookup_user(name)?;
        *self.inner.user.write().expect("user poisoned") = user.clone();

        Ok(user)
    }

    // Umask.

    fn umask(&self) -> FileMode {
        FileMode::new(self.inner.umask.load(std::sync::atomic::Ordering::Relaxed))
    }

    fn set_umask(&self, mask: FileMode) {
        self.inner.umask.store(mask.perm().bits(), std::sync::atomic::Ordering::Relaxed);
    }

    // Working directory and root.

    fn chdir(&self, dir: &str) -> Result<(), PathError> {
        const OP: &str = "chdir";

        let abs = self.abs_checked(dir).map_err(|e| PathError::new(OP, dir, e))?;
        let store = self.store_read();

        let resolved =
            self.resolve_in(&store, &abs, true).map_err(|e| PathError::new(OP, dir, e))?;
        let id =
            resolved.id.ok_or_else(|| PathError::new(OP, dir, self.errs().no_such_file))?;

        let node = store.node(id);
        if !node.is_dir() {
            return Err(PathError::new(OP, dir, self.errs().not_a_directory));
        }
        if !node.check_perm(self.user().as_ref(), false, false, true) {
            return Err(PathError::new(OP, dir, self.errs().perm_denied));
        }
        drop(store);

        self.set_cur_dir(abs);

        Ok(())
    }

    fn getwd(&self) -> Result<String, PathError> {
        Ok(self.inner.cur_dir.read().expect("cur_dir poisoned").clone())
    }

    fn chroot(&self, path: &str) -> Result<(), PathError> {
        const OP: &str = "chroot";

        if !self.has_feature(Features::CHROOT) {
            return Err(PathError::new(OP, path, self.errs().op_not_permitted));
        }
        if !self.user().is_root() {
            return Err(PathError::new(OP, path, self.errs().op_not_permitted));
        }

        let abs = self.abs_checked(path).map_err(|e| PathError::new(OP, path, e))?;
        let store = self.store_read();

        let resolved =
            self.resolve_in(&store, &abs, true).map_err(|e| PathError::new(OP, path, e))?;
        let id =
            resolved.id.ok_or_else(|| PathError::new(OP, path, self.errs().no_such_file))?;
        if !store.node(id).is_dir() {
            return Err(PathError::new(OP, path, self.errs().not_a_directory));
        }
        drop(store);

        debug!(path = %abs, "chroot");
        *self.inner.root.write().expect("root poisoned") = id;
        self.set_cur_dir("/".to_string());

        Ok(())
    }

    // Directories.

    fn mkdir(&self, name: &str, perm: FileMode) -> Result<(), PathError> {
        const OP: &str = "mkdir";

        let abs = self.abs_checked(name).map_err(|e| PathError::new(OP, name, e))?;
        let user = self.user();
        let mut store = self.store_write();

        let resolved =
            self.resolve_in(&store, &abs, false).map_err(|e| PathError::new(OP, name, e))?;
        if resolved.id.is_some() {
            return Err(PathError::new(OP, name, self.errs().file_exists));
        }
        let parent = resolved.parent.expect("missing final segment has a parent");

        self.check_dir_write(&store, parent).map_err(|e| PathError::new(OP, name, e))?;
        if self.inner.utils.is_reserved_name(&resolved.name) {
            return Err(PathError::new(OP, name, self.errs().file_exists));
        }

        store
            .create_directory(
                parent,
                &resolved.name,
                self.effective_perm(perm),
                user.uid(),
                user.gid(),
            )
            .map_err(|e| PathError::new(OP, name, self.map_store_err(e)))?;

        Ok(())
    }

    fn mkdir_all(&self, path: &str, perm: FileMode) -> Result<(), PathError> {
        // Fast path: an existing directory at any level is success.
        match self.stat(path) {
            Ok(info) if info.is_dir() => return Ok(()),
            Ok(_) => return Err(PathError::new("mkdir", path, self.errs().not_a_directory)),
            Err(_) => {}
        }

        let abs = self.abs(path);
        let parent = self.inner.utils.dir(&abs);
        if parent != abs {
            self.mkdir_all(&parent, perm)?;
        }

        match self.mkdir(&abs, perm) {
            Ok(()) => Ok(()),
            Err(err) => {
                // A concurrent creator is not an error.
                match self.lstat(&abs) {
                    Ok(info) if info.is_dir() => Ok(()),
                    _ => Err(err),
                }
            }
        }
    }

    // Files.

    fn open_file(
        &self,
        name: &str,
        flags: OpenOptions,
        perm: FileMode,
    ) -> Result<Box<dyn VfsFile>, PathError> {
        const OP: &str = "open";

        let abs = self.abs_checked(name).map_err(|e| PathError::new(OP, name, e))?;
        let user = self.user();
        let mut store = self.store_write();

        let resolved =
            self.resolve_in(&store, &abs, true).map_err(|e| PathError::new(OP, name, e))?;

        let id = match resolved.id {
            Some(id) => {
                if flags.create_new {
                    return Err(PathError::new(OP, name, self.errs().file_exists));
                }
                id
            }
            None => {
                if !flags.create && !flags.create_new {
                    return Err(PathError::new(OP, name, self.errs().no_such_file));
                }

                let parent = resolved.parent.expect("missing final segment has a parent");
                self.check_dir_write(&store, parent)
                    .map_err(|e| PathError::new(OP, name, e))?;
                if self.inner.utils.is_reserved_name(&resolved.name) {
                    return Err(PathError::new(OP, name, self.errs().file_exists));
                }

                store
                    .create_regular(
                        parent,
                        &resolved.name,
                        self.effective_perm(perm),
                        user.uid(),
                        user.gid(),
                    )
                    .map_err(|e| PathError::new(OP, name, self.map_store_err(e)))?
            }
        };

        let node = store.node(id);
        match &node.kind {
            NodeKind::Directory { .. } => {
                if flags.want_write() {
                    return Err(PathError::new(OP, name, self.errs().is_a_directory));
                }
                if !node.check_perm(user.as_ref(), flags.read, false, false) {
                    return Err(PathError::new(OP, name, self.errs().perm_denied));
                }
            }
            NodeKind::File { .. } => {
                if !node.check_perm(user.as_ref(), flags.read, flags.want_write(), false) {
                    return Err(PathError::new(OP, name, self.errs().perm_denied));
                }
            }
            NodeKind::Symlink { .. } => {
                // The resolver followed the final link; a symlink node here
                // means the walk was asked not to, which open never does.
                return Err(PathError::new(OP, name, self.errs().invalid_argument));
            }
        }

        if flags.truncate && flags.want_write() {
            let node = store.node_mut(id);
            if let NodeKind::File { data } = &mut node.kind {
                data.clear();
                node.touch();
            }
        }

        store.pin(id);
        drop(store);

        Ok(Box::new(MemFile::open(self, abs, id, flags)))
    }

    // Namespace.

    fn link(&self, old_name: &str, new_name: &str) -> Result<(), LinkError> {
        const OP: &str = "link";

        let abs_old = self
            .abs_checked(old_name)
            .map_err(|e| LinkError::new(OP, old_name, new_name, e))?;
        let abs_new = self
            .abs_checked(new_name)
            .map_err(|e| LinkError::new(OP, old_name, new_name, e))?;
        let mut store = self.store_write();

        let r_old = self
            .resolve_in(&store, &abs_old, false)
            .map_err(|e| LinkError::new(OP, old_name, new_name, e))?;
        let src = r_old
            .id
            .ok_or_else(|| LinkError::new(OP, old_name, new_name, self.errs().no_such_file))?;

        let r_new = self
            .resolve_in(&store, &abs_new, false)
            .map_err(|e| LinkError::new(OP, old_name, new_name, e))?;
        if r_new.id.is_some() {
            return Err(LinkError::new(OP, old_name, new_name, self.errs().file_exists));
        }
        let parent = r_new.parent.expect("missing final segment has a parent");

        self.check_dir_write(&store, parent)
            .map_err(|e| LinkError::new(OP, old_name, new_name, e))?;

        store
            .link_existing(parent, &r_new.name, src)
            .map_err(|e| LinkError::new(OP, old_name, new_name, self.map_store_err(e)))
    }

    fn symlink(&self, old_name: &str, new_name: &str) -> Result<(), LinkError> {
        const OP: &str = "symlink";

        if !self.has_feature(Features::SYMLINK) {
            let err = match self.inner.os_type {
                OsType::Windows => FsError::Windows(WindowsError::PrivilegeNotHeld),
                OsType::Linux => self.errs().perm_denied,
            };

            return Err(LinkError::new(OP, old_name, new_name, err));
        }

        let abs_new = self
            .abs_checked(new_name)
            .map_err(|e| LinkError::new(OP, old_name, new_name, e))?;
        let user = self.user();
        let mut store = self.store_write();

        let resolved = self
            .resolve_in(&store, &abs_new, false)
            .map_err(|e| LinkError::new(OP, old_name, new_name, e))?;
        if resolved.id.is_some() {
            return Err(LinkError::new(OP, old_name, new_name, self.errs().file_exists));
        }
        let parent = resolved.parent.expect("missing final segment has a parent");

        self.check_dir_write(&store, parent)
            .map_err(|e| LinkError::new(OP, old_name, new_name, e))?;

        // The target string is stored uninterpreted; it is only evaluated
        // when the link is resolved.
        store
            .create_symlink(parent, &resolved.name, old_name, user.uid(), user.gid())
            .map_err(|e| LinkError::new(OP, old_name, new_name, self.map_store_err(e)))?;

        Ok(())
    }

    fn readlink(&self, name: &str) -> Result<String, PathError> {
        const OP: &str = "readlink";

        let abs = self.abs_checked(name).map_err(|e| PathError::new(OP, name, e))?;
        let store = self.store_read();

        let resolved =
            self.resolve_in(&store, &abs, false).map_err(|e| PathError::new(OP, name, e))?;
        let id =
            resolved.id.ok_or_else(|| PathError::new(OP, name, self.errs().no_such_file))?;

        match &store.node(id).kind {
            NodeKind::Symlink { target } => Ok(target.clone()),
            _ => {
                let err = match self.inner.os_type {
                    OsType::Windows => FsError::Windows(WindowsError::NotReparsePoint),
                    OsType::Linux => self.errs().invalid_argument,
                };

                Err(PathError::new(OP, name, err))
            }
        }
    }

    fn eval_symlinks(&self, path: &str) -> Result<String, PathError> {
        // Reported as an lstat of the offending path, like the original.
        const OP: &str = "lstat";

        let abs = self.abs_checked(path).map_err(|e| PathError::new(OP, path, e))?;
        let user = self.user();
        let store = self.store_read();

        let walked = resolve(
            &store,
            self.inner.utils,
            user.as_ref(),
            self.effective_root(),
            &abs,
            true,
            self.inner.max_symlinks,
        );

        match walked {
            Err(f) => {
                let err = self.map_failure(&f);
                Err(PathError::new(OP, f.left_part, err))
            }
            Ok(resolved) => match resolved.id {
                Some(_) => Ok(resolved.path),
                None => Err(PathError::new(OP, resolved.path, self.errs().no_such_file)),
            },
        }
    }

    fn remove(&self, name: &str) -> Result<(), PathError> {
        const OP: &str = "remove";

        let abs = self.abs_checked(name).map_err(|e| PathError::new(OP, name, e))?;
        let mut store = self.store_write();

        let resolved =
            self.resolve_in(&store, &abs, false).map_err(|e| PathError::new(OP, name, e))?;
        let _id =
            resolved.id.ok_or_else(|| PathError::new(OP, name, self.errs().no_such_file))?;
        let parent = resolved
            .parent
            .ok_or_else(|| PathError::new(OP, name, self.errs().invalid_argument))?;

        self.check_dir_write(&store, parent).map_err(|e| PathError::new(OP, name, e))?;

        store
            .unlink(parent, &resolved.name)
            .map_err(|e| PathError::new(OP, name, self.map_store_err(e)))
    }

    fn remove_all(&self, path: &str) -> Result<(), PathError> {
        const OP: &str = "removeall";

        if path.is_empty() {
            return Ok(());
        }
        let abs = self.abs(path);
        let user = self.user();
        let mut store = self.store_write();

        let walked = resolve(
            &store,
            self.inner.utils,
            user.as_ref(),
            self.effective_root(),
            &abs,
            false,
            self.inner.max_symlinks,
        );

        let resolved = match walked {
            Ok(resolved) => resolved,
            // A path that does not exist at any level is a success.
            Err(f) if f.kind == ResolveErrorKind::NoSuchDir => return Ok(()),
            Err(f) => return Err(PathError::new(OP, path, self.map_failure(&f))),
        };
        let Some(id) = resolved.id else {
            return Ok(());
        };

        match resolved.parent {
            Some(parent) => {
                self.check_dir_write(&store, parent)
                    .map_err(|e| PathError::new(OP, path, e))?;
                self.remove_tree(&mut store, parent, &resolved.name, id, user.as_ref())
                    .map_err(|e| PathError::new(OP, path, e))
            }
            None => {
                // Removing the root keeps the root but empties it.
                let mut names: Vec<String> = match store.node(id).children() {
                    Some(children) => children.keys().cloned().collect(),
                    None => Vec::new(),
                };
                names.sort();

                for name in names {
                    if let Some(child) = store.lookup(id, &name) {
                        self.remove_tree(&mut store, id, &name, child, user.as_ref())
                            .map_err(|e| PathError::new(OP, path, e))?;
                    }
                }

                Ok(())
            }
        }
    }

    fn rename(&self, old_name: &str, new_name: &str) -> Result<(), LinkError> {
        const OP: &str = "rename";

        let abs_old = self
            .abs_checked(old_name)
            .map_err(|e| LinkError::new(OP, old_name, new_name, e))?;
        let abs_new = self
            .abs_checked(new_name)
            .map_err(|e| LinkError::new(OP, old_name, new_name, e))?;

        let ut = self.inner.utils;
        if !ut.volume_name(&abs_old).eq_ignore_ascii_case(ut.volume_name(&abs_new)) {
            return Err(LinkError::new(OP, old_name, new_name, self.errs().cross_dev_link));
        }

        let mut store = self.store_write();

        let r_old = self
            .resolve_in(&store, &abs_old, false)
            .map_err(|e| LinkError::new(OP, old_name, new_name, e))?;
        if r_old.id.is_none() {
            return Err(LinkError::new(OP, old_name, new_name, self.errs().no_such_file));
        }
        let p_old = r_old
            .parent
            .ok_or_else(|| LinkError::new(OP, old_name, new_name, self.errs().invalid_argument))?;

        let r_new = self
            .resolve_in(&store, &abs_new, false)
            .map_err(|e| LinkError::new(OP, old_name, new_name, e))?;
        let p_new = r_new
            .parent
            .ok_or_else(|| LinkError::new(OP, old_name, new_name, self.errs().invalid_argument))?;

        self.check_dir_write(&store, p_old)
            .and_then(|()| self.check_dir_write(&store, p_new))
            .map_err(|e| LinkError::new(OP, old_name, new_name, e))?;

        store
            .rename(p_old, &r_old.name, p_new, &r_new.name)
            .map_err(|e| LinkError::new(OP, old_name, new_name, self.map_store_err(e)))
    }

    // Metadata.

    fn stat(&self, path: &str) -> Result<FileInfo, PathError> {
        self.stat_op(path, "stat", true)
    }

    fn lstat(&self, path: &str) -> Result<FileInfo, PathError> {
        self.stat_op(path, "lstat", false)
    }

    fn chmod(&self, name: &str, mode: FileMode) -> Result<(), PathError> {
        const OP: &str = "chmod";

        let abs = self.abs_checked(name).map_err(|e| PathError::new(OP, name, e))?;
        let user = self.user();
        let mut store = self.store_write();

        let resolved =
            self.resolve_in(&store, &abs, true).map_err(|e| PathError::new(OP, name, e))?;
        let id =
            resolved.id.ok_or_else(|| PathError::new(OP, name, self.errs().no_such_file))?;

        let node = store.node_mut(id);
        if !user.is_root() && user.uid() != node.uid {
            return Err(PathError::new(OP, name, self.errs().op_not_permitted));
        }

        node.mode = node.mode.file_type() | (mode & SETTABLE_MODE);

        Ok(())
    }

    fn chown(&self, name: &str, uid: u32, gid: u32) -> Result<(), PathError> {
        self.chown_op(name, "chown", true, uid, gid)
    }

    fn lchown(&self, name: &str, uid: u32, gid: u32) -> Result<(), PathError> {
        self.chown_op(name, "lchown", false, uid, gid)
    }

    fn chtimes(&self, name: &str, _atime: SystemTime, mtime: SystemTime) -> Result<(), PathError> {
        const OP: &str = "chtimes";

        let abs = self.abs_checked(name).map_err(|e| PathError::new(OP, name, e))?;
        let user = self.user();
        let mut store = self.store_write();

        let resolved =
            self.resolve_in(&store, &abs, true).map_err(|e| PathError::new(OP, name, e))?;
        let id =
            resolved.id.ok_or_else(|| PathError::new(OP, name, self.errs().no_such_file))?;

        let node = store.node_mut(id);
        if !user.is_root() && user.uid() != node.uid {
            return Err(PathError::new(OP, name, self.errs().op_not_permitted));
        }

        node.mtime_ns = system_time_ns(mtime);

        Ok(())
    }

    fn truncate(&self, name: &str, size: i64) -> Result<(), PathError> {
        const OP: &str = "truncate";

        let abs = self.abs_checked(name).map_err(|e| PathError::new(OP, name, e))?;
        let user = self.user();
        let mut store = self.store_write();

        let resolved =
            self.resolve_in(&store, &abs, true).map_err(|e| PathError::new(OP, name, e))?;
        let id =
            resolved.id.ok_or_else(|| PathError::new(OP, name, self.errs().no_such_file))?;

        if store.node(id).is_dir() {
            return Err(PathError::new(OP, name, self.errs().is_a_directory));
        }
        if size < 0 {
            // On the Windows personality this surfaces as NegativeSeek.
            return Err(PathError::new(OP, name, self.errs().invalid_argument));
        }
        if !store.node(id).check_perm(user.as_ref(), false, true, false) {
            return Err(PathError::new(OP, name, self.errs().perm_denied));
        }

        let node = store.node_mut(id);
        if let NodeKind::File { data } = &mut node.kind {
            data.resize(size as usize, 0);
        }
        node.touch();

        Ok(())
    }
}

impl MemFs {
    fn chown_op(
        &self,
        name: &str,
        op: &'static str,
        follow: bool,
        uid: u32,
        gid: u32,
    ) -> Result<(), PathError> {
        if self.inner.os_type == OsType::Windows {
            return Err(PathError::new(op, name, self.errs().op_not_permitted));
        }

        let abs = self.abs_checked(name).map_err(|e| PathError::new(op, name, e))?;
        let user = self.user();
        let mut store = self.store_write();

        let resolved =
            self.resolve_in(&store, &abs, follow).map_err(|e| PathError::new(op, name, e))?;
        let id =
            resolved.id.ok_or_else(|| PathError::new(op, name, self.errs().no_such_file))?;

        if !user.is_root() {
            return Err(PathError::new(op, name, self.errs().op_not_permitted));
        }

        let node = store.node_mut(id);
        node.uid = uid;
        node.gid = gid;

        Ok(())
    }
}
