// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Open file handles.
//!
//! A [`MemFile`] pins its node against destruction and carries its own
//! offset, directory cursor and closed flag behind interior mutability, so
//! a handle can be shared between threads the way a POSIX descriptor can.
//! Closing is a one-way transition: afterwards every operation reports the
//! closed-file error and `fd()` answers `u64::MAX`. Dropping an open handle
//! closes it silently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use avfs_core::{FileInfo, FileMode, FsError, OpenOptions, PathError, VfsFile, Whence};

use crate::node::{NodeId, NodeKind};
use crate::MemFs;

struct DirCursor {
    /// Names snapshot taken at the first readdir call.
    names: Option<Vec<String>>,
    pos: usize,
}

pub struct MemFile {
    fs: MemFs,
    /// The (absolute) path this handle was opened with.
    name: String,
    node: NodeId,
    flags: OpenOptions,
    fd: u64,
    offset: Mutex<i64>,
    cursor: Mutex<DirCursor>,
    closed: AtomicBool,
    wrote: AtomicBool,
}

impl std::fmt::Debug for MemFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemFile")
            .field("name", &self.name)
            .field("fd", &self.fd)
            .finish()
    }
}

impl MemFile {
    pub(crate) fn open(fs: &MemFs, name: String, node: NodeId, flags: OpenOptions) -> MemFile {
        let fd = fs.next_fd();

        MemFile {
            fs: fs.clone(),
            name,
            node,
            flags,
            fd,
            offset: Mutex::new(0),
            cursor: Mutex::new(DirCursor { names: None, pos: 0 }),
            closed: AtomicBool::new(false),
            wrote: AtomicBool::new(false),
        }
    }

    fn check_open(&self, op: &'static str) -> Result<(), PathError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PathError::new(op, &self.name, FsError::FileClosing));
        }

        Ok(())
    }

    /// Snapshot of the directory's child names, sorted, taken once per
    /// handle.
    fn dir_names(&self, op: &'static str) -> Result<(Vec<String>, usize), PathError> {
        let mut cursor = self.cursor.lock().expect("cursor poisoned");

        if cursor.names.is_none() {
            let store = self.fs.store_read();
            let children = store
                .node(self.node)
                .children()
                .ok_or_else(|| PathError::new(op, &self.name, self.fs.errs().not_a_directory))?;

            let mut names: Vec<String> = children.keys().cloned().collect();
            names.sort();
            cursor.names = Some(names);
        }

        let names = cursor.names.clone().expect("snapshot filled above");
        let pos = cursor.pos;

        Ok((names, pos))
    }

    fn advance_cursor(&self, by: usize) {
        let mut cursor = self.cursor.lock().expect("cursor poisoned");
        cursor.pos += by;
    }
}

impl VfsFile for MemFile {
    fn chdir(&self) -> Result<(), PathError> {
        const OP: &str = "chdir";

        self.check_open(OP)?;

        let store = self.fs.store_read();
        if !store.node(self.node).is_dir() {
            return Err(PathError::new(OP, &self.name, self.fs.errs().not_a_directory));
        }
        drop(store);

        self.fs.set_cur_dir(self.name.clone());

        Ok(())
    }

    fn chmod(&self, mode: FileMode) -> Result<(), PathError> {
        const OP: &str = "chmod";

        self.check_open(OP)?;

        let user = self.fs.user();
        let mut store = self.fs.store_write();
        let node = store.node_mut(self.node);
        if !user.is_root() && user.uid() != node.uid {
            return Err(PathError::new(OP, &self.name, self.fs.errs().op_not_permitted));
        }

        node.mode = node.mode.file_type() | (mode & crate::node::SETTABLE_MODE);

        Ok(())
    }

    fn chown(&self, uid: u32, gid: u32) -> Result<(), PathError> {
        const OP: &str = "chown";

        self.check_open(OP)?;

        if self.fs.inner.os_type == avfs_core::OsType::Windows {
            return Err(PathError::new(OP, &self.name, self.fs.errs().op_not_permitted));
        }

        let user = self.fs.user();
        if !user.is_root() {
            return Err(PathError::new(OP, &self.name, self.fs.errs().op_not_permitted));
        }

        let mut store = self.fs.store_write();
        let node = store.node_mut(self.node);
        node.uid = uid;
        node.gid = gid;

        Ok(())
    }

    fn close(&self) -> Result<(), PathError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(PathError::new("close", &self.name, FsError::FileClosing));
        }

        let mut store = self.fs.store_write();
        if self.wrote.load(Ordering::Acquire) {
            store.node_mut(self.node).touch();
        }
        store.release(self.node);

        Ok(())
    }

    fn fd(&self) -> u64 {
        if self.closed.load(Ordering::Acquire) {
            return u64::MAX;
        }

        self.fd
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, PathError> {
        const OP: &str = "read";

        self.check_open(OP)?;
        if !self.flags.read {
            return Err(PathError::new(OP, &self.name, self.fs.errs().bad_file_desc));
        }

        let store = self.fs.store_read();
        let node = store.node(self.node);
        let data = match &node.kind {
            NodeKind::File { data } => data,
            NodeKind::Directory { .. } => {
                return Err(PathError::new(OP, &self.name, self.fs.errs().is_a_directory));
            }
            NodeKind::Symlink { .. } => {
                return Err(PathError::new(OP, &self.name, self.fs.errs().invalid_argument));
            }
        };

        let mut offset = self.offset.lock().expect("offset poisoned");
        let start = (*offset).max(0) as usize;
        if start >= data.len() {
            return Ok(0);
        }

        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        *offset += n as i64;

        Ok(n)
    }

    fn read_at(&self, buf: &mut [u8], off: i64) -> Result<usize, PathError> {
        const OP: &str = "readat";

        self.check_open(OP)?;
        if off < 0 {
            return Err(PathError::new(OP, &self.name, FsError::NegativeOffset));
        }
        if !self.flags.read {
            return Err(PathError::new(OP, &self.name, self.fs.errs().bad_file_desc));
        }

        let store = self.fs.store_read();
        let node = store.node(self.node);
        let data = match &node.kind {
            NodeKind::File { data } => data,
            NodeKind::Directory { .. } => {
                return Err(PathError::new("read", &self.name, self.fs.errs().is_a_directory));
            }
            NodeKind::Symlink { .. } => {
                return Err(PathError::new(OP, &self.name, self.fs.errs().invalid_argument));
            }
        };

        let start = off as usize;
        if start >= data.len() {
            return Ok(0);
        }

        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);

        Ok(n)
    }

    fn readdir(&self, n: i64) -> Result<Vec<FileInfo>, PathError> {
        const OP: &str = "readdirent";

        self.check_open(OP)?;

        let (names, pos) = self.dir_names(OP)?;
        let remaining = &names[pos.min(names.len())..];
        let take = if n > 0 { remaining.len().min(n as usize) } else { remaining.len() };

        let store = self.fs.store_read();
        let mut infos = Vec::with_capacity(take);
        for name in &remaining[..take] {
            if let Some(child) = store.lookup(self.node, name) {
                infos.push(self.fs.file_info(&store, name, child));
            }
        }
        drop(store);

        self.advance_cursor(take);

        Ok(infos)
    }

    fn readdirnames(&self, n: i64) -> Result<Vec<String>, PathError> {
        const OP: &str = "readdirent";

        self.check_open(OP)?;

        let (names, pos) = self.dir_names(OP)?;
        let remaining = &names[pos.min(names.len())..];
        let take = if n > 0 { remaining.len().min(n as usize) } else { remaining.len() };

        let out = remaining[..take].to_vec();
        self.advance_cursor(take);

        Ok(out)
    }

    fn seek(&self, offset: i64, whence: Whence) -> Result<i64, PathError> {
        const OP: &str = "seek";

        self.check_open(OP)?;

        let base = match whence {
            Whence::Start => 0,
            Whence::Current => *self.offset.lock().expect("offset poisoned"),
            Whence::End => {
                let store = self.fs.store_read();
                match &store.node(self.node).kind {
                    NodeKind::File { data } => data.len() as i64,
                    _ => 0,
                }
            }
        };

        let new = base + offset;
        if new < 0 {
            return Err(PathError::new(OP, &self.name, self.fs.errs().invalid_argument));
        }

        *self.offset.lock().expect("offset poisoned") = new;

        Ok(new)
    }

    fn stat(&self) -> Result<FileInfo, PathError> {
        const OP: &str = "stat";

        self.check_open(OP)?;

        let store = self.fs.store_read();
        let base = self.fs.inner.utils.base(&self.name);

        Ok(self.fs.file_info(&store, &base, self.node))
    }

    fn sync(&self) -> Result<(), PathError> {
        self.check_open("sync")
    }

    fn truncate(&self, size: i64) -> Result<(), PathError> {
        const OP: &str = "truncate";

        self.check_open(OP)?;
        if !self.flags.want_write() {
            return Err(PathError::new(OP, &self.name, self.fs.errs().bad_file_desc));
        }
        if size < 0 {
            return Err(PathError::new(OP, &self.name, self.fs.errs().invalid_argument));
        }

        let mut store = self.fs.store_write();
        let node = store.node_mut(self.node);
        match &mut node.kind {
            NodeKind::File { data } => data.resize(size as usize, 0),
            _ => return Err(PathError::new(OP, &self.name, self.fs.errs().invalid_argument)),
        }
        node.touch();
        self.wrote.store(true, Ordering::Release);

        Ok(())
    }

    fn write(&self, buf: &[u8]) -> Result<usize, PathError> {
        const OP: &str = "write";

        self.check_open(OP)?;
        if !self.flags.write && !self.flags.append {
            return Err(PathError::new(OP, &self.name, self.fs.errs().bad_file_desc));
        }

        let mut store = self.fs.store_write();
        let node = store.node_mut(self.node);
        let data = match &mut node.kind {
            NodeKind::File { data } => data,
            _ => return Err(PathError::new(OP, &self.name, self.fs.errs().bad_file_desc)),
        };

        let mut offset = self.offset.lock().expect("offset poisoned");
        if self.flags.append {
            *offset = data.len() as i64;
        }

        let start = (*offset).max(0) as usize;
        if start > data.len() {
            data.resize(start, 0);
        }

        let end = start + buf.len();
        if end > data.len() {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);

        *offset = end as i64;
        drop(offset);

        node.touch();
        self.wrote.store(true, Ordering::Release);

        Ok(buf.len())
    }

    fn write_at(&self, buf: &[u8], off: i64) -> Result<usize, PathError> {
        const OP: &str = "writeat";

        self.check_open(OP)?;
        if off < 0 {
            return Err(PathError::new(OP, &self.name, FsError::NegativeOffset));
        }
        if self.flags.append {
            // WriteAt has no defined position on an append-mode handle.
            return Err(PathError::new(OP, &self.name, self.fs.errs().invalid_argument));
        }
        if !self.flags.write {
            return Err(PathError::new(OP, &self.name, self.fs.errs().bad_file_desc));
        }

        let mut store = self.fs.store_write();
        let node = store.node_mut(self.node);
        let data = match &mut node.kind {
            NodeKind::File { data } => data,
            _ => return Err(PathError::new(OP, &self.name, self.fs.errs().bad_file_desc)),
        };

        let start = off as usize;
        let end = start + buf.len();
        if end > data.len() {
            // A gap past end of file zero-fills.
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);

        node.touch();
        self.wrote.store(true, Ordering::Release);

        Ok(buf.len())
    }
}

impl Drop for MemFile {
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            let mut store = self.fs.store_write();
            if self.wrote.load(Ordering::Acquire) {
                store.node_mut(self.node).touch();
            }
            store.release(self.node);
        }
    }
}
