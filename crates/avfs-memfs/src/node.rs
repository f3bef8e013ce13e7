// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The node store: an arena of filesystem nodes indexed by id.
//!
//! Directories own name-to-id edges; hard links are simply multiple edges
//! into the same non-directory node, counted by `nlink`. A node stays alive
//! while either a directory entry or an open handle references it, which
//! makes unlink-while-open trivial. The whole graph is guarded by one
//! `RwLock` in [`crate::MemFs`]; nothing in here locks.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use avfs_core::{FileMode, OsType, UserReader, DEFAULT_VOLUME};

/// Identity of a node within one store. Stable for the node's lifetime and
/// never reused while any `FileInfo` could still carry it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(pub(crate) u64);

/// What a node is.
#[derive(Debug)]
pub(crate) enum NodeKind {
    Directory { children: HashMap<String, NodeId> },
    File { data: Vec<u8> },
    Symlink { target: String },
}

/// One filesystem object.
#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    /// Type bits plus permissions; the type bits always match `kind`.
    pub(crate) mode: FileMode,
    pub(crate) uid: u32,
    pub(crate) gid: u32,
    pub(crate) mtime_ns: i64,
    /// Directory entries pointing at this node (1 for directories).
    pub(crate) nlink: u64,
    /// Open handles pinning this node against destruction.
    pub(crate) open_count: u32,
}

/// Nanoseconds since the Unix epoch.
pub(crate) fn now_ns() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("clock before epoch").as_nanos() as i64
}

/// The mode bits a creation request may set: permissions plus the special
/// bits. Everything else is dictated by the node kind.
pub(crate) const SETTABLE_MODE: FileMode = FileMode::PERM
    .union(FileMode::SETUID)
    .union(FileMode::SETGID)
    .union(FileMode::STICKY);

impl Node {
    pub(crate) fn new_directory(perm: FileMode, uid: u32, gid: u32) -> Node {
        Node {
            kind: NodeKind::Directory { children: HashMap::new() },
            mode: FileMode::DIR | (perm & SETTABLE_MODE),
            uid,
            gid,
            mtime_ns: now_ns(),
            nlink: 1,
            open_count: 0,
        }
    }

    pub(crate) fn new_file(perm: FileMode, uid: u32, gid: u32) -> Node {
        Node {
            kind: NodeKind::File { data: Vec::new() },
            mode: perm & SETTABLE_MODE,
            uid,
            gid,
            mtime_ns: now_ns(),
            nlink: 1,
            open_count: 0,
        }
    }

    pub(crate) fn new_symlink(target: String, uid: u32, gid: u32) -> Node {
        Node {
            kind: NodeKind::Symlink { target },
            mode: FileMode::SYMLINK | FileMode::new(0o777),
            uid,
            gid,
            mtime_ns: now_ns(),
            nlink: 1,
            open_count: 0,
        }
    }

    pub(crate) fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    pub(crate) fn children(&self) -> Option<&HashMap<String, NodeId>> {
        match &self.kind {
            NodeKind::Directory { children } => Some(children),
            _ => None,
        }
    }

    /// Advances the modification time, strictly monotonically: if the clock
    /// has not moved past the stored value, bump it by one nanosecond.
    pub(crate) fn touch(&mut self) {
        let now = now_ns();
        self.mtime_ns = if now <= self.mtime_ns { self.mtime_ns + 1 } else { now };
    }

    /// Evaluates the requested access rights for `user` against the node's
    /// owner, group and other permission bits. Root bypasses everything.
    pub(crate) fn check_perm(
        &self,
        user: &dyn UserReader,
        want_read: bool,
        want_write: bool,
        want_exec: bool,
    ) -> bool {
        if user.is_root() {
            return true;
        }

        let (r_bit, w_bit, x_bit) = if user.uid() == self.uid {
            (0o400, 0o200, 0o100)
        } else if user.gid() == self.gid {
            (0o040, 0o020, 0o010)
        } else {
            (0o004, 0o002, 0o001)
        };

        let mode = self.mode.bits();
        let allow_r = !want_read || mode & r_bit != 0;
        let allow_w = !want_write || mode & w_bit != 0;
        let allow_x = !want_exec || mode & x_bit != 0;

        allow_r && allow_w && allow_x
    }
}

/// Structural failures reported by store mutations, mapped to personality
/// errors at the operation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StoreError {
    Exists,
    NotEmpty,
    NotFound,
    OpNotPermitted,
    Invalid,
}

/// The node arena plus the volume table.
pub(crate) struct NodeStore {
    nodes: HashMap<NodeId, Node>,
    /// Volume name (upper case) to root directory; only populated on the
    /// Windows personality.
    volumes: HashMap<String, NodeId>,
    next_id: u64,
    root: NodeId,
}

impl NodeStore {
    pub(crate) fn new(os_type: OsType) -> Self {
        let mut store =
            NodeStore { nodes: HashMap::new(), volumes: HashMap::new(), next_id: 1, root: NodeId(0) };

        let root = store.alloc(Node::new_directory(FileMode::new(0o755), 0, 0));
        store.root = root;

        if os_type == OsType::Windows {
            store.volumes.insert(DEFAULT_VOLUME.to_uppercase(), root);
        }

        store
    }

    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);

        id
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        self.nodes.get(&id).expect("dangling node id")
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes.get_mut(&id).expect("dangling node id")
    }

    pub(crate) fn lookup(&self, dir: NodeId, name: &str) -> Option<NodeId> {
        self.node(dir).children().and_then(|c| c.get(name).copied())
    }

    // Volumes.

    pub(crate) fn volume_root(&self, volume: &str) -> Option<NodeId> {
        self.volumes.get(&volume.to_uppercase()).copied()
    }

    pub(crate) fn volume_add(&mut self, volume: &str) -> Result<NodeId, StoreError> {
        let key = volume.to_uppercase();
        if self.volumes.contains_key(&key) {
            return Err(StoreError::Exists);
        }

        let root = self.alloc(Node::new_directory(FileMode::new(0o755), 0, 0));
        self.volumes.insert(key, root);

        Ok(root)
    }

    pub(crate) fn volume_delete(&mut self, volume: &str) -> Result<(), StoreError> {
        let key = volume.to_uppercase();
        let root = *self.volumes.get(&key).ok_or(StoreError::NotFound)?;

        self.remove_subtree(root);
        self.volumes.remove(&key);
        self.node_mut(root).nlink = 0;
        self.destroy_if_unreferenced(root);

        Ok(())
    }

    pub(crate) fn volume_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.volumes.keys().cloned().collect();
        names.sort();

        names
    }

    // Creation.

    fn insert_child(&mut self, parent: NodeId, name: &str, node: Node) -> Result<NodeId, StoreError> {
        let exists = self
            .node(parent)
            .children()
            .map(|c| c.contains_key(name))
            .unwrap_or(true);
        if exists {
            return Err(StoreError::Exists);
        }

        let id = self.alloc(node);
        if let NodeKind::Directory { children } = &mut self.node_mut(parent).kind {
            children.insert(name.to_string(), id);
        }
        self.node_mut(parent).touch();

        Ok(id)
    }

    pub(crate) fn create_directory(
        &mut self,
        parent: NodeId,
        name: &str,
        perm: FileMode,
        uid: u32,
        gid: u32,
    ) -> Result<NodeId, StoreError> {
        self.insert_child(parent, name, Node::new_directory(perm, uid, gid))
    }

    pub(crate) fn create_regular(
        &mut self,
        parent: NodeId,
        name: &str,
        perm: FileMode,
        uid: u32,
        gid: u32,
    ) -> Result<NodeId, StoreError> {
        self.insert_child(parent, name, Node::new_file(perm, uid, gid))
    }

    pub(crate) fn create_symlink(
        &mut self,
        parent: NodeId,
        name: &str,
        target: &str,
        uid: u32,
        gid: u32,
    ) -> Result<NodeId, StoreError> {
        self.insert_child(parent, name, Node::new_symlink(target.to_string(), uid, gid))
    }

    /// Adds a hard link `name` in `parent` to an existing node. Directories
    /// are not hard-linkable.
    pub(crate) fn link_existing(
        &mut self,
        parent: NodeId,
        name: &str,
        target: NodeId,
    ) -> Result<(), StoreError> {
        if self.node(target).is_dir() {
            return Err(StoreError::OpNotPermitted);
        }

        let children = match self.node(parent).children() {
            Some(c) => c,
            None => return Err(StoreError::Invalid),
        };
        if children.contains_key(name) {
            return Err(StoreError::Exists);
        }

        self.node_mut(target).nlink += 1;
        if let NodeKind::Directory { children } = &mut self.node_mut(parent).kind {
            children.insert(name.to_string(), target);
        }
        self.node_mut(parent).touch();

        Ok(())
    }

    // Removal.

    /// Detaches `name` from `parent`. A non-empty directory refuses; a node
    /// that is still open survives detached until its last handle closes.
    pub(crate) fn unlink(&mut self, parent: NodeId, name: &str) -> Result<(), StoreError> {
        let child = self.lookup(parent, name).ok_or(StoreError::NotFound)?;

        if let Some(children) = self.node(child).children() {
            if !children.is_empty() {
                return Err(StoreError::NotEmpty);
            }
        }

        if let NodeKind::Directory { children } = &mut self.node_mut(parent).kind {
            children.remove(name);
        }
        self.node_mut(parent).touch();

        let node = self.node_mut(child);
        node.nlink = node.nlink.saturating_sub(1);
        self.destroy_if_unreferenced(child);

        Ok(())
    }

    /// Detaches and destroys everything below `id`, leaving open-pinned
    /// nodes alive but orphaned.
    pub(crate) fn remove_subtree(&mut self, id: NodeId) {
        let child_ids: Vec<NodeId> = match &mut self.node_mut(id).kind {
            NodeKind::Directory { children } => {
                let ids = children.values().copied().collect();
                children.clear();
                ids
            }
            _ => Vec::new(),
        };

        for child in child_ids {
            self.remove_subtree(child);
            let node = self.node_mut(child);
            node.nlink = node.nlink.saturating_sub(1);
            self.destroy_if_unreferenced(child);
        }
    }

    // Rename.

    /// Moves `name_old` in `parent_old` to `name_new` in `parent_new`,
    /// atomically with respect to the store lock. Replacing an existing
    /// directory fails `Exists`; replacing a regular file frees it subject
    /// to the open-handle rule.
    pub(crate) fn rename(
        &mut self,
        parent_old: NodeId,
        name_old: &str,
        parent_new: NodeId,
        name_new: &str,
    ) -> Result<(), StoreError> {
        let src = self.lookup(parent_old, name_old).ok_or(StoreError::NotFound)?;

        if parent_old == parent_new && name_old == name_new {
            return Ok(());
        }

        // A directory cannot be moved below itself.
        if self.node(src).is_dir() && self.is_reachable(src, parent_new) {
            return Err(StoreError::Invalid);
        }

        if let Some(dst) = self.lookup(parent_new, name_new) {
            if dst == src {
                // Hard links to the same node: rename is a no-op.
                return Ok(());
            }

            // Renaming onto an existing directory fails even when it is
            // empty, as does replacing a file with a directory.
            if self.node(dst).is_dir() || self.node(src).is_dir() {
                return Err(StoreError::Exists);
            }

            if let NodeKind::Directory { children } = &mut self.node_mut(parent_new).kind {
                children.remove(name_new);
            }
            let node = self.node_mut(dst);
            node.nlink = node.nlink.saturating_sub(1);
            self.destroy_if_unreferenced(dst);
        }

        if let NodeKind::Directory { children } = &mut self.node_mut(parent_old).kind {
            children.remove(name_old);
        }
        if let NodeKind::Directory { children } = &mut self.node_mut(parent_new).kind {
            children.insert(name_new.to_string(), src);
        }

        self.node_mut(parent_old).touch();
        self.node_mut(parent_new).touch();

        Ok(())
    }

    /// True if `to` is `from` or lives below it.
    fn is_reachable(&self, from: NodeId, to: NodeId) -> bool {
        if from == to {
            return true;
        }

        match self.node(from).children() {
            Some(children) => children.values().any(|&c| self.is_reachable(c, to)),
            None => false,
        }
    }

    // Handle pinning.

    pub(crate) fn pin(&mut self, id: NodeId) {
        self.node_mut(id).open_count += 1;
    }

    /// Drops a handle's pin; an unreferenced node is destroyed.
    pub(crate) fn release(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        node.open_count = node.open_count.saturating_sub(1);
        self.destroy_if_unreferenced(id);
    }

    fn destroy_if_unreferenced(&mut self, id: NodeId) {
        let node = self.node(id);
        if node.nlink == 0 && node.open_count == 0 {
            self.nodes.remove(&id);
        }
    }

    /// Number of child directories, for the synthetic POSIX link count.
    pub(crate) fn subdir_count(&self, dir: NodeId) -> u64 {
        match self.node(dir).children() {
            Some(children) => {
                children.values().filter(|&&c| self.node(c).is_dir()).count() as u64
            }
            None => 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }
}
