// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Path resolution against the node store.
//!
//! The resolver walks an already-absolute, already-cleaned path one segment
//! at a time, so `.` and `..` never reach it. Symbolic links are expanded
//! by splicing the target into the segment iterator
//! ([`PathIterator::replace_part`]) rather than by recursing: an absolute
//! target restarts the walk from the effective root, a relative one resumes
//! in place. Traversal enforces search permission on every directory it
//! looks into; root bypasses that, but never the structural errors.

use avfs_core::{PathIterator, PathUtils, UserReader};
use tracing::trace;

use crate::node::{NodeId, NodeKind, NodeStore};

/// Where a walk ended: the terminal node if it exists, and its directory
/// entry (parent + name) when the path has one. `id` is `None` when only
/// the final segment is missing, which is what creating operations need.
#[derive(Clone, Debug)]
pub(crate) struct Resolved {
    pub(crate) parent: Option<NodeId>,
    pub(crate) name: String,
    pub(crate) id: Option<NodeId>,
    /// The walked path with every symlink expanded.
    pub(crate) path: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ResolveErrorKind {
    /// An intermediate component is missing.
    NoSuchDir,
    /// An intermediate component is not a directory.
    NotADirectory,
    /// Search permission denied on a directory along the way.
    PermDenied,
    /// The symlink hop budget ran out.
    TooManySymlinks,
}

/// A failed walk, remembering how far it got.
#[derive(Clone, Debug)]
pub(crate) struct ResolveFailure {
    pub(crate) kind: ResolveErrorKind,
    /// Expanded path up to and including the failing part.
    pub(crate) left_part: String,
}

fn fail(kind: ResolveErrorKind, left_part: &str) -> ResolveFailure {
    ResolveFailure { kind, left_part: left_part.to_string() }
}

/// The node a walk starts from: the volume root named by the path, or the
/// effective root when there is none.
fn start_node(
    store: &NodeStore,
    root: NodeId,
    pi: &PathIterator,
) -> Result<NodeId, ResolveFailure> {
    let volume = pi.volume_name();
    if volume.is_empty() {
        return Ok(root);
    }

    store
        .volume_root(volume)
        .ok_or_else(|| fail(ResolveErrorKind::NoSuchDir, volume))
}

/// Resolves `abs_path` (absolute, cleaned) against the store.
///
/// `follow_final` decides whether a symlink in the last segment is
/// followed; `lstat`, `remove` and link creation pass false. The hop
/// budget guards against symlink loops.
pub(crate) fn resolve(
    store: &NodeStore,
    utils: PathUtils,
    user: &dyn UserReader,
    root: NodeId,
    abs_path: &str,
    follow_final: bool,
    max_symlinks: u32,
) -> Result<Resolved, ResolveFailure> {
    let mut pi = PathIterator::new(utils, abs_path);
    let mut cur = start_node(store, root, &pi)?;
    let mut hops = 0u32;

    while pi.next() {
        let node = store.node(cur);
        if node.children().is_none() {
            return Err(fail(ResolveErrorKind::NotADirectory, pi.left_part()));
        }
        if !node.check_perm(user, false, false, true) {
            return Err(fail(ResolveErrorKind::PermDenied, pi.left_part()));
        }

        let child = store.lookup(cur, pi.part());
        match child {
            None => {
                if pi.is_last() {
                    return Ok(Resolved {
                        parent: Some(cur),
                        name: pi.part().to_string(),
                        id: None,
                        path: pi.path().to_string(),
                    });
                }

                return Err(fail(ResolveErrorKind::NoSuchDir, pi.left_part()));
            }
            Some(child) => {
                if let NodeKind::Symlink { target } = &store.node(child).kind {
                    if !pi.is_last() || follow_final {
                        hops += 1;
                        if hops > max_symlinks {
                            return Err(fail(ResolveErrorKind::TooManySymlinks, pi.left_part()));
                        }

                        let target = target.clone();
                        trace!(link = pi.left_part(), target = %target, "expanding symlink");
                        if pi.replace_part(&target) {
                            cur = start_node(store, root, &pi)?;
                        }

                        continue;
                    }
                }

                if pi.is_last() {
                    return Ok(Resolved {
                        parent: Some(cur),
                        name: pi.part().to_string(),
                        id: Some(child),
                        path: pi.path().to_string(),
                    });
                }

                cur = child;
            }
        }
    }

    // No parts at all: the path is the (volume) root itself.
    Ok(Resolved { parent: None, name: String::new(), id: Some(cur), path: pi.path().to_string() })
}
