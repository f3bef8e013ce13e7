// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The process-wide file-mode creation mask.
//!
//! Creation operations compute their effective permissions as
//! `requested & !umask()`. The mask is genuinely process-global, matching
//! the OS it emulates; backends that need isolation (concurrent test
//! suites) carry their own override and only seed it from here.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::types::FileMode;

static UMASK: AtomicU32 = AtomicU32::new(0o022);

/// Returns the process-wide file-mode creation mask.
pub fn umask() -> FileMode {
    FileMode::new(UMASK.load(Ordering::Relaxed))
}

/// Replaces the process-wide file-mode creation mask. Only the nine
/// permission bits are kept.
pub fn set_umask(mask: FileMode) {
    UMASK.store(mask.perm().bits(), Ordering::Relaxed);
}
