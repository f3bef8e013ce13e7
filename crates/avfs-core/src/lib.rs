// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Core building blocks for the AVFS virtual filesystem.
//!
//! This crate defines everything a backend needs to present one uniform
//! filesystem API: the error taxonomy and its per-personality surface codes,
//! lexical path utilities and the segment iterator used for symlink
//! expansion, the process-wide umask register, the identity-manager seam and
//! the `Vfs`/`VfsFile` trait surface itself.
//!
//! Backends live in sibling crates (`avfs-memfs`, `avfs-basepathfs`); they
//! pick a [`OsType`] personality at construction time and surface every
//! error through the table for that personality, independently of the host
//! operating system.

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod features;
pub mod idm;
pub mod path_iterator;
pub mod path_utils;
pub mod pattern;
pub mod umask;
pub mod vfs;
pub mod vfsutils;

mod types;

pub use errors::{FsError, LinkError, LinuxError, OsErrors, PathError, WindowsError};
pub use features::Features;
pub use idm::{
    DummyIdm, GroupReader, GroupRecord, IdentityMgr, IdmError, UserReader, UserRecord,
};
pub use path_iterator::PathIterator;
pub use path_utils::PathUtils;
pub use types::{FileInfo, FileMode, OpenOptions, Whence};
pub use umask::{set_umask, umask};
pub use vfs::{Vfs, VfsFile};

/// Default permissions handed to directory-creating helpers before umask.
pub const DEFAULT_DIR_PERM: FileMode = FileMode::new(0o777);

/// Default permissions handed to file-creating helpers before umask.
pub const DEFAULT_FILE_PERM: FileMode = FileMode::new(0o666);

/// Default volume of the Windows personality.
pub const DEFAULT_VOLUME: &str = "C:";

/// The operating-system personality presented by a backend.
///
/// The personality decides path separators, error surface codes, reserved
/// names and the admin account names. It is fixed at backend construction
/// and is deliberately independent of the host OS.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OsType {
    Linux,
    Windows,
}

impl OsType {
    /// The personality matching the host operating system.
    pub fn current() -> Self {
        if cfg!(windows) {
            OsType::Windows
        } else {
            OsType::Linux
        }
    }

    /// The canonical path separator byte.
    pub const fn path_separator(self) -> u8 {
        match self {
            OsType::Linux => b'/',
            OsType::Windows => b'\\',
        }
    }

    /// Name of the administrator account.
    pub const fn admin_user_name(self) -> &'static str {
        match self {
            OsType::Linux => "root",
            OsType::Windows => "ContainerAdministrator",
        }
    }

    /// Name of the administrator group.
    pub const fn admin_group_name(self) -> &'static str {
        match self {
            OsType::Linux => "root",
            OsType::Windows => "Administrators",
        }
    }

    /// Default directory for temporary files.
    pub const fn tmp_dir(self) -> &'static str {
        match self {
            OsType::Linux => "/tmp",
            OsType::Windows => "C:\\Windows\\Temp",
        }
    }
}

impl std::fmt::Display for OsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OsType::Linux => f.write_str("Linux"),
            OsType::Windows => f.write_str("Windows"),
        }
    }
}

/// A base directory created by the system-dirs bootstrap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SystemDir {
    pub path: &'static str,
    pub perm: FileMode,
}

/// The base directories of a personality, created by backends advertising
/// [`Features::SYSTEM_DIRS`].
pub fn system_dirs(os_type: OsType) -> &'static [SystemDir] {
    const LINUX_DIRS: &[SystemDir] = &[
        SystemDir { path: "/home", perm: FileMode::new(0o755) },
        SystemDir { path: "/root", perm: FileMode::new(0o700) },
        SystemDir { path: "/tmp", perm: FileMode::STICKY.union(FileMode::new(0o777)) },
    ];
    const WINDOWS_DIRS: &[SystemDir] = &[
        SystemDir { path: "C:\\Users", perm: FileMode::new(0o777) },
        SystemDir { path: "C:\\Windows", perm: FileMode::new(0o777) },
        SystemDir { path: "C:\\Windows\\Temp", perm: FileMode::new(0o777) },
    ];

    match os_type {
        OsType::Linux => LINUX_DIRS,
        OsType::Windows => WINDOWS_DIRS,
    }
}
