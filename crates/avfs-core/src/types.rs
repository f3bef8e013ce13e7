// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Plain data types shared by every backend.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A file's mode: type bits plus Unix-style permission bits.
///
/// The encoding is host-independent; the Windows personality simply reports
/// degenerate permissions through it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileMode(u32);

impl FileMode {
    /// Directory type bit.
    pub const DIR: FileMode = FileMode(1 << 31);
    /// Symbolic-link type bit.
    pub const SYMLINK: FileMode = FileMode(1 << 27);
    /// Setuid bit.
    pub const SETUID: FileMode = FileMode(1 << 23);
    /// Setgid bit.
    pub const SETGID: FileMode = FileMode(1 << 22);
    /// Sticky bit.
    pub const STICKY: FileMode = FileMode(1 << 20);
    /// Mask of the nine permission bits.
    pub const PERM: FileMode = FileMode(0o777);
    /// Mask of the type bits.
    pub const TYPE: FileMode = FileMode(Self::DIR.0 | Self::SYMLINK.0);

    pub const fn new(bits: u32) -> Self {
        FileMode(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Only the nine permission bits.
    pub const fn perm(self) -> FileMode {
        FileMode(self.0 & Self::PERM.0)
    }

    /// Only the type bits.
    pub const fn file_type(self) -> FileMode {
        FileMode(self.0 & Self::TYPE.0)
    }

    pub const fn is_dir(self) -> bool {
        self.0 & Self::DIR.0 != 0
    }

    pub const fn is_symlink(self) -> bool {
        self.0 & Self::SYMLINK.0 != 0
    }

    pub const fn is_regular(self) -> bool {
        self.0 & Self::TYPE.0 == 0
    }

    pub const fn has(self, bits: FileMode) -> bool {
        self.0 & bits.0 != 0
    }

    /// Const-context union, for composing mode constants.
    pub const fn union(self, other: FileMode) -> FileMode {
        FileMode(self.0 | other.0)
    }
}

impl std::ops::BitOr for FileMode {
    type Output = FileMode;

    fn bitor(self, rhs: FileMode) -> FileMode {
        FileMode(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for FileMode {
    fn bitor_assign(&mut self, rhs: FileMode) {
        self.0 |= rhs.0;
    }
}

impl std::ops::BitAnd for FileMode {
    type Output = FileMode;

    fn bitand(self, rhs: FileMode) -> FileMode {
        FileMode(self.0 & rhs.0)
    }
}

impl std::ops::Not for FileMode {
    type Output = FileMode;

    fn not(self) -> FileMode {
        FileMode(!self.0)
    }
}

impl std::fmt::Display for FileMode {
    /// `ls -l` style rendering: type letter, then three `rwx` triplets with
    /// `s`/`t` markers for setuid, setgid and sticky.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = [b'-'; 10];
        if self.is_dir() {
            out[0] = b'd';
        } else if self.is_symlink() {
            out[0] = b'L';
        }

        const RWX: &[u8; 3] = b"rwx";
        for (i, c) in RWX.iter().cycle().take(9).enumerate() {
            if self.0 & (1 << (8 - i)) != 0 {
                out[i + 1] = *c;
            }
        }

        if self.has(Self::SETUID) {
            out[3] = if out[3] == b'x' { b's' } else { b'S' };
        }
        if self.has(Self::SETGID) {
            out[6] = if out[6] == b'x' { b's' } else { b'S' };
        }
        if self.has(Self::STICKY) {
            out[9] = if out[9] == b'x' { b't' } else { b'T' };
        }

        f.write_str(std::str::from_utf8(&out).expect("mode string is ASCII"))
    }
}

/// Metadata describing one filesystem object, as returned by `stat`,
/// `lstat` and directory listings.
#[derive(Clone, Debug)]
pub struct FileInfo {
    /// Base name of the object.
    pub name: String,
    /// Length in bytes (0 for directories on the in-memory backends).
    pub size: i64,
    /// Type and permission bits.
    pub mode: FileMode,
    /// Modification time, nanoseconds since the Unix epoch.
    pub mtime_ns: i64,
    pub uid: u32,
    pub gid: u32,
    /// Number of hard links (synthetic for directories).
    pub nlink: u64,
    /// Identity of the owning backend instance; `same_file` never matches
    /// across two backends.
    pub fs_id: u64,
    /// Identity of the node within the backend.
    pub node_id: u64,
}

impl FileInfo {
    pub fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }

    pub fn is_symlink(&self) -> bool {
        self.mode.is_symlink()
    }

    pub fn mod_time(&self) -> SystemTime {
        if self.mtime_ns >= 0 {
            UNIX_EPOCH + Duration::from_nanos(self.mtime_ns as u64)
        } else {
            UNIX_EPOCH - Duration::from_nanos(self.mtime_ns.unsigned_abs())
        }
    }
}

/// How a file is opened.
///
/// A plain struct of intents rather than an `O_*` bit soup; helpers cover
/// the common combinations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpenOptions {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub create: bool,
    /// Create the file, failing if it already exists (`O_EXCL`).
    pub create_new: bool,
    pub truncate: bool,
}

impl OpenOptions {
    /// `O_RDONLY`.
    pub fn read_only() -> Self {
        OpenOptions { read: true, ..Default::default() }
    }

    /// `O_WRONLY`.
    pub fn write_only() -> Self {
        OpenOptions { write: true, ..Default::default() }
    }

    /// `O_RDWR`.
    pub fn read_write() -> Self {
        OpenOptions { read: true, write: true, ..Default::default() }
    }

    /// `O_RDWR | O_CREATE | O_TRUNC`, the `create` contract.
    pub fn create_rw() -> Self {
        OpenOptions { read: true, write: true, create: true, truncate: true, ..Default::default() }
    }

    /// True if the handle may modify the file's content.
    pub fn want_write(self) -> bool {
        self.write || self.append || self.truncate
    }
}

/// Origin for [`crate::VfsFile::seek`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}
