// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error taxonomy and the per-personality surface table.
//!
//! Backends never report host errors. Every failure is one of a closed set
//! of abstract kinds, surfaced as the errno value (POSIX personality) or the
//! Windows error code (Windows personality) chosen at backend construction.
//! Tests compare surfaced errors by exact equality, so the mapping here is
//! part of the public contract.

use thiserror::Error;

use crate::OsType;

/// Errno-backed errors surfaced by the POSIX personality.
///
/// The numeric values are the ones from `asm-generic/errno-base.h`.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinuxError {
    #[error("bad file descriptor")]
    BadFileDesc,
    #[error("invalid cross-device link")]
    CrossDevLink,
    #[error("directory not empty")]
    DirNotEmpty,
    #[error("file exists")]
    FileExists,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("is a directory")]
    IsADirectory,
    #[error("no such file or directory")]
    NoSuchFileOrDir,
    #[error("not a directory")]
    NotADirectory,
    #[error("operation not permitted")]
    OpNotPermitted,
    #[error("permission denied")]
    PermDenied,
    #[error("too many levels of symbolic links")]
    TooManySymlinks,
}

impl LinuxError {
    /// The errno value for this error.
    pub const fn errno(self) -> u32 {
        match self {
            LinuxError::BadFileDesc => 0x9,
            LinuxError::CrossDevLink => 0x12,
            LinuxError::DirNotEmpty => 0x27,
            LinuxError::FileExists => 0x11,
            LinuxError::InvalidArgument => 0x16,
            LinuxError::IsADirectory => 0x15,
            LinuxError::NoSuchFileOrDir => 0x2,
            LinuxError::NotADirectory => 0x14,
            LinuxError::OpNotPermitted => 0x1,
            LinuxError::PermDenied => 0xd,
            LinuxError::TooManySymlinks => 0x28,
        }
    }
}

/// Base of the custom (non-Windows) code range used by volume errors.
const CUSTOM_ERROR: u32 = 2 << 30;

/// Windows error codes surfaced by the Windows personality.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WindowsError {
    #[error("Access is denied.")]
    AccessDenied,
    #[error("Cannot create a file when that file already exists.")]
    AlreadyExists,
    #[error("The directory name is invalid.")]
    DirNameInvalid,
    #[error("The directory is not empty.")]
    DirNotEmpty,
    #[error("The file exists.")]
    FileExists,
    #[error("The system cannot find the file specified.")]
    FileNotFound,
    #[error("The handle is invalid.")]
    InvalidHandle,
    #[error("is a directory")]
    IsADirectory,
    #[error("An attempt was made to move the file pointer before the beginning of the file.")]
    NegativeSeek,
    #[error("The system cannot move the file to a different disk drive.")]
    NotSameDevice,
    #[error("The file or directory is not a reparse point.")]
    NotReparsePoint,
    #[error("not supported by windows")]
    NotSupported,
    #[error("The system cannot find the path specified.")]
    PathNotFound,
    #[error("A required privilege is not held by the client.")]
    PrivilegeNotHeld,
    #[error("Volume already exists.")]
    VolumeAlreadyExists,
    #[error("Volume name is invalid.")]
    VolumeNameInvalid,
    #[error("Volumes are available for Windows only.")]
    VolumeWindowsOnly,
}

impl WindowsError {
    /// The Windows system error code, or a value above `2 << 30` for the
    /// volume errors that have no Windows equivalent.
    pub const fn code(self) -> u32 {
        match self {
            WindowsError::AccessDenied => 5,
            WindowsError::AlreadyExists => 183,
            WindowsError::DirNameInvalid => 0x10B,
            WindowsError::DirNotEmpty => 145,
            WindowsError::FileExists => 80,
            WindowsError::FileNotFound => 2,
            WindowsError::InvalidHandle => 6,
            WindowsError::IsADirectory => 21,
            WindowsError::NegativeSeek => 0x83,
            WindowsError::NotSameDevice => 17,
            WindowsError::NotReparsePoint => 4390,
            WindowsError::NotSupported => 0x20000082,
            WindowsError::PathNotFound => 3,
            WindowsError::PrivilegeNotHeld => 1314,
            WindowsError::VolumeAlreadyExists => CUSTOM_ERROR + 1,
            WindowsError::VolumeNameInvalid => CUSTOM_ERROR + 2,
            WindowsError::VolumeWindowsOnly => CUSTOM_ERROR + 3,
        }
    }
}

/// The unified error surface of every backend.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FsError {
    #[error(transparent)]
    Linux(#[from] LinuxError),
    #[error(transparent)]
    Windows(#[from] WindowsError),
    /// A negative offset was passed to `read_at` or `write_at`.
    #[error("negative offset")]
    NegativeOffset,
    /// A file handle was used after `close`.
    #[error("use of closed file")]
    FileClosing,
    /// A temp-name pattern contains a path separator.
    #[error("pattern contains path separator")]
    PatternHasSeparator,
    /// A glob pattern is malformed.
    #[error("syntax error in pattern")]
    BadPattern,
}

/// The personality table: one surface error per abstract error kind.
///
/// A backend builds this once from its [`OsType`] and reports errors only
/// through it. Note the deliberate quirks inherited from the emulated
/// systems: on Windows `invalid_argument` surfaces as `NegativeSeek`,
/// `not_a_directory` collapses into `PathNotFound`, and symlink loops keep
/// the errno value because Windows has no code for them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OsErrors {
    pub bad_file_desc: FsError,
    pub cross_dev_link: FsError,
    pub dir_not_empty: FsError,
    pub file_exists: FsError,
    pub invalid_argument: FsError,
    pub is_a_directory: FsError,
    pub no_such_dir: FsError,
    pub no_such_file: FsError,
    pub not_a_directory: FsError,
    pub op_not_permitted: FsError,
    pub perm_denied: FsError,
    pub too_many_symlinks: FsError,
}

impl OsErrors {
    pub const fn new(os_type: OsType) -> Self {
        match os_type {
            OsType::Windows => OsErrors {
                bad_file_desc: FsError::Windows(WindowsError::AccessDenied),
                cross_dev_link: FsError::Windows(WindowsError::NotSameDevice),
                dir_not_empty: FsError::Windows(WindowsError::DirNotEmpty),
                file_exists: FsError::Windows(WindowsError::FileExists),
                invalid_argument: FsError::Windows(WindowsError::NegativeSeek),
                is_a_directory: FsError::Windows(WindowsError::IsADirectory),
                no_such_dir: FsError::Windows(WindowsError::PathNotFound),
                no_such_file: FsError::Windows(WindowsError::FileNotFound),
                not_a_directory: FsError::Windows(WindowsError::PathNotFound),
                op_not_permitted: FsError::Windows(WindowsError::NotSupported),
                perm_denied: FsError::Windows(WindowsError::AccessDenied),
                too_many_symlinks: FsError::Linux(LinuxError::TooManySymlinks),
            },
            OsType::Linux => OsErrors {
                bad_file_desc: FsError::Linux(LinuxError::BadFileDesc),
                cross_dev_link: FsError::Linux(LinuxError::CrossDevLink),
                dir_not_empty: FsError::Linux(LinuxError::DirNotEmpty),
                file_exists: FsError::Linux(LinuxError::FileExists),
                invalid_argument: FsError::Linux(LinuxError::InvalidArgument),
                is_a_directory: FsError::Linux(LinuxError::IsADirectory),
                no_such_dir: FsError::Linux(LinuxError::NoSuchFileOrDir),
                no_such_file: FsError::Linux(LinuxError::NoSuchFileOrDir),
                not_a_directory: FsError::Linux(LinuxError::NotADirectory),
                op_not_permitted: FsError::Linux(LinuxError::OpNotPermitted),
                perm_denied: FsError::Linux(LinuxError::PermDenied),
                too_many_symlinks: FsError::Linux(LinuxError::TooManySymlinks),
            },
        }
    }
}

/// Error envelope for single-path operations.
///
/// `op` carries the canonical lowercase system-call name (`open`, `mkdir`,
/// `stat`, ...). Conformance tests compare all three fields by equality.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{op} {path}: {err}")]
pub struct PathError {
    pub op: &'static str,
    pub path: String,
    pub err: FsError,
}

impl PathError {
    pub fn new(op: &'static str, path: impl Into<String>, err: impl Into<FsError>) -> Self {
        PathError { op, path: path.into(), err: err.into() }
    }
}

/// Error envelope for operations taking two paths (link, rename, symlink).
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{op} {old} {new}: {err}")]
pub struct LinkError {
    pub op: &'static str,
    pub old: String,
    pub new: String,
    pub err: FsError,
}

impl LinkError {
    pub fn new(
        op: &'static str,
        old: impl Into<String>,
        new: impl Into<String>,
        err: impl Into<FsError>,
    ) -> Self {
        LinkError { op, old: old.into(), new: new.into(), err: err.into() }
    }
}
