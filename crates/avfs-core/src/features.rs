// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Capability advertisement for backends and identity managers.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Bitmask of optional capabilities a backend (or identity manager)
/// implements. The conformance suite skips subtests whose feature is absent,
/// which is how one API serves several backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Features(u32);

impl Features {
    pub const NONE: Features = Features(0);
    /// The backend can rebind its effective root directory.
    pub const CHROOT: Features = Features(1);
    /// Chown may hand files to arbitrary users.
    pub const CHOWN_USER: Features = Features(1 << 1);
    /// The personality's base directories exist after construction.
    pub const SYSTEM_DIRS: Features = Features(1 << 2);
    /// Hard links are supported.
    pub const HARDLINK: Features = Features(1 << 3);
    /// A real identity manager is attached.
    pub const IDENTITY_MGR: Features = Features(1 << 4);
    /// The backend rejects all mutations.
    pub const READ_ONLY: Features = Features(1 << 5);
    /// The identity manager rejects all mutations.
    pub const READ_ONLY_IDM: Features = Features(1 << 6);
    /// The backend is a window onto the host filesystem.
    pub const REAL_FS: Features = Features(1 << 7);
    /// Symbolic links are supported.
    pub const SYMLINK: Features = Features(1 << 8);
    /// The basic file operations work at all.
    pub const BASIC_FS: Features = Features(1 << 9);

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if every feature in `other` is present in `self`.
    pub const fn contains(self, other: Features) -> bool {
        self.0 & other.0 == other.0
    }

    /// `self` without the features in `other`.
    pub const fn without(self, other: Features) -> Features {
        Features(self.0 & !other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Features {
    type Output = Features;

    fn bitor(self, rhs: Features) -> Features {
        Features(self.0 | rhs.0)
    }
}

impl BitOrAssign for Features {
    fn bitor_assign(&mut self, rhs: Features) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Features {
    type Output = Features;

    fn bitand(self, rhs: Features) -> Features {
        Features(self.0 & rhs.0)
    }
}

impl fmt::Display for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: &[(Features, &str)] = &[
            (Features::CHROOT, "Chroot"),
            (Features::CHOWN_USER, "ChownUser"),
            (Features::SYSTEM_DIRS, "SystemDirs"),
            (Features::HARDLINK, "Hardlink"),
            (Features::IDENTITY_MGR, "IdentityMgr"),
            (Features::READ_ONLY, "ReadOnly"),
            (Features::READ_ONLY_IDM, "ReadOnlyIdm"),
            (Features::REAL_FS, "RealFS"),
            (Features::SYMLINK, "Symlink"),
            (Features::BASIC_FS, "BasicFs"),
        ];

        write!(f, "Features(")?;

        let mut first = true;
        for (feature, name) in NAMES {
            if self.contains(*feature) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }

        write!(f, ")")
    }
}
