// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The identity-manager seam: users, groups and the pluggable registry
//! backends consult for permission decisions.
//!
//! Identity records are immutable once created. The default manager is
//! [`DummyIdm`], whose single synthetic user carries the `u32::MAX` id
//! sentinel but root privileges, so an unconfigured backend stays usable.

use std::sync::Arc;

use thiserror::Error;

use crate::features::Features;
use crate::OsType;

/// Identity-manager errors. Message texts are part of the conformance
/// surface.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum IdmError {
    #[error("user: unknown user {0}")]
    UnknownUser(String),
    #[error("user: unknown userid {0}")]
    UnknownUserId(u32),
    #[error("group: unknown group {0}")]
    UnknownGroup(String),
    #[error("group: unknown groupid {0}")]
    UnknownGroupId(u32),
    #[error("user: user {0} already exists")]
    AlreadyExistsUser(String),
    #[error("group: group {0} already exists")]
    AlreadyExistsGroup(String),
    #[error("permission denied")]
    PermDenied,
}

/// Read access to a user record.
pub trait UserReader: Send + Sync + std::fmt::Debug {
    fn uid(&self) -> u32;
    fn gid(&self) -> u32;
    fn name(&self) -> &str;
    /// True if the user bypasses permission checks.
    fn is_root(&self) -> bool;
}

/// Read access to a group record.
pub trait GroupReader: Send + Sync + std::fmt::Debug {
    fn gid(&self) -> u32;
    fn name(&self) -> &str;
}

/// A pluggable identity registry.
///
/// Lookups report `UnknownUser`/`UnknownGroup` kinds for missing records;
/// mutations on read-only managers report `PermDenied`.
#[cfg_attr(test, mockall::automock)]
pub trait IdentityMgr: Send + Sync {
    /// Features provided by this manager, merged into the backend's mask.
    fn features(&self) -> Features;

    fn os_type(&self) -> OsType;

    fn admin_user(&self) -> Arc<dyn UserReader>;

    fn admin_group(&self) -> Arc<dyn GroupReader>;

    fn lookup_user(&self, name: &str) -> Result<Arc<dyn UserReader>, IdmError>;

    fn lookup_user_id(&self, uid: u32) -> Result<Arc<dyn UserReader>, IdmError>;

    fn lookup_group(&self, name: &str) -> Result<Arc<dyn GroupReader>, IdmError>;

    fn lookup_group_id(&self, gid: u32) -> Result<Arc<dyn GroupReader>, IdmError>;

    fn user_add(&self, name: &str, group_name: &str) -> Result<Arc<dyn UserReader>, IdmError>;

    fn user_del(&self, name: &str) -> Result<(), IdmError>;

    fn group_add(&self, name: &str) -> Result<Arc<dyn GroupReader>, IdmError>;

    fn group_del(&self, name: &str) -> Result<(), IdmError>;

    fn has_feature(&self, feature: Features) -> bool {
        self.features().contains(feature)
    }
}

/// An immutable user record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    name: String,
    uid: u32,
    gid: u32,
    is_root: bool,
}

impl UserRecord {
    /// A regular record; root privilege follows from a zero uid or gid.
    pub fn new(name: impl Into<String>, uid: u32, gid: u32) -> Self {
        UserRecord { name: name.into(), uid, gid, is_root: uid == 0 || gid == 0 }
    }

    /// The synthetic user of the "not implemented" identity manager: the
    /// `u32::MAX` id sentinel, with root privileges so an idm-less backend
    /// accepts operations.
    pub fn not_implemented() -> Self {
        UserRecord { name: "notimplemented".to_string(), uid: u32::MAX, gid: u32::MAX, is_root: true }
    }
}

impl UserReader for UserRecord {
    fn uid(&self) -> u32 {
        self.uid
    }

    fn gid(&self) -> u32 {
        self.gid
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_root(&self) -> bool {
        self.is_root
    }
}

/// An immutable group record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupRecord {
    name: String,
    gid: u32,
}

impl GroupRecord {
    pub fn new(name: impl Into<String>, gid: u32) -> Self {
        GroupRecord { name: name.into(), gid }
    }
}

impl GroupReader for GroupRecord {
    fn gid(&self) -> u32 {
        self.gid
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// The "not implemented" identity manager: every lookup and mutation fails
/// `PermDenied` and the only user is the sentinel record.
#[derive(Clone, Copy, Debug)]
pub struct DummyIdm {
    os_type: OsType,
}

impl DummyIdm {
    pub const fn new(os_type: OsType) -> Self {
        DummyIdm { os_type }
    }
}

impl IdentityMgr for DummyIdm {
    fn features(&self) -> Features {
        Features::NONE
    }

    fn os_type(&self) -> OsType {
        self.os_type
    }

    fn admin_user(&self) -> Arc<dyn UserReader> {
        Arc::new(UserRecord::new(self.os_type.admin_user_name(), 0, 0))
    }

    fn admin_group(&self) -> Arc<dyn GroupReader> {
        Arc::new(GroupRecord::new(self.os_type.admin_group_name(), 0))
    }

    fn lookup_user(&self, _name: &str) -> Result<Arc<dyn UserReader>, IdmError> {
        Err(IdmError::PermDenied)
    }

    fn lookup_user_id(&self, _uid: u32) -> Result<Arc<dyn UserReader>, IdmError> {
        Err(IdmError::PermDenied)
    }

    fn lookup_group(&self, _name: &str) -> Result<Arc<dyn GroupReader>, IdmError> {
        Err(IdmError::PermDenied)
    }

    fn lookup_group_id(&self, _gid: u32) -> Result<Arc<dyn GroupReader>, IdmError> {
        Err(IdmError::PermDenied)
    }

    fn user_add(&self, _name: &str, _group_name: &str) -> Result<Arc<dyn UserReader>, IdmError> {
        Err(IdmError::PermDenied)
    }

    fn user_del(&self, _name: &str) -> Result<(), IdmError> {
        Err(IdmError::PermDenied)
    }

    fn group_add(&self, _name: &str) -> Result<Arc<dyn GroupReader>, IdmError> {
        Err(IdmError::PermDenied)
    }

    fn group_del(&self, _name: &str) -> Result<(), IdmError> {
        Err(IdmError::PermDenied)
    }
}
