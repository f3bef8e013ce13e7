// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! An in-memory identity manager.
//!
//! [`MemIdm`] keeps users and groups in process memory, seeds the
//! personality's admin account at id 0 and allocates fresh ids from 1000
//! upward. It is the natural companion of the in-memory filesystem backend
//! when tests need real permission semantics.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use avfs_core::{
    Features, GroupReader, GroupRecord, IdentityMgr, IdmError, OsType, UserReader, UserRecord,
};

/// First uid handed to a regular user.
const MIN_UID: u32 = 1000;

/// First gid handed to a regular group.
const MIN_GID: u32 = 1000;

struct Users {
    by_name: HashMap<String, Arc<UserRecord>>,
    by_id: HashMap<u32, Arc<UserRecord>>,
    max_uid: u32,
}

struct Groups {
    by_name: HashMap<String, Arc<GroupRecord>>,
    by_id: HashMap<u32, Arc<GroupRecord>>,
    max_gid: u32,
}

/// An in-memory identity manager.
pub struct MemIdm {
    users: RwLock<Users>,
    groups: RwLock<Groups>,
    admin_user: Arc<UserRecord>,
    admin_group: Arc<GroupRecord>,
    os_type: OsType,
}

impl MemIdm {
    /// Creates a manager for the host personality.
    pub fn new() -> Self {
        Self::with_os_type(OsType::current())
    }

    /// Creates a manager presenting the given personality's admin names.
    pub fn with_os_type(os_type: OsType) -> Self {
        let admin_user = Arc::new(UserRecord::new(os_type.admin_user_name(), 0, 0));
        let admin_group = Arc::new(GroupRecord::new(os_type.admin_group_name(), 0));

        let mut users = Users { by_name: HashMap::new(), by_id: HashMap::new(), max_uid: MIN_UID };
        users.by_name.insert(admin_user.name().to_string(), admin_user.clone());
        users.by_id.insert(0, admin_user.clone());

        let mut groups =
            Groups { by_name: HashMap::new(), by_id: HashMap::new(), max_gid: MIN_GID };
        groups.by_name.insert(admin_group.name().to_string(), admin_group.clone());
        groups.by_id.insert(0, admin_group.clone());

        MemIdm {
            users: RwLock::new(users),
            groups: RwLock::new(groups),
            admin_user,
            admin_group,
            os_type,
        }
    }
}

impl Default for MemIdm {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityMgr for MemIdm {
    fn features(&self) -> Features {
        Features::IDENTITY_MGR
    }

    fn os_type(&self) -> OsType {
        self.os_type
    }

    fn admin_user(&self) -> Arc<dyn UserReader> {
        self.admin_user.clone()
    }

    fn admin_group(&self) -> Arc<dyn GroupReader> {
        self.admin_group.clone()
    }

    fn lookup_user(&self, name: &str) -> Result<Arc<dyn UserReader>, IdmError> {
        let users = self.users.read().expect("users lock poisoned");

        match users.by_name.get(name) {
            Some(u) => Ok(u.clone()),
            None => Err(IdmError::UnknownUser(name.to_string())),
        }
    }

    fn lookup_user_id(&self, uid: u32) -> Result<Arc<dyn UserReader>, IdmError> {
        let users = self.users.read().expect("users lock poisoned");

        match users.by_id.get(&uid) {
            Some(u) => Ok(u.clone()),
            None => Err(IdmError::UnknownUserId(uid)),
        }
    }

    fn lookup_group(&self, name: &str) -> Result<Arc<dyn GroupReader>, IdmError> {
        let groups = self.groups.read().expect("groups lock poisoned");

        match groups.by_name.get(name) {
            Some(g) => Ok(g.clone()),
            None => Err(IdmError::UnknownGroup(name.to_string())),
        }
    }

    fn lookup_group_id(&self, gid: u32) -> Result<Arc<dyn GroupReader>, IdmError> {
        let groups = self.groups.read().expect("groups lock poisoned");

        match groups.by_id.get(&gid) {
            Some(g) => Ok(g.clone()),
            None => Err(IdmError::UnknownGroupId(gid)),
        }
    }

    fn user_add(&self, name: &str, group_name: &str) -> Result<Arc<dyn UserReader>, IdmError> {
        let gid = self.lookup_group(group_name)?.gid();

        let mut users = self.users.write().expect("users lock poisoned");
        if users.by_name.contains_key(name) {
            return Err(IdmError::AlreadyExistsUser(name.to_string()));
        }

        let uid = users.max_uid;
        users.max_uid += 1;

        let user = Arc::new(UserRecord::new(name, uid, gid));
        users.by_name.insert(name.to_string(), user.clone());
        users.by_id.insert(uid, user.clone());

        Ok(user)
    }

    fn user_del(&self, name: &str) -> Result<(), IdmError> {
        let mut users = self.users.write().expect("users lock poisoned");

        match users.by_name.remove(name) {
            Some(user) => {
                users.by_id.remove(&user.uid());
                Ok(())
            }
            None => Err(IdmError::UnknownUser(name.to_string())),
        }
    }

    fn group_add(&self, name: &str) -> Result<Arc<dyn GroupReader>, IdmError> {
        let mut groups = self.groups.write().expect("groups lock poisoned");
        if groups.by_name.contains_key(name) {
            return Err(IdmError::AlreadyExistsGroup(name.to_string()));
        }

        let gid = groups.max_gid;
        groups.max_gid += 1;

        let group = Arc::new(GroupRecord::new(name, gid));
        groups.by_name.insert(name.to_string(), group.clone());
        groups.by_id.insert(gid, group.clone());

        Ok(group)
    }

    fn group_del(&self, name: &str) -> Result<(), IdmError> {
        let mut groups = self.groups.write().expect("groups lock poisoned");

        match groups.by_name.remove(name) {
            Some(group) => {
                groups.by_id.remove(&group.gid());
                Ok(())
            }
            None => Err(IdmError::UnknownGroup(name.to_string())),
        }
    }
}
