//! Identity mapping
//!
//! Turns a raw directory entry into a local identity record, resolving
//! directory group memberships to a local role identifier.

use crate::directory::client::DirectoryEntry;
use serde::{Deserialize, Serialize};
use warden_core::config::GroupRole;
use warden_core::UNPRIVILEGED_ROLE;

/// Group membership attribute.
pub const ATTR_MEMBER_OF: &str = "memberof";
/// Extension attribute carrying the local user identifier.
pub const ATTR_USER_ID: &str = "extensionattribute1";
/// Common name, used as the username.
pub const ATTR_USERNAME: &str = "cn";
/// Display name.
pub const ATTR_FULL_NAME: &str = "displayname";
/// Email address.
pub const ATTR_EMAIL: &str = "mail";
/// Surname, the sort key for authentication searches.
pub const ATTR_SURNAME: &str = "sn";

/// Attributes requested by an authentication search.
pub const AUTH_ATTRIBUTES: [&str; 5] = [
    ATTR_MEMBER_OF,
    ATTR_USER_ID,
    ATTR_USERNAME,
    ATTR_FULL_NAME,
    ATTR_EMAIL,
];

/// Local identity derived from a directory entry.
///
/// Immutable once produced; absent directory attributes yield `None`
/// rather than an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub user_id: Option<String>,
    pub role_id: u32,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
}

/// Map a directory entry to a local identity.
///
/// Every configured group substring is tested case-insensitively
/// against every group DN the user is a member of; the resolved role is
/// the highest matching role id. Most-privileged-role-wins is the
/// intended policy, not a tie-break accident. No match resolves to the
/// unprivileged role (0).
pub fn map_entry(entry: &DirectoryEntry, group_roles: &[GroupRole]) -> IdentityRecord {
    let mut role_id = UNPRIVILEGED_ROLE;

    for group_dn in entry.values(ATTR_MEMBER_OF) {
        let group_dn = group_dn.to_lowercase();
        for mapping in group_roles {
            if mapping.role_id > role_id && group_dn.contains(&mapping.group.to_lowercase()) {
                role_id = mapping.role_id;
            }
        }
    }

    IdentityRecord {
        user_id: entry.first(ATTR_USER_ID).map(str::to_string),
        role_id,
        username: entry.first(ATTR_USERNAME).map(str::to_string),
        full_name: entry.first(ATTR_FULL_NAME).map(str::to_string),
        email: entry.first(ATTR_EMAIL).map(str::to_string),
    }
}
