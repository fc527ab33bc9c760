use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role ladder. Order matters: `Viewer < Guru < Admin < SuperAdmin`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Role {
    #[default]
    Viewer,
    Guru,
    Admin,
    SuperAdmin,
}

impl Role {
    pub const LADDER: [Role; 4] = [Role::Viewer, Role::Guru, Role::Admin, Role::SuperAdmin];

    /// The next role up the ladder, if any.
    pub fn next(&self) -> Option<Role> {
        match self {
            Role::Viewer => Some(Role::Guru),
            Role::Guru => Some(Role::Admin),
            Role::Admin => Some(Role::SuperAdmin),
            Role::SuperAdmin => None,
        }
    }

    /// The next role down the ladder, if any.
    pub fn prev(&self) -> Option<Role> {
        match self {
            Role::Viewer => None,
            Role::Guru => Some(Role::Viewer),
            Role::Admin => Some(Role::Guru),
            Role::SuperAdmin => Some(Role::Admin),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Guru => "guru",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    pub fn is_privileged(&self) -> bool {
        *self >= Role::Admin
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "viewer" => Ok(Role::Viewer),
            "guru" => Ok(Role::Guru),
            "admin" => Ok(Role::Admin),
            "super_admin" | "superadmin" => Ok(Role::SuperAdmin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "id", default)]
    pub uid: String,
    #[serde(rename = "nama", default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(rename = "isVerified", default)]
    pub verified: bool,
}

impl User {
    pub fn actor(&self) -> Actor {
        Actor {
            uid: self.uid.clone(),
            role: self.role,
            verified: self.verified,
        }
    }
}

/// The authenticated caller of a service operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub uid: String,
    pub role: Role,
    pub verified: bool,
}

impl Actor {
    pub fn new(uid: &str, role: Role, verified: bool) -> Self {
        Self {
            uid: uid.to_string(),
            role,
            verified,
        }
    }
}
