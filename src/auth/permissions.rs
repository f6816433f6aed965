use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ViewOwnProfile,
    EditOwnProfile,
    SubmitAnswers,
    ViewOwnProgress,
    TrackPractice,

    ManageContent,
    ViewAnswers,
    ManageVocabulary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Learner,
    Admin,
}

static LEARNER_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    HashSet::from([
        Permission::ViewOwnProfile,
        Permission::EditOwnProfile,
        Permission::SubmitAnswers,
        Permission::ViewOwnProgress,
        Permission::TrackPractice,
    ])
});

static ADMIN_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(LEARNER_PERMISSIONS.iter().copied());

    permissions.insert(Permission::ManageContent);
    permissions.insert(Permission::ViewAnswers);
    permissions.insert(Permission::ManageVocabulary);

    permissions
});

impl Role {
    pub fn permissions(&self) -> &'static HashSet<Permission> {
        match self {
            Role::Learner => &LEARNER_PERMISSIONS,
            Role::Admin => &ADMIN_PERMISSIONS,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Learner => "learner",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "learner" | "user" => Ok(Role::Learner),
            "admin" => Ok(Role::Admin),
            _ => Err(AppError::Validation(format!("Unknown role: {}", s))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
