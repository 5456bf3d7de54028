use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CivicError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Public,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CivicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "admin" => Ok(Self::Admin),
            other => Err(CivicError::Validation(format!("unknown role: {other}"))),
        }
    }
}

/// A verified identity, as carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Whoever is performing a request.
///
/// Built once at the HTTP boundary and passed explicitly into every service
/// call. There is no ambient or thread-local identity anywhere in the codebase.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Actor {
    #[default]
    Anonymous,
    Authenticated(Identity),
}

impl Actor {
    pub fn authenticated(id: Uuid, email: impl Into<String>, role: Role) -> Self {
        Self::Authenticated(Identity {
            id,
            email: email.into(),
            role,
        })
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(identity) => Some(identity),
        }
    }

    pub fn id(&self) -> Option<Uuid> {
        self.identity().map(|i| i.id)
    }

    pub fn role(&self) -> Option<Role> {
        self.identity().map(|i| i.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    pub fn require_authenticated(&self) -> Result<&Identity, CivicError> {
        self.identity()
            .ok_or_else(|| CivicError::Unauthorized("sign in required".into()))
    }

    pub fn require_admin(&self) -> Result<&Identity, CivicError> {
        let identity = self.require_authenticated()?;
        if identity.role == Role::Admin {
            Ok(identity)
        } else {
            Err(CivicError::Unauthorized(format!(
                "{} is not an admin",
                identity.email
            )))
        }
    }
}

impl From<Option<Identity>> for Actor {
    fn from(identity: Option<Identity>) -> Self {
        identity.map_or(Self::Anonymous, Self::Authenticated)
    }
}
