//! Identity and authorization
//!
//! Session issuance lives upstream; requests arrive with identity headers
//! set by the gateway. Authorization is a capability-set check: one
//! function taking the required role set and the caller's role, independent
//! of route declaration.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::utils::AppError;

/// Caller roles, least to most privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Staff,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "user" => Some(Role::User),
            "staff" => Some(Role::Staff),
            "admin" => Some(Role::Admin),
            "superAdmin" => Some(Role::SuperAdmin),
            _ => None,
        }
    }
}

/// The authenticated caller, extracted from gateway headers
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
    pub email: Option<String>,
    /// Location the caller works at (staff only)
    pub location_id: Option<String>,
}

/// Capability-set check: the caller's role must be in the allowed set.
pub fn authorize(identity: &Identity, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&identity.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role {:?} may not perform this operation",
            identity.role
        )))
    }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_str(parts, "x-user-id")
            .filter(|v| !v.is_empty())
            .ok_or(AppError::Unauthorized)?
            .to_string();

        let role = match header_str(parts, "x-user-role") {
            Some(raw) => Role::parse(raw)
                .ok_or_else(|| AppError::Validation(format!("Unknown role: {raw}")))?,
            None => Role::User,
        };

        Ok(Identity {
            user_id,
            role,
            email: header_str(parts, "x-user-email").map(str::to_string),
            location_id: header_str(parts, "x-location-id").map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: Role) -> Identity {
        Identity {
            user_id: "usr_1".into(),
            role,
            email: None,
            location_id: None,
        }
    }

    #[test]
    fn authorize_checks_set_membership() {
        assert!(authorize(&identity(Role::Admin), &[Role::Admin, Role::SuperAdmin]).is_ok());
        assert!(authorize(&identity(Role::User), &[Role::Admin, Role::SuperAdmin]).is_err());
        // Privilege is not implicit: a set that names only User excludes admins.
        assert!(authorize(&identity(Role::SuperAdmin), &[Role::User]).is_err());
    }

    #[test]
    fn role_parsing() {
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("superAdmin"), Some(Role::SuperAdmin));
        assert_eq!(Role::parse("root"), None);
    }
}
