//! Registration and credential checks.
//!
//! Token issuance lives at the HTTP edge; this service only decides whether a
//! set of credentials belongs to a user and returns the identity to sign.

use std::sync::Arc;

use crate::{
    actor::{Actor, Identity, Role},
    error::CivicError,
    password::PasswordHasher,
    ports::{Result, UserStore},
    proto::{LoginRequest, RegisterRequest},
    types::{NewUser, User},
};

pub const MIN_PASSWORD_LEN: usize = 8;

const BAD_CREDENTIALS: &str = "invalid email or password";

pub struct AccountService {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { users, hasher }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<User> {
        let (Some(name), Some(email), Some(password), Some(role)) = (
            non_blank(req.name),
            non_blank(req.email),
            req.password.filter(|p| !p.is_empty()),
            non_blank(req.role),
        ) else {
            return Err(CivicError::Validation("missing required fields".into()));
        };

        let email = email.to_lowercase();
        if !is_plausible_email(&email) {
            return Err(CivicError::Validation(format!("invalid email: {email}")));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CivicError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let role: Role = role.parse()?;

        let password_hash = self.hasher.hash(&password)?;
        let user = self
            .users
            .create(NewUser {
                name,
                email,
                password_hash,
                role,
            })
            .await?;
        tracing::info!(user_id = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn authenticate(&self, req: LoginRequest) -> Result<Identity> {
        let (Some(email), Some(password)) = (non_blank(req.email), req.password) else {
            return Err(CivicError::Validation("email and password are required".into()));
        };

        let Some(user) = self.users.find_by_email(&email).await? else {
            tracing::debug!("login for unknown email");
            return Err(CivicError::Unauthorized(BAD_CREDENTIALS.into()));
        };
        if !self.hasher.verify(&password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "login with wrong password");
            return Err(CivicError::Unauthorized(BAD_CREDENTIALS.into()));
        }

        Ok(Identity {
            id: user.id,
            email: user.email,
            role: user.role,
        })
    }

    /// The stored user behind a session. A valid token for a user that no
    /// longer exists counts as no session.
    pub async fn current_user(&self, actor: &Actor) -> Result<User> {
        let identity = actor.require_authenticated()?;
        match self.users.get(identity.id).await {
            Err(CivicError::NotFound(_)) => {
                Err(CivicError::Unauthorized("session user no longer exists".into()))
            }
            other => other,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryUserStore;
    use crate::password::Argon2Hasher;

    fn service() -> AccountService {
        AccountService::new(Arc::new(InMemoryUserStore::new()), Arc::new(Argon2Hasher))
    }

    fn register_req(email: &str, role: &str) -> RegisterRequest {
        RegisterRequest {
            name: Some("Asha".into()),
            email: Some(email.into()),
            password: Some("s3cret-pass".into()),
            role: Some(role.into()),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let svc = service();
        let user = svc.register(register_req("Asha@Example.org", "public")).await.unwrap();
        assert_eq!(user.email, "asha@example.org");
        assert_ne!(user.password_hash, "s3cret-pass");

        let identity = svc
            .authenticate(LoginRequest {
                email: Some("asha@example.org".into()),
                password: Some("s3cret-pass".into()),
            })
            .await
            .unwrap();
        assert_eq!(identity.id, user.id);
        assert_eq!(identity.role, Role::Public);
    }

    #[tokio::test]
    async fn register_requires_every_field() {
        let svc = service();
        let mut req = register_req("a@example.org", "public");
        req.role = None;
        let err = svc.register(req).await.unwrap_err();
        assert!(matches!(err, CivicError::Validation(_)));
    }

    #[tokio::test]
    async fn register_rejects_short_password_and_bad_email() {
        let svc = service();
        let mut req = register_req("a@example.org", "public");
        req.password = Some("short".into());
        assert!(matches!(svc.register(req).await, Err(CivicError::Validation(_))));
        let req = register_req("not-an-email", "public");
        assert!(matches!(svc.register(req).await, Err(CivicError::Validation(_))));
    }

    #[tokio::test]
    async fn register_rejects_unknown_role() {
        let svc = service();
        let err = svc
            .register(register_req("a@example.org", "mayor"))
            .await
            .unwrap_err();
        assert!(matches!(err, CivicError::Validation(_)));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let svc = service();
        svc.register(register_req("a@example.org", "public")).await.unwrap();
        let err = svc
            .register(register_req("A@example.org", "admin"))
            .await
            .unwrap_err();
        assert!(matches!(err, CivicError::Conflict(_)));
    }

    #[tokio::test]
    async fn current_user_needs_a_live_account() {
        let svc = service();
        let user = svc.register(register_req("a@example.org", "admin")).await.unwrap();

        let me = svc
            .current_user(&Actor::authenticated(user.id, &user.email, Role::Admin))
            .await
            .unwrap();
        assert_eq!(me.name, "Asha");

        let ghost = Actor::authenticated(uuid::Uuid::new_v4(), "ghost@example.org", Role::Public);
        assert!(matches!(
            svc.current_user(&ghost).await,
            Err(CivicError::Unauthorized(_))
        ));
        assert!(matches!(
            svc.current_user(&Actor::Anonymous).await,
            Err(CivicError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let svc = service();
        svc.register(register_req("a@example.org", "public")).await.unwrap();
        let wrong_pw = svc
            .authenticate(LoginRequest {
                email: Some("a@example.org".into()),
                password: Some("nope-nope".into()),
            })
            .await
            .unwrap_err();
        let unknown = svc
            .authenticate(LoginRequest {
                email: Some("b@example.org".into()),
                password: Some("s3cret-pass".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(wrong_pw, CivicError::Unauthorized(_)));
        assert_eq!(wrong_pw.to_string(), unknown.to_string());
    }
}
