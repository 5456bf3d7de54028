//! Role gate for the browser-facing pages.
//!
//! Only wraps the static page fallback. The JSON API does its own
//! authorization inside the service and answers with `{error}` bodies.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use civicsync_core::actor::{Actor, Role};
use percent_encoding::percent_decode_str;

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";
pub const HOME_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    RedirectToLogin,
    RedirectToUnauthorized,
    RedirectHome,
}

impl GateDecision {
    pub fn location(&self) -> Option<&'static str> {
        match self {
            Self::Pass => None,
            Self::RedirectToLogin => Some(LOGIN_PATH),
            Self::RedirectToUnauthorized => Some(UNAUTHORIZED_PATH),
            Self::RedirectHome => Some(HOME_PATH),
        }
    }
}

#[derive(Debug, Clone)]
struct Rule {
    prefix: String,
    roles: Vec<Role>,
}

/// Page prefix to allowed roles. The longest matching prefix decides.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Vec<Rule>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new([
            ("/admin", vec![Role::Admin]),
            ("/dashboard", vec![Role::Admin, Role::Public]),
            ("/profile", vec![Role::Public, Role::Admin]),
        ])
    }
}

impl AccessPolicy {
    pub fn new<P: Into<String>>(rules: impl IntoIterator<Item = (P, Vec<Role>)>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|(prefix, roles)| Rule {
                    prefix: normalize(prefix.into()),
                    roles,
                })
                .collect(),
        }
    }

    fn rule_for(&self, path: &str) -> Option<&Rule> {
        self.rules
            .iter()
            .filter(|rule| under_prefix(path, &rule.prefix))
            .max_by_key(|rule| rule.prefix.len())
    }

    pub fn decide(&self, path: &str, actor: &Actor) -> GateDecision {
        let role = actor.role();

        let auth_page = under_prefix(path, LOGIN_PATH) || under_prefix(path, REGISTER_PATH);
        if role.is_some() && auth_page {
            return GateDecision::RedirectHome;
        }

        let Some(rule) = self.rule_for(path) else {
            return GateDecision::Pass;
        };
        match role {
            None => GateDecision::RedirectToLogin,
            Some(role) if rule.roles.contains(&role) => GateDecision::Pass,
            Some(_) => GateDecision::RedirectToUnauthorized,
        }
    }
}

fn normalize(prefix: String) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".into()
    } else {
        trimmed.into()
    }
}

/// The path the file server will actually open: percent-decoded, with empty
/// and `.` segments dropped and no trailing slash. `None` when the path is not
/// UTF-8 after decoding or climbs with `..`; the file server refuses those too.
pub fn canonical_path(raw: &str) -> Option<String> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    let mut canonical = String::with_capacity(decoded.len());
    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => return None,
            s => {
                canonical.push('/');
                canonical.push_str(s);
            }
        }
    }
    if canonical.is_empty() {
        canonical.push('/');
    }
    Some(canonical)
}

/// Segment-aware: `/admin` covers `/admin` and `/admin/x`, not `/administrator`.
fn under_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

pub async fn page_gate(
    Extension(policy): Extension<Arc<AccessPolicy>>,
    Extension(actor): Extension<Actor>,
    req: Request,
    next: Next,
) -> Response {
    let Some(path) = canonical_path(req.uri().path()) else {
        tracing::debug!(uri = %req.uri(), "page gate rejected undecodable path");
        return StatusCode::BAD_REQUEST.into_response();
    };
    let decision = policy.decide(&path, &actor);
    match decision.location() {
        None => next.run(req).await,
        Some(location) => {
            tracing::debug!(%path, ?decision, "page gate redirect");
            Redirect::temporary(location).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn as_role(role: Role) -> Actor {
        Actor::authenticated(Uuid::new_v4(), "someone@example.org", role)
    }

    #[test]
    fn anonymous_is_sent_to_login() {
        let policy = AccessPolicy::default();
        assert_eq!(
            policy.decide("/admin", &Actor::Anonymous),
            GateDecision::RedirectToLogin
        );
        assert_eq!(
            policy.decide("/dashboard/issues", &Actor::Anonymous),
            GateDecision::RedirectToLogin
        );
    }

    #[test]
    fn public_role_cannot_enter_admin() {
        let policy = AccessPolicy::default();
        let citizen = as_role(Role::Public);
        assert_eq!(
            policy.decide("/admin/issues", &citizen),
            GateDecision::RedirectToUnauthorized
        );
        assert_eq!(policy.decide("/dashboard", &citizen), GateDecision::Pass);
        assert_eq!(policy.decide("/admin", &as_role(Role::Admin)), GateDecision::Pass);
    }

    #[test]
    fn prefix_matching_respects_segments() {
        let policy = AccessPolicy::default();
        assert_eq!(
            policy.decide("/administrator", &Actor::Anonymous),
            GateDecision::Pass
        );
        assert_eq!(policy.decide("/", &Actor::Anonymous), GateDecision::Pass);
    }

    #[test]
    fn longest_prefix_wins() {
        let policy = AccessPolicy::new([
            ("/dashboard", vec![Role::Public, Role::Admin]),
            ("/dashboard/moderation/", vec![Role::Admin]),
        ]);
        let citizen = as_role(Role::Public);
        assert_eq!(policy.decide("/dashboard/map", &citizen), GateDecision::Pass);
        assert_eq!(
            policy.decide("/dashboard/moderation/queue", &citizen),
            GateDecision::RedirectToUnauthorized
        );
    }

    #[test]
    fn signed_in_users_skip_login_and_register() {
        let policy = AccessPolicy::default();
        let citizen = as_role(Role::Public);
        assert_eq!(policy.decide("/login", &citizen), GateDecision::RedirectHome);
        assert_eq!(policy.decide("/register", &citizen), GateDecision::RedirectHome);
        assert_eq!(policy.decide("/login", &Actor::Anonymous), GateDecision::Pass);
        assert_eq!(
            policy.decide("/login/index.html", &citizen),
            GateDecision::RedirectHome
        );
        assert_eq!(policy.decide("/loginhelp", &citizen), GateDecision::Pass);
    }

    #[test]
    fn canonical_path_decodes_and_collapses() {
        assert_eq!(canonical_path("/%61dmin/index.html").as_deref(), Some("/admin/index.html"));
        assert_eq!(canonical_path("/admin%2Findex.html").as_deref(), Some("/admin/index.html"));
        assert_eq!(canonical_path("//admin/./x").as_deref(), Some("/admin/x"));
        assert_eq!(canonical_path("/login/").as_deref(), Some("/login"));
        assert_eq!(canonical_path("/").as_deref(), Some("/"));
        assert_eq!(canonical_path("/admin%5Cindex.html").as_deref(), Some("/admin/index.html"));
    }

    #[test]
    fn canonical_path_refuses_bad_input() {
        assert_eq!(canonical_path("/%ff%fe/index.html"), None);
        assert_eq!(canonical_path("/public/../admin/index.html"), None);
        assert_eq!(canonical_path("/public/%2e%2e/admin"), None);
    }
}
