use crate::auth::{Auth, AuthState, TokenStore};

pub const LOGIN_ROUTE: &str = "/login";

/// Outcome of a protected-route check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Session restore has not finished yet.
    Pending,
    Granted,
    /// Send the user to [`LOGIN_ROUTE`], remembering where they came from.
    RedirectToLogin { from: String },
}

impl Access {
    #[must_use]
    pub const fn login_route() -> &'static str {
        LOGIN_ROUTE
    }
}

/// Gate for protected routes. With `demo_mode` on every route is open,
/// whatever the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteGuard {
    demo_mode: bool,
}

impl RouteGuard {
    #[must_use]
    pub const fn new(demo_mode: bool) -> Self {
        Self { demo_mode }
    }

    #[must_use]
    pub const fn demo_mode(&self) -> bool {
        self.demo_mode
    }

    #[must_use]
    pub fn check<S: TokenStore>(&self, auth: &Auth<S>, path: &str) -> Access {
        self.check_state(&auth.snapshot(), path)
    }

    #[must_use]
    pub fn check_state(&self, state: &AuthState, path: &str) -> Access {
        if state.loading || !state.initialized {
            Access::Pending
        } else if self.demo_mode || state.is_authenticated() {
            Access::Granted
        } else {
            tracing::debug!(from = path, "redirecting to login");
            Access::RedirectToLogin {
                from: path.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::User;

    fn settled() -> AuthState {
        AuthState {
            initialized: true,
            ..AuthState::default()
        }
    }

    #[test]
    fn pending_until_session_restore_finishes() {
        let guard = RouteGuard::new(true);
        assert_eq!(guard.check_state(&AuthState::default(), "/dashboard"), Access::Pending);

        let loading = AuthState {
            loading: true,
            ..settled()
        };
        assert_eq!(guard.check_state(&loading, "/dashboard"), Access::Pending);
    }

    #[test]
    fn demo_mode_grants_without_session() {
        let guard = RouteGuard::new(true);
        let state = AuthState {
            error: Some("Invalid credentials".into()),
            ..settled()
        };
        assert_eq!(guard.check_state(&state, "/dashboard"), Access::Granted);
    }

    #[test]
    fn enforced_guard_redirects_anonymous_users() {
        let guard = RouteGuard::new(false);
        assert_eq!(
            guard.check_state(&settled(), "/dashboard/soil"),
            Access::RedirectToLogin {
                from: "/dashboard/soil".into()
            }
        );

        let signed_in = AuthState {
            user: Some(User {
                id: "1".into(),
                email: "a@b.com".into(),
                name: "A".into(),
                role: "farmer".into(),
                created_at: None,
            }),
            token: Some("t1".into()),
            ..settled()
        };
        assert_eq!(guard.check_state(&signed_in, "/dashboard"), Access::Granted);
        assert_eq!(Access::login_route(), "/login");
    }
}
