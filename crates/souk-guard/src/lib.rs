//! Route authorization decisions.
//!
//! A pure decision function over the session snapshot: no I/O, no state.
//! The UI layer calls [`authorize`] before rendering a screen and acts on
//! the returned [`RouteDecision`].

use souk_auth::{Role, SessionSnapshot, UserRecord};
use tracing::debug;

/// Routes that render mid-MFA, when the user holds a challenge but no
/// session yet.
const MFA_ROUTES: [&str; 2] = ["/auth/mfa/setup", "/auth/mfa/verify"];

const LOGIN_PATH: &str = "/login";
const ADMIN_LANDING: &str = "/admin";
const CUSTOMER_LANDING: &str = "/";
const VENDOR_FALLBACK_LANDING: &str = "/vendor/profile";

/// Access requirements of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub path: &'static str,
    /// Role required to render; `None` means the route is public.
    pub required_role: Option<Role>,
    /// Login/register style routes that must not render for a signed-in user.
    pub guest_only: bool,
}

impl RouteSpec {
    pub fn public(path: &'static str) -> Self {
        Self {
            path,
            required_role: None,
            guest_only: false,
        }
    }

    pub fn guest_only(path: &'static str) -> Self {
        Self {
            path,
            required_role: None,
            guest_only: true,
        }
    }

    pub fn role(path: &'static str, role: Role) -> Self {
        Self {
            path,
            required_role: Some(role),
            guest_only: false,
        }
    }
}

/// What the caller should do with the route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Render the route.
    Render,
    /// Render nothing; the session is not resolved yet.
    Hold,
    /// Navigate to the given path instead.
    Redirect(String),
}

/// Decide whether `route` may render for the session in `session`.
pub fn authorize(route: &RouteSpec, session: &SessionSnapshot) -> RouteDecision {
    // Until the persisted session is resolved, render nothing. Redirecting
    // here would flash the wrong screen for already-signed-in users.
    if !session.initialized {
        return RouteDecision::Hold;
    }

    if route.guest_only {
        return match &session.user {
            Some(user) => {
                debug!(path = route.path, "Guest-only route with active session");
                RouteDecision::Redirect(landing_path(user))
            }
            None => RouteDecision::Render,
        };
    }

    let Some(required) = route.required_role else {
        return RouteDecision::Render;
    };

    let Some(user) = &session.user else {
        // Mid-MFA the user holds a challenge but no session; the MFA
        // screens must still render.
        if session.mfa_in_progress && MFA_ROUTES.contains(&route.path) {
            return RouteDecision::Render;
        }
        return RouteDecision::Redirect(LOGIN_PATH.to_string());
    };

    if user.role != required {
        debug!(path = route.path, role = ?user.role, "Role mismatch");
        return RouteDecision::Redirect(landing_path(user));
    }

    RouteDecision::Render
}

/// Role-appropriate landing path.
///
/// Vendors land on their category dashboard; an unmapped category id falls
/// back to the profile page rather than failing.
pub fn landing_path(user: &UserRecord) -> String {
    match user.role {
        Role::Admin => ADMIN_LANDING.to_string(),
        Role::Customer => CUSTOMER_LANDING.to_string(),
        Role::Vendor => vendor_landing(user.category_id.as_deref()).to_string(),
    }
}

fn vendor_landing(category_id: Option<&str>) -> &'static str {
    match category_id {
        Some("1") => "/vendor/dashboard/salon",
        Some("2") => "/vendor/dashboard/restaurant",
        Some("3") => "/vendor/dashboard/grocery",
        Some("4") => "/vendor/dashboard/events",
        _ => VENDOR_FALLBACK_LANDING,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use souk_auth::ApprovalStatus;

    fn user(role: Role, category_id: Option<&str>) -> UserRecord {
        UserRecord {
            id: "u1".to_string(),
            role,
            category_id: category_id.map(str::to_string),
            approval: ApprovalStatus::Approved,
            mfa_verified: true,
            email_verified: true,
        }
    }

    fn session(user: Option<UserRecord>) -> SessionSnapshot {
        SessionSnapshot {
            initialized: true,
            user,
            mfa_in_progress: false,
        }
    }

    #[test]
    fn test_uninitialized_session_always_holds() {
        let snapshot = SessionSnapshot {
            initialized: false,
            user: Some(user(Role::Admin, None)),
            mfa_in_progress: false,
        };

        // Even public routes hold; nothing renders before resolution.
        for route in [
            RouteSpec::public("/"),
            RouteSpec::guest_only("/login"),
            RouteSpec::role("/admin", Role::Admin),
        ] {
            assert_eq!(authorize(&route, &snapshot), RouteDecision::Hold);
        }
    }

    #[test]
    fn test_public_route_renders_for_everyone() {
        let route = RouteSpec::public("/about");
        assert_eq!(authorize(&route, &session(None)), RouteDecision::Render);
        assert_eq!(
            authorize(&route, &session(Some(user(Role::Customer, None)))),
            RouteDecision::Render
        );
    }

    #[test]
    fn test_protected_route_redirects_anonymous_to_login() {
        let route = RouteSpec::role("/orders", Role::Customer);
        assert_eq!(
            authorize(&route, &session(None)),
            RouteDecision::Redirect("/login".to_string())
        );
    }

    #[test]
    fn test_mfa_routes_render_during_challenge_without_user() {
        let snapshot = SessionSnapshot {
            initialized: true,
            user: None,
            mfa_in_progress: true,
        };

        for path in ["/auth/mfa/setup", "/auth/mfa/verify"] {
            let route = RouteSpec::role(path, Role::Customer);
            assert_eq!(authorize(&route, &snapshot), RouteDecision::Render);
        }

        // Without an outstanding challenge they behave like any protected route.
        let route = RouteSpec::role("/auth/mfa/verify", Role::Customer);
        assert_eq!(
            authorize(&route, &session(None)),
            RouteDecision::Redirect("/login".to_string())
        );
    }

    #[test]
    fn test_role_mismatch_redirects_to_landing() {
        let route = RouteSpec::role("/admin", Role::Admin);

        assert_eq!(
            authorize(&route, &session(Some(user(Role::Customer, None)))),
            RouteDecision::Redirect("/".to_string())
        );
        assert_eq!(
            authorize(&route, &session(Some(user(Role::Vendor, Some("1"))))),
            RouteDecision::Redirect("/vendor/dashboard/salon".to_string())
        );
    }

    #[test]
    fn test_matching_role_renders() {
        let route = RouteSpec::role("/admin", Role::Admin);
        assert_eq!(
            authorize(&route, &session(Some(user(Role::Admin, None)))),
            RouteDecision::Render
        );
    }

    #[test]
    fn test_guest_only_route_redirects_signed_in_user() {
        let route = RouteSpec::guest_only("/login");

        assert_eq!(authorize(&route, &session(None)), RouteDecision::Render);
        assert_eq!(
            authorize(&route, &session(Some(user(Role::Admin, None)))),
            RouteDecision::Redirect("/admin".to_string())
        );
    }

    #[test]
    fn test_vendor_landing_table() {
        assert_eq!(
            landing_path(&user(Role::Vendor, Some("2"))),
            "/vendor/dashboard/restaurant"
        );
        assert_eq!(
            landing_path(&user(Role::Vendor, Some("4"))),
            "/vendor/dashboard/events"
        );
    }

    #[test]
    fn test_unmapped_vendor_category_falls_back_to_profile() {
        assert_eq!(landing_path(&user(Role::Vendor, Some("99"))), "/vendor/profile");
        assert_eq!(landing_path(&user(Role::Vendor, None)), "/vendor/profile");
    }
}
