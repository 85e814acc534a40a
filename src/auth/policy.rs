//! Static route authorization policy.
//!
//! A declarative table mapping (method, path pattern) to a required
//! capability, evaluated once per request against the identity the
//! authentication layer established. Configuration data, not computed
//! logic: the only output is permit or deny.

use axum::http::Method;

use super::identity::Identity;
use crate::db::Role;

/// What a route requires of the caller.
#[derive(Debug, Clone)]
pub enum Requirement {
    /// Anyone, identity or not
    Public,
    /// Any established identity
    Authenticated,
    /// Exactly this role
    Role(Role),
    /// Any of these roles
    AnyRole(&'static [Role]),
}

/// One row of the policy table. `method: None` matches every method.
#[derive(Debug, Clone)]
pub struct PolicyRule {
    pub method: Option<Method>,
    pub pattern: &'static str,
    pub requirement: Requirement,
}

/// Outcome of the authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Permit,
    /// No identity where one is required
    Unauthorized,
    /// Identity present but role not in the required set
    Forbidden,
}

/// The route table. First matching rule wins; unmatched paths require an
/// authenticated caller.
pub fn route_policy() -> &'static [PolicyRule] {
    static POLICY: &[PolicyRule] = &[
        PolicyRule {
            method: Some(Method::POST),
            pattern: "/auth/login",
            requirement: Requirement::Public,
        },
        PolicyRule {
            method: Some(Method::POST),
            pattern: "/auth/refresh-token",
            requirement: Requirement::Public,
        },
        PolicyRule {
            method: Some(Method::POST),
            pattern: "/auth/logout",
            requirement: Requirement::Public,
        },
        PolicyRule {
            method: Some(Method::GET),
            pattern: "/health",
            requirement: Requirement::Public,
        },
        PolicyRule {
            method: Some(Method::GET),
            pattern: "/auth/me",
            requirement: Requirement::Authenticated,
        },
        PolicyRule {
            method: None,
            pattern: "/clients/**",
            requirement: Requirement::Role(Role::Superadmin),
        },
        PolicyRule {
            method: Some(Method::GET),
            pattern: "/users",
            requirement: Requirement::Role(Role::Superadmin),
        },
        PolicyRule {
            method: Some(Method::PUT),
            pattern: "/users/me",
            requirement: Requirement::Authenticated,
        },
        PolicyRule {
            method: None,
            pattern: "/users/**",
            requirement: Requirement::AnyRole(&[Role::Superadmin, Role::ClientAdmin]),
        },
        PolicyRule {
            method: None,
            pattern: "/reports/**",
            requirement: Requirement::AnyRole(&[Role::Superadmin, Role::ClientAdmin]),
        },
    ];
    POLICY
}

/// Evaluate the policy for one request.
pub fn evaluate(
    rules: &[PolicyRule],
    method: &Method,
    path: &str,
    identity: Option<&Identity>,
) -> Decision {
    let requirement = rules
        .iter()
        .find(|rule| {
            rule.method.as_ref().is_none_or(|m| m == method) && pattern_matches(rule.pattern, path)
        })
        .map(|rule| &rule.requirement)
        .unwrap_or(&Requirement::Authenticated);

    match requirement {
        Requirement::Public => Decision::Permit,
        Requirement::Authenticated => match identity {
            Some(_) => Decision::Permit,
            None => Decision::Unauthorized,
        },
        Requirement::Role(required) => match identity {
            None => Decision::Unauthorized,
            Some(id) if id.role == *required => Decision::Permit,
            Some(_) => Decision::Forbidden,
        },
        Requirement::AnyRole(set) => match identity {
            None => Decision::Unauthorized,
            Some(id) if set.contains(&id.role) => Decision::Permit,
            Some(_) => Decision::Forbidden,
        },
    }
}

/// Match a path against a pattern: exact, trailing `/**` prefix wildcard,
/// or `{name}` single-segment wildcards.
fn pattern_matches(pattern: &str, path: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix("/**") {
        return path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
    }

    let mut pattern_segments = pattern.split('/');
    let mut path_segments = path.split('/');
    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some(p), Some(s)) => {
                let wildcard = p.starts_with('{') && p.ends_with('}');
                if wildcard {
                    if s.is_empty() {
                        return false;
                    }
                } else if p != s {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: Role) -> Identity {
        Identity {
            subject: "acc-1".to_string(),
            email: "a@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn test_pattern_exact() {
        assert!(pattern_matches("/auth/login", "/auth/login"));
        assert!(!pattern_matches("/auth/login", "/auth/login/extra"));
        assert!(!pattern_matches("/auth/login", "/auth"));
    }

    #[test]
    fn test_pattern_prefix_wildcard() {
        assert!(pattern_matches("/clients/**", "/clients"));
        assert!(pattern_matches("/clients/**", "/clients/42"));
        assert!(pattern_matches("/clients/**", "/clients/42/users"));
        assert!(!pattern_matches("/clients/**", "/clientside"));
    }

    #[test]
    fn test_pattern_segment_wildcard() {
        assert!(pattern_matches("/users/{id}", "/users/42"));
        assert!(!pattern_matches("/users/{id}", "/users"));
        assert!(!pattern_matches("/users/{id}", "/users/42/extra"));
        assert!(!pattern_matches("/users/{id}", "/users/"));
    }

    #[test]
    fn test_public_route_permits_anonymous() {
        let decision = evaluate(route_policy(), &Method::POST, "/auth/login", None);
        assert_eq!(decision, Decision::Permit);
    }

    #[test]
    fn test_protected_route_rejects_anonymous() {
        let decision = evaluate(route_policy(), &Method::GET, "/users", None);
        assert_eq!(decision, Decision::Unauthorized);
    }

    #[test]
    fn test_role_mismatch_is_forbidden() {
        let employee = identity(Role::Employee);
        let decision = evaluate(route_policy(), &Method::GET, "/users", Some(&employee));
        assert_eq!(decision, Decision::Forbidden);
    }

    #[test]
    fn test_exact_role_permits() {
        let superadmin = identity(Role::Superadmin);
        let decision = evaluate(route_policy(), &Method::GET, "/users", Some(&superadmin));
        assert_eq!(decision, Decision::Permit);
    }

    #[test]
    fn test_any_role_set() {
        let decision = evaluate(
            route_policy(),
            &Method::GET,
            "/reports/summary",
            Some(&identity(Role::ClientAdmin)),
        );
        assert_eq!(decision, Decision::Permit);

        let decision = evaluate(
            route_policy(),
            &Method::GET,
            "/reports/summary",
            Some(&identity(Role::Recruiter)),
        );
        assert_eq!(decision, Decision::Forbidden);
    }

    #[test]
    fn test_method_specific_rule_does_not_leak() {
        // GET /users is superadmin-only, but the /users/** fallback admits
        // client admins to the rest of the user surface.
        let admin = identity(Role::ClientAdmin);
        assert_eq!(
            evaluate(route_policy(), &Method::GET, "/users", Some(&admin)),
            Decision::Forbidden
        );
        assert_eq!(
            evaluate(route_policy(), &Method::GET, "/users/42", Some(&admin)),
            Decision::Permit
        );
    }

    #[test]
    fn test_put_users_me_requires_only_authentication() {
        let employee = identity(Role::Employee);
        assert_eq!(
            evaluate(route_policy(), &Method::PUT, "/users/me", Some(&employee)),
            Decision::Permit
        );
        assert_eq!(
            evaluate(route_policy(), &Method::PUT, "/users/me", None),
            Decision::Unauthorized
        );
    }

    #[test]
    fn test_unmatched_path_requires_authentication() {
        assert_eq!(
            evaluate(route_policy(), &Method::GET, "/anything-else", None),
            Decision::Unauthorized
        );
        assert_eq!(
            evaluate(
                route_policy(),
                &Method::GET,
                "/anything-else",
                Some(&identity(Role::Employee))
            ),
            Decision::Permit
        );
    }

    #[test]
    fn test_clients_subtree_is_superadmin_only() {
        let admin = identity(Role::ClientAdmin);
        assert_eq!(
            evaluate(route_policy(), &Method::GET, "/clients/42", Some(&admin)),
            Decision::Forbidden
        );
        assert_eq!(
            evaluate(
                route_policy(),
                &Method::DELETE,
                "/clients/42",
                Some(&identity(Role::Superadmin))
            ),
            Decision::Permit
        );
    }
}
