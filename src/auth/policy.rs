//! Which routes skip authentication.
//!
//! Every registered route passes through [`access_for`]. The only public
//! entries are login, account self-registration (`POST /api/users`) and the
//! health probe; everything else, including paths missing from the table,
//! requires a valid bearer token.

use axum::http::Method;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteFamily {
    Login,
    UsersCollection,
    UsersItem,
    Health,
}

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const USERS_PATH: &str = "/api/users";
pub const USER_ITEM_PATH: &str = "/api/users/:id";
pub const HEALTH_PATH: &str = "/health";

struct RoutePolicy {
    family: RouteFamily,
    /// `None` matches every method.
    method: Option<&'static str>,
    access: Access,
}

/// First matching row wins.
const ROUTE_POLICIES: &[RoutePolicy] = &[
    RoutePolicy {
        family: RouteFamily::Login,
        method: None,
        access: Access::Public,
    },
    RoutePolicy {
        family: RouteFamily::UsersCollection,
        method: Some("POST"),
        access: Access::Public,
    },
    RoutePolicy {
        family: RouteFamily::UsersCollection,
        method: None,
        access: Access::Authenticated,
    },
    RoutePolicy {
        family: RouteFamily::UsersItem,
        method: None,
        access: Access::Authenticated,
    },
    RoutePolicy {
        family: RouteFamily::Health,
        method: Some("GET"),
        access: Access::Public,
    },
];

pub fn route_family(path: &str) -> Option<RouteFamily> {
    if path == LOGIN_PATH {
        return Some(RouteFamily::Login);
    }
    if path == USERS_PATH {
        return Some(RouteFamily::UsersCollection);
    }
    if path.starts_with("/api/users/") {
        return Some(RouteFamily::UsersItem);
    }
    if path == HEALTH_PATH {
        return Some(RouteFamily::Health);
    }
    None
}

pub fn access_for(method: &Method, path: &str) -> Access {
    let Some(family) = route_family(path) else {
        return Access::Authenticated;
    };
    ROUTE_POLICIES
        .iter()
        .find(|p| p.family == family && p.method.map_or(true, |m| m == method.as_str()))
        .map(|p| p.access)
        .unwrap_or(Access::Authenticated)
}
