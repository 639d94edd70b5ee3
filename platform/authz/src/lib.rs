//! Route access policy.
//!
//! Every route is tagged either [`Access::Public`] or [`Access::Authenticated`]
//! in a single table. Routes missing from the table fall back to the policy
//! default, which is `Authenticated` unless stated otherwise.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthzError {
    #[error("{method} {route} requires an authenticated caller")]
    Unauthenticated { method: String, route: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Public,
    Authenticated,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RouteRule {
    pub method: String,
    pub route: String,
    pub access: Access,
}

/// What the gate knows about an incoming request.
#[derive(Clone, Debug)]
pub struct PolicyContext<'a> {
    pub method: &'a str,
    pub route: &'a str,
    pub authenticated: bool,
}

#[derive(Clone, Debug)]
pub struct AccessPolicy {
    rules: Vec<RouteRule>,
    default: Access,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(Access::Authenticated)
    }
}

impl AccessPolicy {
    pub fn new(default: Access) -> Self {
        Self {
            rules: Vec::new(),
            default,
        }
    }

    pub fn public(self, method: &str, route: &str) -> Self {
        self.rule(method, route, Access::Public)
    }

    pub fn authenticated(self, method: &str, route: &str) -> Self {
        self.rule(method, route, Access::Authenticated)
    }

    /// Later rules for the same method and route replace earlier ones.
    pub fn rule(mut self, method: &str, route: &str, access: Access) -> Self {
        let method = method.to_ascii_uppercase();
        self.rules
            .retain(|rule| !(rule.method == method && rule.route == route));
        self.rules.push(RouteRule {
            method,
            route: route.to_string(),
            access,
        });
        self
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn access_for(&self, method: &str, route: &str) -> Access {
        self.rules
            .iter()
            .find(|rule| rule.route == route && rule.method.eq_ignore_ascii_case(method))
            .map(|rule| rule.access)
            .unwrap_or(self.default)
    }

    pub fn check(&self, ctx: &PolicyContext<'_>) -> Result<(), AuthzError> {
        match self.access_for(ctx.method, ctx.route) {
            Access::Public => Ok(()),
            Access::Authenticated if ctx.authenticated => Ok(()),
            Access::Authenticated => Err(AuthzError::Unauthenticated {
                method: ctx.method.to_string(),
                route: ctx.route.to_string(),
            }),
        }
    }
}
