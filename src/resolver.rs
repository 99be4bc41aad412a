use crate::models::Role;

/// Where unauthenticated visitors are sent.
pub const LOGIN_PATH: &str = "/login";

/// resolve_landing_path
///
/// Canonical landing view for a role. Total over `Role`: adding a variant fails to
/// compile until it is given a path here.
pub fn resolve_landing_path(role: Role) -> &'static str {
    match role {
        Role::SuperAdmin => "/super-admin",
        Role::Admin => "/admin",
        Role::Doctor => "/doctor",
    }
}
