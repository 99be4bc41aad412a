/// Router Module Index
///
/// Splits the portal shell's routes by who may reach them. Public routes carry no guard;
/// every dashboard route sits behind its own Access Guard layer.

/// Session endpoints and the login view, reachable by anyone.
pub mod public;

/// Role-scoped dashboards, each wrapped in `guard::enforce`.
pub mod dashboards;
