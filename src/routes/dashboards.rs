use crate::{
    AppState,
    guard::{self, AccessGuard, GuardedView},
    handlers,
    models::Role,
    session::SessionStore,
};
use axum::{
    Router,
    middleware,
    routing::{MethodRouter, get},
};

/// Dashboard Router Module
///
/// One route per role-scoped view. Each route gets its own `GuardedView` layer, so the
/// allowed roles live next to the path they protect:
///
/// - `/super-admin`: SUPER_ADMIN
/// - `/admin`: ADMIN
/// - `/doctor`: DOCTOR
/// - `/account`: any authenticated role
///
/// A signed-in visitor on the wrong dashboard is redirected to their own landing view;
/// a visitor without a session is redirected to `/login`.
pub fn dashboard_routes(store: &SessionStore) -> Router<AppState> {
    Router::new()
        .merge(guarded(
            "/super-admin",
            get(handlers::super_admin_dashboard),
            AccessGuard::only([Role::SuperAdmin]),
            store,
        ))
        .merge(guarded(
            "/admin",
            get(handlers::admin_dashboard),
            AccessGuard::only([Role::Admin]),
            store,
        ))
        .merge(guarded(
            "/doctor",
            get(handlers::doctor_dashboard),
            AccessGuard::only([Role::Doctor]),
            store,
        ))
        .merge(guarded(
            "/account",
            get(handlers::account_view),
            AccessGuard::any_role(),
            store,
        ))
}

fn guarded(
    path: &str,
    view: MethodRouter<AppState>,
    access: AccessGuard,
    store: &SessionStore,
) -> Router<AppState> {
    Router::new()
        .route(path, view)
        .route_layer(middleware::from_fn_with_state(
            GuardedView::new(store.clone(), access),
            guard::enforce,
        ))
}
