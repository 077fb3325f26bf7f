//! HTTP surface: routing, per-request authentication, and handlers.
//!
//! Every request walks the same gate sequence: authenticate (Basic auth,
//! every request independently) → authorize (one permission per route) →
//! resolve the target path → execute. Authentication failures short-circuit
//! before any path resolution; authorization failures short-circuit before
//! any filesystem access.

pub mod error;
pub mod files;
pub mod users;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Request, State};
use axum::middleware::{self, Next};
use axum::response::{Json, Response};
use axum::routing::{get, post};
use axum::Router;
use axum_extra::headers::{authorization::Basic, Authorization};
use axum_extra::TypedHeader;
use protocol::HealthResponse;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthService, Identity, UserStore};
use crate::files::FileGateway;
pub use error::ApiError;

/// Shared handles every handler needs.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<FileGateway>,
    pub auth: Arc<AuthService>,
    pub store: Arc<UserStore>,
}

impl AppState {
    /// Build the state from its parts.
    pub fn new(gateway: Arc<FileGateway>, store: Arc<UserStore>) -> Self {
        let auth = Arc::new(AuthService::new(store.clone()));
        Self {
            gateway,
            auth,
            store,
        }
    }
}

/// Build the full application router.
///
/// `/healthz` is the only unauthenticated route; everything else sits behind
/// the Basic-auth middleware.
pub fn router(state: AppState, max_upload_size: u64) -> Router {
    let protected = Router::new()
        .route("/files/ls", get(files::ls))
        .route("/files/readFile", get(files::read_file))
        .route("/files/writeFile", post(files::write_file))
        .route("/files/mkdir", post(files::mkdir))
        .route("/users", post(users::create_user))
        .route(
            "/users/roles",
            post(users::create_role),
        )
        .route(
            "/users/roles/{role}",
            axum::routing::patch(users::update_role).delete(users::delete_role),
        )
        .route(
            "/users/{username}",
            axum::routing::patch(users::update_user).delete(users::delete_user),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            authenticate,
        ));

    Router::new()
        .route("/healthz", get(health))
        .merge(protected)
        .layer(DefaultBodyLimit::max(max_upload_size as usize))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Basic-auth middleware.
///
/// Verifies the credential on every request and attaches the resulting
/// [`Identity`] for handlers to consume. No path resolution happens before
/// this gate.
async fn authenticate(
    State(state): State<AppState>,
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(TypedHeader(header)) = auth_header else {
        return Err(ApiError::Unauthenticated);
    };

    if !state
        .auth
        .verify_credentials(header.username(), header.password())
    {
        tracing::debug!(username = header.username(), "credential rejected");
        return Err(ApiError::Unauthenticated);
    }

    req.extensions_mut()
        .insert(Identity::new(header.username()));
    Ok(next.run(req).await)
}

/// Fail with 403 unless the identity holds `permission`.
///
/// The error deliberately carries nothing about the request target.
pub(crate) fn require_permission(
    state: &AppState,
    identity: &Identity,
    permission: &str,
) -> Result<(), ApiError> {
    if state.auth.check_permission(identity, permission) {
        Ok(())
    } else {
        tracing::debug!(
            username = identity.username(),
            permission,
            "permission denied"
        );
        Err(ApiError::Forbidden)
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok(env!("CARGO_PKG_VERSION")))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::auth::{UserRecord, UserStore};
    use tempfile::TempDir;

    /// State over temp directories, with `alice` (editor: read+write),
    /// `bob` (viewer: read) and `root` (admin: manageUsers) provisioned.
    pub(crate) fn state() -> (TempDir, AppState) {
        let temp = TempDir::new().unwrap();
        let gateway = Arc::new(FileGateway::new(temp.path().join("uploads")).unwrap());
        let store = Arc::new(UserStore::load(temp.path().join("users.json")).unwrap());

        for (name, role) in [("alice", "editor"), ("bob", "viewer"), ("root", "admin")] {
            store
                .add_user(UserRecord {
                    username: name.to_string(),
                    hashed_password: bcrypt::hash(format!("{name}-pw"), 4).unwrap(),
                    role: role.to_string(),
                })
                .unwrap();
        }
        store
            .add_role("editor", vec!["read".to_string(), "write".to_string()])
            .unwrap();
        store.add_role("viewer", vec!["read".to_string()]).unwrap();
        store
            .add_role("admin", vec!["manageUsers".to_string()])
            .unwrap();

        (temp, AppState::new(gateway, store))
    }

    pub(crate) fn identity(name: &str) -> axum::Extension<Identity> {
        axum::Extension(Identity::new(name))
    }
}
