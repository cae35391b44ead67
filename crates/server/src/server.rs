use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};

use std::sync::Arc;

use crate::{ads, proposals, user};
use engine::{Engine, EngineError};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// Resolve HTTP Basic credentials to an `engine::User` stored in the request
/// extensions.
async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(auth_header)) = auth_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user = match state
        .engine
        .authenticate(auth_header.username(), auth_header.password())
        .await
    {
        Ok(user) => user,
        Err(EngineError::Unauthorized(_)) => return Err(StatusCode::UNAUTHORIZED),
        Err(err) => {
            tracing::error!("authentication failed: {err}");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

async fn health() -> &'static str {
    "ok"
}

/// Build the API router.
///
/// Protected and public routes may share a path; their method routers are
/// merged and only the protected methods carry the auth layer.
pub fn router(state: ServerState) -> Router {
    let protected = Router::new()
        .route(
            "/users/me",
            get(user::me).patch(user::update_me).delete(user::delete_me),
        )
        .route("/ads", post(ads::create))
        .route("/ads/{id}", patch(ads::update).delete(ads::delete))
        .route("/ads/{id}/proposals", get(ads::proposals))
        .route("/proposals", get(proposals::list).post(proposals::create))
        .route("/proposals/{id}", get(proposals::detail))
        .route("/proposals/{id}/status", patch(proposals::update_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    let public = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(user::register))
        .route("/users/{username}", get(user::profile))
        .route("/ads", get(ads::list))
        .route("/ads/{id}", get(ads::detail));

    public.merge(protected).with_state(state)
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
    };

    axum::serve(listener, router(state)).await
}
