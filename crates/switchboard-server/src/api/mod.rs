//! HTTP API: router assembly, shared state, extractors and error
//! mapping.

pub mod access_log;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use axum::Router;
use axum::middleware;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use self::state::SharedState;

/// Build the application router. Every route lives under `/api`.
pub fn build_router(state: SharedState) -> Router {
    let api = Router::new()
        .merge(routes::health::routes())
        .merge(routes::auth::routes())
        .merge(routes::users::routes())
        .merge(routes::tenants::routes())
        .merge(routes::roles::routes())
        .merge(routes::assignments::routes())
        .merge(routes::role_exceptions::routes())
        .merge(routes::teams::routes())
        .merge(routes::entities::routes())
        .merge(routes::screen_assets::routes())
        .merge(routes::transactions::routes())
        .merge(routes::audit::routes())
        .merge(routes::reference::routes());

    Router::new()
        .nest("/api", api)
        .layer(CatchPanicLayer::custom(access_log::panic_response))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            access_log::record,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
