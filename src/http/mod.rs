use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::AuthUser;
pub use error::ApiError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .nest("/api/user", routes::users())
        .nest("/api/follow", routes::follows())
        .nest("/api/publication", routes::publications())
        .with_state(state)
}
