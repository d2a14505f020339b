use axum::{routing::delete, routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/profile/:id", get(handlers::profile))
        .route("/counters", get(handlers::counters))
        .route("/counters/:id", get(handlers::counters))
}

pub fn follows() -> Router<AppState> {
    Router::new()
        .route("/follow", post(handlers::follow_user))
        .route("/unfollow/:id", delete(handlers::unfollow_user))
        // id and page are both optional path segments
        .route("/following", get(handlers::list_following))
        .route("/following/:id", get(handlers::list_following))
        .route("/following/:id/:page", get(handlers::list_following))
        .route("/followers", get(handlers::list_followers))
        .route("/followers/:id", get(handlers::list_followers))
        .route("/followers/:id/:page", get(handlers::list_followers))
}

pub fn publications() -> Router<AppState> {
    Router::new()
        .route("/new-publication", post(handlers::create_publication))
        .route("/show-publication/:id", get(handlers::show_publication))
        .route(
            "/delete-publication/:id",
            delete(handlers::delete_publication),
        )
        .route(
            "/publications-user/:id",
            get(handlers::list_user_publications),
        )
        .route(
            "/publications-user/:id/:page",
            get(handlers::list_user_publications),
        )
        .route("/feed", get(handlers::feed))
        .route("/feed/:page", get(handlers::feed))
}
