pub mod auth;
pub mod error;
pub mod feed;
pub mod follows;
pub mod pagination;
pub mod publications;
pub mod users;

