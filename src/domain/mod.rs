pub mod follow;
pub mod publication;
pub mod user;
