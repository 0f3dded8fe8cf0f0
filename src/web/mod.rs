pub mod server;
pub mod models;
pub mod handlers;
