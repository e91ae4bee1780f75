pub mod api_constants;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod model;
pub mod mysql;
pub mod server;
pub mod sqlite;
pub mod store;

pub use server::app;
pub use store::ClosetStore;
