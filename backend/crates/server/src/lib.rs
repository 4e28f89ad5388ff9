pub mod config;
pub mod db;
pub mod services;
pub mod web;

pub use config::ServerConfig;
pub use web::create_axum_router;
