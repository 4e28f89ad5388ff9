//! PromeConfig console: session handling, backend adapters, resource
//! services, the application controller and the form views used by the
//! `promeconfig` CLI.

pub mod backend;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod services;
pub mod session;
pub mod views;

pub use backend::Backend;
pub use config::{BackendKind, ConsoleConfig, RestRoutes};
pub use controller::AppController;
pub use error::ConsoleError;
pub use session::{Session, SessionStore};
