pub mod app;
pub mod cli;
pub mod components;
pub mod config;
pub mod debounce;
pub mod highlight;
pub mod model;
pub mod query;
pub mod service;
pub mod ui;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use service::{NoteApi, NoteService, ServiceError};
