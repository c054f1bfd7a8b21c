// Library surface for the binary and for headless/integration tests.
pub mod app;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod identity;
pub mod logging;
pub mod metrics;
pub mod runtime;
pub mod score_store;
pub mod session;
pub mod submit;
pub mod text;
pub mod ui;
