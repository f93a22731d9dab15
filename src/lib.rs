pub mod app;
pub mod cli;
pub mod config;
pub mod database;
pub mod schema;
pub mod seed;
pub mod services;
pub mod storage;
pub mod types;
pub mod util;

pub use app::App;
