pub mod auth;
pub mod book;
pub mod client;
pub mod config;
pub mod errors;
pub mod kernel;
pub mod markets;
pub mod precision;
pub mod registry;
pub mod traits;
pub mod translate;
pub mod types;
