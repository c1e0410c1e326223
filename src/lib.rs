pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod logging;
pub mod repository;
pub mod response;
pub mod state;
pub mod system;
pub mod users;
