pub mod api;
pub mod auth;
pub mod config;
pub mod course;
pub mod db;
pub mod enrollment;
pub mod error;
pub mod progress;
pub mod quiz;
pub mod report;
pub mod seed;
pub mod server;
pub mod user;
pub mod utils;
