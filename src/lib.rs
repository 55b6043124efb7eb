pub mod api;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod lessons;
pub mod models;
pub mod services;
pub mod state;
