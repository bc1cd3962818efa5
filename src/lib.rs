pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod reference;
pub mod services;
pub mod storage;
