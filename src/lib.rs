pub mod api;
pub mod authoring;
pub mod client;
pub mod config;
pub mod database;
pub mod middleware;
pub mod models;
pub mod seeds;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;
