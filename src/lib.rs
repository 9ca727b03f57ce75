pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod trends;
