// Library exports for NovelBug
// This allows integration tests and the binary to share the same modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod mail;
pub mod repository;
pub mod routes;
pub mod services;
pub mod state;
pub mod writer;
