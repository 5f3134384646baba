//! Batch product-image pipeline
//!
//! Accepts CSV tables of products and image URLs, fetches and recompresses
//! every image in a background worker, records per-job progress and results,
//! and notifies an optional callback when a job finishes.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
