//! Core library for playlist-reorder
pub mod api;
pub mod config;
pub mod enrich;
pub mod error;
pub mod models;
pub mod pagination;
pub mod service;
pub mod sort;
pub mod writeback;

pub use error::{ReorderError, Result};
