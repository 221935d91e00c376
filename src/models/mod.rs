//! Core data models for the library backend.
//!
//! Records map to database rows via `sqlx::FromRow`; the `*Read` /
//! `*Detail` shapes are what the HTTP layer serializes back to clients.

pub mod book;
pub mod tag;
pub mod video;
