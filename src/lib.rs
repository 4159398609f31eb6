//! s-blog - A small blog backend
//!
//! This library provides the core functionality for the blog server: the
//! data model, the PostgreSQL persistence gateway and repositories, and the
//! HTTP/GraphQL API.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod graphql;
pub mod logging;
pub mod models;
