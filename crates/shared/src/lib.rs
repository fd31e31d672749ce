//! Shared types, errors, and configuration for Fatura.
//!
//! This crate provides common types used across all other crates:
//! - Fixed-point money helpers with decimal precision
//! - Application-wide error types
//! - JWT token handling
//! - Configuration management

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
