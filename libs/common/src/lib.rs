//! Common library for the marketplace services
//!
//! This crate provides the functionality shared by the `auth` and `api`
//! services: database and cache connectivity, the response envelope and
//! error taxonomy, bearer tokens, password hashing, input validation,
//! account-type resolution and layered configuration.

pub mod accounts;
pub mod auth;
pub mod cache;
pub mod database;
pub mod error;
pub mod http;
pub mod jwt;
pub mod password;
pub mod response;
pub mod settings;
pub mod validation;
