//! The content management backend for a national swimming federation

pub mod config;
pub mod email;
pub mod error;
pub mod file;
pub mod graphql;
pub mod models;
pub mod publish;
pub mod routes;
pub mod util;
