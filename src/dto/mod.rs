//! Wire types of the REST backend, mirroring its camelCase JSON.

pub mod auth;
pub mod common;
pub mod feedback;
pub mod game;
pub mod stats;
pub mod validation;
