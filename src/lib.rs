//! Library crate for chord-trainer: game state, backend client, local stores and the
//! services the terminal driver (and tests) call into.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod services;
pub mod state;
