//! HTTP layer for the feedwatch control interface.
//!
//! Defines the JSON control API, embedded Web-GUI assets and server assembly.

pub mod api;
pub mod assets;
pub mod server;
