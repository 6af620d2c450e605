//! Request middleware helpers for the session server
//!
//! - `extract_client_ip`: best-effort peer address for connection logs

pub mod client_ip;

pub use client_ip::extract_client_ip;
