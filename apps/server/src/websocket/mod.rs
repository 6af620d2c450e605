//! WebSocket handlers for the shared watch session
//!
//! This module handles:
//! - Participant presence (join, leave, roster)
//! - Chat and media-control relay
//! - Host election
//! - Periodic playback time reconciliation

pub mod connection;
pub mod handler;
pub mod messages;
pub mod presence;
pub mod reconcile;
pub mod session;

pub use handler::{upgrade, ws_handler};
pub use reconcile::spawn_reconciler;
pub use session::{SessionCoordinator, SessionSnapshot};
