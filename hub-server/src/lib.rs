//! # noc-hub-server
//!
//! Rendezvous and relay services for NocLauncher multiplayer.
//!
//! - **Registry**: hosts advertise worlds over HTTP and keep them listed with
//!   heartbeats; rooms that go quiet past their TTL disappear.
//! - **Relay**: two peers create a session, bind their observable UDP
//!   endpoints and exchange datagrams through a single forwarding socket.
//!
//! ## Architecture
//!
//! ```text
//!  Host ──HTTP──► registry (open / heartbeat / close)
//!  Player ─HTTP─► registry (list / join-by-code)
//!
//!  Host ──UDP──┐                     ┌──UDP── Player
//!              └──► relay forwarder ◄┘
//!                   (address → session/role)
//! ```
//!
//! All state is in memory; a restart clears it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cleanup;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod limits;
pub mod registry;
pub mod relay;
pub mod server;

use tracing_subscriber::EnvFilter;

/// Install the console subscriber used by both binaries.
///
/// `RUST_LOG` overrides `default_level`.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
