//! interactive-client: a session client for an interactive-overlay service
//! — scenes, controls, participant groups — driven over one duplex
//! connection with discovery-backed fail-over, compression negotiation,
//! and an event-sourced state cache.

mod cache;
mod client;
mod config;
mod controller;
mod discovery;
mod error;
mod events;
mod resources;
mod rpc;
mod transport;

pub use cache::StateCache;
pub use client::InteractiveClient;
pub use config::{ClientConfig, ParticipantId};
pub use error::{ConfigError, DiscoveryError, InteractiveError, ReplyError};
pub use events::{Event, EventStream};
pub use resources::{Controls, Groups, Participants, Scenes, Transactions};
pub use transport::SessionState;

pub use interactive_protocol::Scheme;
