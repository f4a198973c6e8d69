//! # shuttle_net
//!
//! NATS transport layer for the shuttle simulator.
//!
//! This crate provides:
//!
//! - [`subjects`]: NATS subject hierarchy for events and control requests.
//! - [`messages`]: Observer events and control payloads.
//! - [`codec`]: JSON and MessagePack serialisation helpers.
//! - [`connection`]: NATS connection management.
//! - [`error`]: Network-layer error types.

pub mod codec;
pub mod connection;
pub mod error;
pub mod messages;
pub mod subjects;

pub use codec::{WireFormat, decode, decode_json, encode, encode_json};
pub use connection::NatsConnection;
pub use error::NetError;
