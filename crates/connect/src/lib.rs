//! Client for the AnkiConnect HTTP API.

pub mod action;
pub mod client;
pub mod error;
pub mod store;
pub mod transport;

pub use action::{API_VERSION, Action, deck_query};
pub use client::{AnkiConnect, ConnectConfig, DEFAULT_URL};
pub use error::{ConnectError, ErrorKind};
pub use store::{CardId, CardStore, NoteId};
pub use transport::{HttpTransport, Transport};
