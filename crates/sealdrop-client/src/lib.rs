//! # Sealdrop Client
//!
//! The uploader/recipient half of the Sealdrop platform. Everything secret
//! happens here: DEKs are drawn, payloads sealed, and wrapped keys opened
//! on this side of the wire, while the server only ever sees ciphertext,
//! base64 payloads, and public keys.
//!
//! The crate provides:
//!
//! - a [`Keystore`] capability holding each identity's ML-KEM-512 keypair
//!   on the local host (the secret half never crosses the process boundary)
//! - a low-level [`ApiClient`] speaking the server's JSON/multipart surface
//! - a high-level [`SealdropClient`] that runs the encrypt-and-wrap,
//!   share-wrap, and decrypt-and-unwrap pipelines end to end
//!
//! Losing the keystore means permanently losing decrypt capability for
//! every share addressed to that identity's key; the client never silently
//! regenerates a keypair.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod keystore;
pub mod types;

pub use api::ApiClient;
pub use client::{ReceivedFile, SealdropClient};
pub use config::Config;
pub use error::{ClientError, Result};
pub use keystore::{FileKeystore, Keystore, MemoryKeystore};
