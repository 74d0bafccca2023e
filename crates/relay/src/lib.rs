//! Outbound side of the invocation gateway.
//!
//! [`BackendDescriptor::select`] resolves the configured agent backend once at
//! startup, [`Signer`] produces AWS SigV4 headers for the remote runtime, and
//! [`Relay`] forwards a query and hands back the backend's byte stream untouched.

pub mod backend;
pub mod envelope;
pub mod relay;
pub mod signer;

pub use backend::{BackendDescriptor, BackendMode, RemoteBackend};
pub use envelope::{RequestEnvelope, SESSION_ID_HEADER};
pub use relay::{Relay, RelayStream};
pub use signer::{Credentials, SignedHeaders, Signer, SigningRequest};
