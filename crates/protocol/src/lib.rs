//! Wire payloads exchanged with the upload coordinator.
//!
//! The coordinator speaks JSON with camelCase field names. These types
//! carry no behavior; transports in other crates serialize them.

pub mod constants;
pub mod messages;

// Re-export primary types for convenience.
pub use messages::{
    CompleteSessionRequest, CompleteSessionResponse, PartAck, ReportPartRequest,
    SignedUrlQuery, SignedUrlResponse, StartSessionRequest, StartSessionResponse,
};
