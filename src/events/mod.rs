pub mod decode;
pub mod payloads;
pub mod types;

pub use decode::{decode_events, Decoded, Rejection};
pub use types::{Event, EventKind, EventPayload};
