use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::types::{Event, EventEnvelope, EventKind, EventPayload};

/// Why a raw record was left out of the decoded batch.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionReason {
    /// Even the common envelope fields could not be read.
    Envelope,
    /// The `type` field names a kind the registry does not know.
    UnknownKind(String),
    /// The kind is known but the record does not match its schema.
    Payload(EventKind),
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::Envelope => write!(f, "invalid event envelope"),
            RejectionReason::UnknownKind(kind) => write!(f, "unknown event type {kind:?}"),
            RejectionReason::Payload(kind) => write!(f, "invalid {kind} payload"),
        }
    }
}

/// A raw record that could not be decoded, kept for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// Position of the record in the input batch
    pub index: usize,
    pub reason: RejectionReason,
    /// Validation error text
    pub detail: String,
    pub raw: Value,
}

/// Result of decoding a batch: every event that could be decoded, in input
/// order, plus the records that were skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
    pub events: Vec<Event>,
    pub rejections: Vec<Rejection>,
}

/// Decode a batch of raw events without ever failing as a whole.
///
/// The whole batch is first validated in one strict pass. If any record
/// breaks it, every record is decoded on its own instead, and the ones that
/// still fail are reported in [`Decoded::rejections`].
#[instrument(skip_all, fields(records = raw.len()))]
pub fn decode_events(raw: &[Value]) -> Decoded {
    match decode_strict(raw) {
        Ok(events) => {
            debug!(events = events.len(), "batch decoded in strict mode");
            Decoded {
                events,
                rejections: Vec::new(),
            }
        }
        Err(err) => {
            warn!(error = %err, "failed to decode the whole batch, falling back to per-event decoding");
            decode_each(raw)
        }
    }
}

/// Validate the whole batch against the event union; the first bad record
/// fails everything.
pub fn decode_strict(raw: &[Value]) -> Result<Vec<Event>, serde_json::Error> {
    raw.iter().map(Event::deserialize).collect()
}

/// Decode each record independently: envelope first to recover the `type`,
/// then the payload schema registered for that type.
pub fn decode_each(raw: &[Value]) -> Decoded {
    let mut decoded = Decoded::default();

    for (index, record) in raw.iter().enumerate() {
        match decode_one(record) {
            Ok(event) => decoded.events.push(event),
            Err((reason, detail)) => {
                warn!(
                    index,
                    reason = %reason,
                    error = %detail,
                    raw = %record,
                    "failed to decode event, it won't be processed"
                );
                decoded.rejections.push(Rejection {
                    index,
                    reason,
                    detail,
                    raw: record.clone(),
                });
            }
        }
    }

    debug!(
        events = decoded.events.len(),
        rejected = decoded.rejections.len(),
        "batch decoded per event"
    );
    decoded
}

fn decode_one(record: &Value) -> Result<Event, (RejectionReason, String)> {
    let envelope = EventEnvelope::deserialize(record)
        .map_err(|err| (RejectionReason::Envelope, err.to_string()))?;

    let kind = EventKind::from_discriminator(&envelope.kind).ok_or_else(|| {
        (
            RejectionReason::UnknownKind(envelope.kind.clone()),
            format!("unexpected event type: {}", envelope.kind),
        )
    })?;

    // an absent payload is never substituted, even for opaque kinds
    let payload = record.get("payload").ok_or_else(|| {
        (
            RejectionReason::Payload(kind),
            "missing field `payload`".to_string(),
        )
    })?;
    let payload = EventPayload::decode(kind, payload)
        .map_err(|err| (RejectionReason::Payload(kind), err.to_string()))?;

    Ok(envelope.into_event(payload))
}
