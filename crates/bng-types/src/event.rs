//! Session lifecycle events carried on the event bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::{AccessType, DecodeError, Protocol, SessionKind, SubscriberSession};

/// Event type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EventType {
    #[default]
    SessionLifecycle,
}

/// A session lifecycle event.
///
/// The payload is always a full session snapshot, never a delta, so handling
/// the same event twice converges on the same state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Correlation identifier; not used for deduplication.
    #[serde(default = "Uuid::new_v4")]
    pub event_id: Uuid,

    #[serde(rename = "type", default)]
    pub event_type: EventType,

    pub access_type: AccessType,

    pub protocol: Protocol,

    pub session_id: String,

    pub payload: serde_json::Value,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl LifecycleEvent {
    /// Build an event carrying `session` as its payload.
    ///
    /// The declared access type and protocol are taken from the session.
    pub fn for_session(session: &SubscriberSession) -> serde_json::Result<Self> {
        Ok(Self {
            event_id: Uuid::new_v4(),
            event_type: EventType::SessionLifecycle,
            access_type: session.access_type(),
            protocol: session.protocol(),
            session_id: session.session_id().to_string(),
            payload: session.to_value()?,
            timestamp: Utc::now(),
        })
    }

    /// Declared discriminant of the payload.
    pub fn kind(&self) -> Result<SessionKind, DecodeError> {
        SessionKind::from_parts(self.access_type, self.protocol)
    }

    /// Decode the payload into the variant matching the declared kind.
    ///
    /// Fails when the declared pair is invalid, the payload does not decode
    /// as that variant, or the payload belongs to another session.
    pub fn decode_session(&self) -> Result<SubscriberSession, DecodeError> {
        let kind = self.kind()?;
        let session = SubscriberSession::from_value(kind, self.payload.clone())?;
        if session.session_id() != self.session_id {
            return Err(DecodeError::SessionIdMismatch {
                expected: self.session_id.clone(),
                actual: session.session_id().to_string(),
            });
        }
        Ok(session)
    }
}
