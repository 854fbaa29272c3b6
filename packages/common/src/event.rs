use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Realtime audience an event is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Room {
    /// Private channel of a single user.
    User(i32),
    /// Everyone watching a contest.
    Contest(i32),
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::User(id) => write!(f, "user:{id}"),
            Room::Contest(id) => write!(f, "contest:{id}"),
        }
    }
}

/// Core event trait
pub trait Event: Send + Sync + Serialize + DeserializeOwned {
    /// Event name as seen by subscribers (e.g., "user-stats-changed")
    fn topic(&self) -> &'static str;

    /// Room this event is delivered to
    fn room(&self) -> Room;

    /// Wrap the event for transport
    fn to_envelope(&self) -> EventEnvelope {
        EventEnvelope {
            topic: self.topic().to_string(),
            room: self.room(),
            payload: serde_json::to_value(self).unwrap_or_default(),
            emitted_at: Utc::now(),
        }
    }

    /// Recover a typed event from an envelope
    fn from_envelope(e: &EventEnvelope) -> Result<Self, serde_json::Error> {
        serde_json::from_value(e.payload.clone())
    }
}

/// Transport form of any event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub topic: String,
    pub room: Room,
    pub payload: serde_json::Value,
    pub emitted_at: DateTime<Utc>,
}
