// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Recording domain model and the composite recording id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::Snafu;

use crate::rooms::RoomId;

/// Identifier of a media-server egress pipeline instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EgressId(String);

impl EgressId {
    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for EgressId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for EgressId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error returned when parsing an invalid [`RecordingId`].
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(display("invalid recording id: expected {{roomId}}--{{egressId}}--{{uid}}"))]
pub struct InvalidRecordingId;

/// Composite recording identifier: `{roomId}--{egressId}--{uid}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordingId {
    /// The room the recording was captured in.
    pub room_id: RoomId,
    /// The egress instance that produced the recording.
    pub egress_id: EgressId,
    /// Unique suffix distinguishing recordings of the same egress.
    pub uid: String,
}

impl RecordingId {
    /// Assemble a recording id from its parts.
    pub fn new(room_id: RoomId, egress_id: EgressId, uid: impl Into<String>) -> Self {
        Self {
            room_id,
            egress_id,
            uid: uid.into(),
        }
    }

    /// Parse the composite `{roomId}--{egressId}--{uid}` format.
    ///
    /// Room ids may contain single hyphens, so splitting happens on the
    /// literal `--` separator. The room id itself never contains `--`
    /// because the generator collapses hyphen runs.
    pub fn parse(value: &str) -> Result<Self, InvalidRecordingId> {
        let mut parts = value.split("--");

        let room = parts.next().ok_or(InvalidRecordingId)?;
        let egress = parts.next().ok_or(InvalidRecordingId)?;
        let uid = parts.next().ok_or(InvalidRecordingId)?;

        if parts.next().is_some() || room.is_empty() || egress.is_empty() || uid.is_empty() {
            return Err(InvalidRecordingId);
        }

        Ok(Self {
            room_id: RoomId::parse(room).map_err(|_| InvalidRecordingId)?,
            egress_id: EgressId::from(egress.to_owned()),
            uid: uid.to_owned(),
        })
    }
}

impl TryFrom<String> for RecordingId {
    type Error = InvalidRecordingId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RecordingId> for String {
    fn from(id: RecordingId) -> Self {
        id.to_string()
    }
}

impl std::fmt::Display for RecordingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}--{}--{}", self.room_id, self.egress_id, self.uid)
    }
}

/// Lifecycle status of a recording.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::AsRefStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordingStatus {
    /// Egress requested, not yet confirmed by the media server.
    Starting,
    /// The media server is writing the recording.
    Active,
    /// Stop requested, the media server is finalising the file.
    Ending,
    /// Terminal: the recording finished with a non-empty file.
    Complete,
    /// Terminal: the recording failed.
    Failed,
    /// Terminal: the recording was aborted before producing usable output.
    Aborted,
}

impl RecordingStatus {
    /// Whether the status is terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Aborted)
    }
}

/// Encoding descriptor of a recording artefact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingEncoding {
    /// Container format / file extension (`mp4`, `ogg`, …).
    pub container: String,
    /// Video codec, absent for audio-only recordings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    /// Audio codec.
    pub audio_codec: String,
}

impl Default for RecordingEncoding {
    fn default() -> Self {
        Self {
            container: "mp4".to_owned(),
            video_codec: Some("h264".to_owned()),
            audio_codec: "aac".to_owned(),
        }
    }
}

/// A media artefact captured by the media server for a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    /// Composite identifier.
    pub recording_id: RecordingId,
    /// The room the recording belongs to.
    pub room_id: RoomId,
    /// Lifecycle status.
    pub status: RecordingStatus,
    /// Size of the artefact in bytes.
    pub size: u64,
    /// Duration in seconds.
    pub duration: f64,
    /// Start timestamp.
    pub started_at: DateTime<Utc>,
    /// End timestamp, set when the recording reaches a terminal state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Object-store key of the media file.
    pub storage_path: String,
    /// Encoding descriptor.
    pub encoding: RecordingEncoding,
}

/// Machine codes of recording lifecycle conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingErrorCode {
    /// A recording is already running in the room.
    RecordingAlreadyStarted,
    /// The recording did not become active within the configured window.
    RecordingStartTimeout,
    /// The room has no participants to record.
    RoomHasNoParticipants,
    /// The recording is still starting and cannot be stopped yet.
    CannotBeStoppedWhileStarting,
    /// The recording is not running.
    AlreadyStopped,
    /// The recording must be stopped before it can be deleted.
    NotStopped,
}

impl RecordingErrorCode {
    /// The wire representation of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RecordingAlreadyStarted => "RECORDING_ALREADY_STARTED",
            Self::RecordingStartTimeout => "RECORDING_START_TIMEOUT",
            Self::RoomHasNoParticipants => "ROOM_HAS_NO_PARTICIPANTS",
            Self::CannotBeStoppedWhileStarting => "CANNOT_BE_STOPPED_WHILE_STARTING",
            Self::AlreadyStopped => "ALREADY_STOPPED",
            Self::NotStopped => "NOT_STOPPED",
        }
    }
}

/// Per-room manifest of media access secrets.
///
/// Each completed recording gets an opaque secret embedded into shareable
/// playback URLs. The manifest is deleted together with the last recording
/// metadata of the room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSecretsManifest {
    /// Secrets keyed by the recording uid.
    pub secrets: std::collections::BTreeMap<String, String>,
}

impl RecordingSecretsManifest {
    /// Whether `secret` grants access to the recording with `uid`.
    pub fn grants(&self, uid: &str, secret: &str) -> bool {
        self.secrets.get(uid).is_some_and(|s| s == secret)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn recording_id_round_trip() {
        let id = RecordingId::new(
            RoomId::parse("demo-x4f2").unwrap(),
            EgressId::from("eg_abc123".to_owned()),
            "9f81a",
        );

        let rendered = id.to_string();
        assert_eq!(rendered, "demo-x4f2--eg_abc123--9f81a");
        assert_eq!(RecordingId::parse(&rendered).unwrap(), id);
    }

    #[test]
    fn recording_id_rejects_malformed_input() {
        assert!(RecordingId::parse("demo-x4f2--eg_abc123").is_err());
        assert!(RecordingId::parse("demo--eg--uid--extra").is_err());
        assert!(RecordingId::parse("----").is_err());
        assert!(RecordingId::parse("").is_err());
    }
}
