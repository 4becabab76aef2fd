// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Webhook delivery verification and decoding.

use livekit_api::{access_token::TokenVerifier, webhooks::WebhookReceiver};
use snafu::Snafu;

use crate::adapter::EgressDescriptor;

#[derive(Debug, Snafu)]
pub enum WebhookVerifyError {
    /// Signature mismatch or malformed token; mapped to 401.
    #[snafu(display("Webhook signature verification failed: {message}"))]
    Signature { message: String },

    #[snafu(display("Webhook payload could not be decoded: {message}"))]
    Payload { message: String },
}

/// Event kinds the controller consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookKind {
    RoomStarted,
    RoomFinished,
    EgressStarted,
    EgressUpdated,
    EgressEnded,
    /// Acknowledged but otherwise ignored.
    Other(String),
}

impl WebhookKind {
    fn from_event_name(name: &str) -> Self {
        match name {
            "room_started" => Self::RoomStarted,
            "room_finished" => Self::RoomFinished,
            "egress_started" => Self::EgressStarted,
            "egress_updated" => Self::EgressUpdated,
            "egress_ended" => Self::EgressEnded,
            other => Self::Other(other.to_owned()),
        }
    }

    /// The wire name of the event, used in dedup lock names.
    pub fn as_event_name(&self) -> &str {
        match self {
            Self::RoomStarted => "room_started",
            Self::RoomFinished => "room_finished",
            Self::EgressStarted => "egress_started",
            Self::EgressUpdated => "egress_updated",
            Self::EgressEnded => "egress_ended",
            Self::Other(name) => name,
        }
    }
}

/// A verified webhook delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaWebhook {
    pub kind: WebhookKind,
    /// Unique delivery id assigned by the media server, used for dedup.
    pub id: String,
    /// Name of the affected room, when the event carries one.
    pub room_name: Option<String>,
    /// Egress details for the `egress_*` events.
    pub egress: Option<EgressDescriptor>,
}

/// Validates webhook deliveries against the LiveKit signing key.
pub struct WebhookVerifier {
    receiver: WebhookReceiver,
}

impl WebhookVerifier {
    pub fn new(api_key: &str, api_secret: &str) -> Self {
        Self {
            receiver: WebhookReceiver::new(TokenVerifier::with_api_key(api_key, api_secret)),
        }
    }

    /// Verify the `Authorization` token against the body and decode the
    /// event.
    pub fn verify(&self, body: &str, auth_token: &str) -> Result<MediaWebhook, WebhookVerifyError> {
        let event = self
            .receiver
            .receive(body, auth_token)
            .map_err(|e| WebhookVerifyError::Signature {
                message: e.to_string(),
            })?;

        Ok(MediaWebhook {
            kind: WebhookKind::from_event_name(&event.event),
            id: event.id,
            room_name: event
                .room
                .as_ref()
                .map(|room| room.name.clone())
                .or_else(|| {
                    event
                        .egress_info
                        .as_ref()
                        .map(|egress| egress.room_name.clone())
                })
                .filter(|name| !name.is_empty()),
            egress: event.egress_info.map(crate::livekit::egress_from_proto),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn unknown_event_names_are_preserved() {
        let kind = WebhookKind::from_event_name("track_published");

        assert_eq!(kind, WebhookKind::Other("track_published".into()));
        assert_eq!(kind.as_event_name(), "track_published");
    }

    #[test]
    fn event_names_round_trip() {
        for name in [
            "room_started",
            "room_finished",
            "egress_started",
            "egress_updated",
            "egress_ended",
        ] {
            assert_eq!(WebhookKind::from_event_name(name).as_event_name(), name);
        }
    }
}
