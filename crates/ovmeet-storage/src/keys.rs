// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Builders for the persisted object-store layout.
//!
//! Layout:
//! - rooms under `rooms/{roomId}`
//! - members under `rooms/{roomId}/members/{memberId}`
//! - recording metadata under `recordings/.metadata/{roomId}/{egressId}/{uid}.json`
//! - recording media at `recordings/{roomId}/{roomId}--{uid}.{ext}`
//! - the per-room secrets manifest at `recordings/.metadata/{roomId}/.secrets.json`
//! - users under `users/{userId}`
//! - global config under `.config/global.json`, the API key under
//!   `.config/api_key.json`

use ovmeet_types::{
    members::MemberId,
    recordings::RecordingId,
    rooms::RoomId,
    users::UserId,
};

/// A typed object-store key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn room(room_id: &RoomId) -> Self {
        Self(format!("rooms/{room_id}"))
    }

    /// Prefix under which all room documents live. Listing with the `/`
    /// delimiter keeps member documents out of the result.
    pub fn rooms_prefix() -> Self {
        Self("rooms/".to_owned())
    }

    pub fn member(room_id: &RoomId, member_id: &MemberId) -> Self {
        Self(format!("rooms/{room_id}/members/{member_id}"))
    }

    pub fn members_prefix(room_id: &RoomId) -> Self {
        Self(format!("rooms/{room_id}/members/"))
    }

    pub fn recording_metadata(recording_id: &RecordingId) -> Self {
        Self(format!(
            "recordings/.metadata/{}/{}/{}.json",
            recording_id.room_id, recording_id.egress_id, recording_id.uid
        ))
    }

    pub fn recordings_metadata_prefix() -> Self {
        Self("recordings/.metadata/".to_owned())
    }

    pub fn room_recordings_metadata_prefix(room_id: &RoomId) -> Self {
        Self(format!("recordings/.metadata/{room_id}/"))
    }

    pub fn recording_media(recording_id: &RecordingId, extension: &str) -> Self {
        Self(format!(
            "recordings/{}/{}--{}.{}",
            recording_id.room_id, recording_id.room_id, recording_id.uid, extension
        ))
    }

    pub fn room_secrets(room_id: &RoomId) -> Self {
        Self(format!("recordings/.metadata/{room_id}/.secrets.json"))
    }

    pub fn user(user_id: &UserId) -> Self {
        Self(format!("users/{user_id}"))
    }

    pub fn global_config() -> Self {
        Self(".config/global.json".to_owned())
    }

    pub fn api_key() -> Self {
        Self(".config/api_key.json".to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn layout_matches_the_persisted_scheme() {
        let room = RoomId::parse("demo-1234").unwrap();
        let member = MemberId::external("a1b2");
        let recording = RecordingId::parse("demo-1234--eg_1--u9").unwrap();

        assert_eq!(ObjectKey::room(&room).as_str(), "rooms/demo-1234");
        assert_eq!(
            ObjectKey::member(&room, &member).as_str(),
            "rooms/demo-1234/members/ext-a1b2"
        );
        assert_eq!(
            ObjectKey::recording_metadata(&recording).as_str(),
            "recordings/.metadata/demo-1234/eg_1/u9.json"
        );
        assert_eq!(
            ObjectKey::recording_media(&recording, "mp4").as_str(),
            "recordings/demo-1234/demo-1234--u9.mp4"
        );
        assert_eq!(
            ObjectKey::room_secrets(&room).as_str(),
            "recordings/.metadata/demo-1234/.secrets.json"
        );
        assert_eq!(ObjectKey::global_config().as_str(), ".config/global.json");
    }
}
