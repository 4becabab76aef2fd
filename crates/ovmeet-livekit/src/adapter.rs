// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use async_trait::async_trait;
use ovmeet_types::{recordings::EgressId, rooms::RoomId};

use crate::Result;

/// Options for creating a media room.
#[derive(Debug, Clone, Default)]
pub struct CreateRoomParams {
    /// Seconds an empty room stays alive before the media server closes it.
    pub empty_timeout: u32,
    pub max_participants: u32,
    pub metadata: String,
}

/// A room as reported by the media server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRoom {
    pub name: String,
    pub num_participants: u32,
    pub metadata: String,
}

/// A participant as reported by the media server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaParticipant {
    pub identity: String,
    pub name: String,
    pub metadata: String,
}

/// File output of a room composite egress.
#[derive(Debug, Clone)]
pub struct FileOutputParams {
    /// Object-store key the media server writes the file to.
    pub filepath: String,
    /// Layout preset passed to the compositor.
    pub layout: String,
    pub audio_only: bool,
}

/// State of an egress pipeline instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EgressState {
    Starting,
    Active,
    Ending,
    Complete,
    Failed,
    Aborted,
}

impl EgressState {
    pub fn is_in_progress(self) -> bool {
        matches!(self, Self::Starting | Self::Active | Self::Ending)
    }
}

/// An egress instance as reported by the media server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EgressDescriptor {
    pub egress_id: EgressId,
    pub room_name: String,
    pub status: EgressState,
    /// Size of the produced file in bytes, when known.
    pub size: u64,
    /// Duration of the produced file in seconds, when known.
    pub duration_secs: u64,
    pub error: Option<String>,
}

/// Abstract operations over the media server.
///
/// A narrow interface consumed by the room and recording services alike;
/// the services do not know each other, cross-service workflows go through
/// the event bus.
#[async_trait]
pub trait MediaAdapter: Send + Sync {
    async fn create_room(&self, room_id: &RoomId, params: CreateRoomParams) -> Result<MediaRoom>;

    async fn delete_room(&self, room_id: &RoomId) -> Result<()>;

    async fn list_rooms(&self) -> Result<Vec<MediaRoom>>;

    async fn room_exists(&self, room_id: &RoomId) -> Result<bool>;

    async fn get_room(&self, room_id: &RoomId) -> Result<MediaRoom>;

    async fn get_participant(&self, room_id: &RoomId, identity: &str)
    -> Result<MediaParticipant>;

    async fn remove_participant(&self, room_id: &RoomId, identity: &str) -> Result<()>;

    async fn update_participant_metadata(
        &self,
        room_id: &RoomId,
        identity: &str,
        metadata: String,
    ) -> Result<()>;

    /// Send a data message into the room, to everyone or to
    /// `destinations` identities only.
    async fn send_data(
        &self,
        room_id: &RoomId,
        payload: Vec<u8>,
        topic: String,
        destinations: Vec<String>,
    ) -> Result<()>;

    async fn start_room_composite(
        &self,
        room_id: &RoomId,
        output: FileOutputParams,
    ) -> Result<EgressDescriptor>;

    async fn stop_egress(&self, egress_id: &EgressId) -> Result<EgressDescriptor>;

    async fn get_egress(
        &self,
        room_id: &RoomId,
        egress_id: &EgressId,
    ) -> Result<EgressDescriptor>;

    /// All egress instances of the room the media server reports as
    /// currently running.
    async fn get_active_egress(&self, room_id: &RoomId) -> Result<Vec<EgressDescriptor>>;

    /// The subset of active egresses that are recording pipelines still in
    /// progress.
    async fn in_progress_recordings(&self, room_id: &RoomId) -> Result<Vec<EgressDescriptor>> {
        let egresses = self.get_active_egress(room_id).await?;

        Ok(egresses
            .into_iter()
            .filter(|egress| egress.status.is_in_progress())
            .collect())
    }
}
