// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Scriptable in-memory media adapter for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use ovmeet_types::{recordings::EgressId, rooms::RoomId};
use parking_lot::Mutex;

use crate::{
    MediaError, Result,
    adapter::{
        CreateRoomParams, EgressDescriptor, EgressState, FileOutputParams, MediaAdapter,
        MediaParticipant, MediaRoom,
    },
};

#[derive(Default)]
struct MockRoom {
    participants: Vec<MediaParticipant>,
    metadata: String,
}

#[derive(Default)]
struct State {
    rooms: HashMap<String, MockRoom>,
    egresses: HashMap<String, EgressDescriptor>,
    next_egress: u32,
    removed_participants: Vec<(String, String)>,
    deleted_rooms: Vec<String>,
    sent_data: Vec<(String, String)>,
    fail_next: Option<MediaError>,
}

/// [`MediaAdapter`] double recording calls against scripted media state.
#[derive(Default)]
pub struct MockMediaAdapter {
    state: Mutex<State>,
}

impl MockMediaAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a live media room with the given participant identities.
    pub fn add_room(&self, room_id: &RoomId, identities: &[&str]) {
        let _ = self.state.lock().rooms.insert(
            room_id.to_string(),
            MockRoom {
                participants: identities
                    .iter()
                    .map(|identity| MediaParticipant {
                        identity: (*identity).to_owned(),
                        name: (*identity).to_owned(),
                        metadata: String::new(),
                    })
                    .collect(),
                metadata: String::new(),
            },
        );
    }

    /// Drop a room, simulating the media server finishing it.
    pub fn finish_room(&self, room_id: &RoomId) {
        let _ = self.state.lock().rooms.remove(room_id.as_str());
    }

    /// Override the status of a scripted egress.
    pub fn set_egress_status(&self, egress_id: &EgressId, status: EgressState) {
        if let Some(egress) = self.state.lock().egresses.get_mut(egress_id.as_str()) {
            egress.status = status;
        }
    }

    /// Script an egress that was not started through this adapter.
    pub fn insert_egress(&self, egress: EgressDescriptor) {
        let _ = self
            .state
            .lock()
            .egresses
            .insert(egress.egress_id.to_string(), egress);
    }

    /// Make the next adapter call fail with `error`.
    pub fn fail_next(&self, error: MediaError) {
        self.state.lock().fail_next = Some(error);
    }

    pub fn removed_participants(&self) -> Vec<(String, String)> {
        self.state.lock().removed_participants.clone()
    }

    pub fn deleted_rooms(&self) -> Vec<String> {
        self.state.lock().deleted_rooms.clone()
    }

    pub fn started_egresses(&self) -> Vec<EgressDescriptor> {
        self.state.lock().egresses.values().cloned().collect()
    }

    fn take_failure(state: &mut State) -> Result<()> {
        match state.fail_next.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MediaAdapter for MockMediaAdapter {
    async fn create_room(&self, room_id: &RoomId, params: CreateRoomParams) -> Result<MediaRoom> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        let room = state.rooms.entry(room_id.to_string()).or_default();
        room.metadata = params.metadata.clone();

        Ok(MediaRoom {
            name: room_id.to_string(),
            num_participants: room.participants.len() as u32,
            metadata: room.metadata.clone(),
        })
    }

    async fn delete_room(&self, room_id: &RoomId) -> Result<()> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        let _ = state.rooms.remove(room_id.as_str());
        state.deleted_rooms.push(room_id.to_string());

        Ok(())
    }

    async fn list_rooms(&self) -> Result<Vec<MediaRoom>> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        Ok(state
            .rooms
            .iter()
            .map(|(name, room)| MediaRoom {
                name: name.clone(),
                num_participants: room.participants.len() as u32,
                metadata: room.metadata.clone(),
            })
            .collect())
    }

    async fn room_exists(&self, room_id: &RoomId) -> Result<bool> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        Ok(state.rooms.contains_key(room_id.as_str()))
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<MediaRoom> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        let room = state.rooms.get(room_id.as_str()).ok_or(MediaError::NotFound)?;

        Ok(MediaRoom {
            name: room_id.to_string(),
            num_participants: room.participants.len() as u32,
            metadata: room.metadata.clone(),
        })
    }

    async fn get_participant(
        &self,
        room_id: &RoomId,
        identity: &str,
    ) -> Result<MediaParticipant> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        state
            .rooms
            .get(room_id.as_str())
            .and_then(|room| {
                room.participants
                    .iter()
                    .find(|p| p.identity == identity)
                    .cloned()
            })
            .ok_or(MediaError::NotFound)
    }

    async fn remove_participant(&self, room_id: &RoomId, identity: &str) -> Result<()> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        let room = state
            .rooms
            .get_mut(room_id.as_str())
            .ok_or(MediaError::NotFound)?;
        room.participants.retain(|p| p.identity != identity);

        state
            .removed_participants
            .push((room_id.to_string(), identity.to_owned()));

        Ok(())
    }

    async fn update_participant_metadata(
        &self,
        room_id: &RoomId,
        identity: &str,
        metadata: String,
    ) -> Result<()> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        let room = state
            .rooms
            .get_mut(room_id.as_str())
            .ok_or(MediaError::NotFound)?;
        let participant = room
            .participants
            .iter_mut()
            .find(|p| p.identity == identity)
            .ok_or(MediaError::NotFound)?;

        participant.metadata = metadata;

        Ok(())
    }

    async fn send_data(
        &self,
        room_id: &RoomId,
        _payload: Vec<u8>,
        topic: String,
        _destinations: Vec<String>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        if !state.rooms.contains_key(room_id.as_str()) {
            return Err(MediaError::NotFound);
        }

        state.sent_data.push((room_id.to_string(), topic));

        Ok(())
    }

    async fn start_room_composite(
        &self,
        room_id: &RoomId,
        _output: FileOutputParams,
    ) -> Result<EgressDescriptor> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        if !state.rooms.contains_key(room_id.as_str()) {
            return Err(MediaError::NotFound);
        }

        state.next_egress += 1;
        let egress = EgressDescriptor {
            egress_id: EgressId::from(format!("eg{}", state.next_egress)),
            room_name: room_id.to_string(),
            status: EgressState::Starting,
            size: 0,
            duration_secs: 0,
            error: None,
        };

        let _ = state
            .egresses
            .insert(egress.egress_id.to_string(), egress.clone());

        Ok(egress)
    }

    async fn stop_egress(&self, egress_id: &EgressId) -> Result<EgressDescriptor> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        let egress = state
            .egresses
            .get_mut(egress_id.as_str())
            .ok_or(MediaError::NotFound)?;

        egress.status = EgressState::Ending;

        Ok(egress.clone())
    }

    async fn get_egress(
        &self,
        room_id: &RoomId,
        egress_id: &EgressId,
    ) -> Result<EgressDescriptor> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        state
            .egresses
            .get(egress_id.as_str())
            .filter(|egress| egress.room_name == room_id.as_str())
            .cloned()
            .ok_or(MediaError::NotFound)
    }

    async fn get_active_egress(&self, room_id: &RoomId) -> Result<Vec<EgressDescriptor>> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        Ok(state
            .egresses
            .values()
            .filter(|egress| {
                egress.room_name == room_id.as_str() && egress.status.is_in_progress()
            })
            .cloned()
            .collect())
    }
}
