// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use async_trait::async_trait;
use livekit_api::services::{
    ServiceError,
    egress::{EgressClient, EgressListFilter, EgressListOptions, EgressOutput, RoomCompositeOptions},
    room::{CreateRoomOptions, RoomClient, SendDataOptions, UpdateParticipantOptions},
};
use livekit_protocol as proto;
use ovmeet_settings::{LiveKit, MinIO};
use ovmeet_types::{recordings::EgressId, rooms::RoomId};

use crate::{
    MediaError, Result,
    adapter::{
        CreateRoomParams, EgressDescriptor, EgressState, FileOutputParams, MediaAdapter,
        MediaParticipant, MediaRoom,
    },
    with_backoff,
};

/// [`MediaAdapter`] implementation over the LiveKit server APIs.
pub struct LiveKitAdapter {
    room_client: RoomClient,
    egress_client: EgressClient,
    minio: MinIO,
}

impl LiveKitAdapter {
    pub fn new(livekit: &LiveKit, minio: MinIO) -> Self {
        let room_client =
            RoomClient::with_api_key(&livekit.service_url, &livekit.api_key, &livekit.api_secret);
        let egress_client =
            EgressClient::with_api_key(&livekit.service_url, &livekit.api_key, &livekit.api_secret);

        Self {
            room_client,
            egress_client,
            minio,
        }
    }

    fn s3_upload(&self) -> proto::S3Upload {
        proto::S3Upload {
            access_key: self.minio.access_key.clone(),
            secret: self.minio.secret_key.clone(),
            endpoint: self.minio.uri.clone(),
            bucket: self.minio.bucket.clone(),
            force_path_style: true,
            ..Default::default()
        }
    }
}

/// Classify a LiveKit service error into the adapter error kinds.
///
/// LiveKit does not expose its twirp error variants as matchable types, so
/// the classification falls back to the rendered error text.
fn classify(err: ServiceError) -> MediaError {
    let text = err.to_string();
    let lowered = text.to_lowercase();

    if lowered.contains("not_found") || lowered.contains("not found") || lowered.contains("404") {
        MediaError::NotFound
    } else if lowered.contains("already_exists")
        || lowered.contains("failed_precondition")
        || lowered.contains("409")
        || lowered.contains("412")
    {
        MediaError::Conflict
    } else if lowered.contains("unavailable")
        || lowered.contains("timeout")
        || lowered.contains("timed out")
        || lowered.contains("connect")
        || lowered.contains("502")
        || lowered.contains("503")
    {
        MediaError::Unavailable { message: text }
    } else {
        MediaError::Internal { message: text }
    }
}

fn room_from_proto(room: proto::Room) -> MediaRoom {
    MediaRoom {
        name: room.name,
        num_participants: room.num_participants,
        metadata: room.metadata,
    }
}

fn participant_from_proto(participant: proto::ParticipantInfo) -> MediaParticipant {
    MediaParticipant {
        identity: participant.identity,
        name: participant.name,
        metadata: participant.metadata,
    }
}

pub(crate) fn egress_from_proto(info: proto::EgressInfo) -> EgressDescriptor {
    let status = match proto::EgressStatus::try_from(info.status) {
        Ok(proto::EgressStatus::EgressStarting) => EgressState::Starting,
        Ok(proto::EgressStatus::EgressActive) => EgressState::Active,
        Ok(proto::EgressStatus::EgressEnding) => EgressState::Ending,
        Ok(proto::EgressStatus::EgressComplete) => EgressState::Complete,
        Ok(proto::EgressStatus::EgressAborted) => EgressState::Aborted,
        Ok(proto::EgressStatus::EgressFailed) | Ok(proto::EgressStatus::EgressLimitReached) => {
            EgressState::Failed
        }
        Err(_) => EgressState::Failed,
    };

    let file = info.file_results.first();

    EgressDescriptor {
        egress_id: EgressId::from(info.egress_id),
        room_name: info.room_name,
        status,
        size: file.map(|f| f.size.max(0) as u64).unwrap_or(0),
        duration_secs: file
            .map(|f| (f.duration.max(0) as u64) / 1_000_000_000)
            .unwrap_or(0),
        error: (!info.error.is_empty()).then(|| info.error.clone()),
    }
}

#[async_trait]
impl MediaAdapter for LiveKitAdapter {
    async fn create_room(&self, room_id: &RoomId, params: CreateRoomParams) -> Result<MediaRoom> {
        let room = with_backoff(|| async {
            self.room_client
                .create_room(
                    room_id.as_str(),
                    CreateRoomOptions {
                        empty_timeout: params.empty_timeout,
                        max_participants: params.max_participants,
                        metadata: params.metadata.clone(),
                        ..Default::default()
                    },
                )
                .await
                .map_err(classify)
        })
        .await?;

        Ok(room_from_proto(room))
    }

    async fn delete_room(&self, room_id: &RoomId) -> Result<()> {
        with_backoff(|| async {
            self.room_client
                .delete_room(room_id.as_str())
                .await
                .map_err(classify)
        })
        .await
    }

    async fn list_rooms(&self) -> Result<Vec<MediaRoom>> {
        let rooms = with_backoff(|| async {
            self.room_client.list_rooms(Vec::new()).await.map_err(classify)
        })
        .await?;

        Ok(rooms.into_iter().map(room_from_proto).collect())
    }

    async fn room_exists(&self, room_id: &RoomId) -> Result<bool> {
        let rooms = with_backoff(|| async {
            self.room_client
                .list_rooms(vec![room_id.to_string()])
                .await
                .map_err(classify)
        })
        .await?;

        Ok(!rooms.is_empty())
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<MediaRoom> {
        let rooms = with_backoff(|| async {
            self.room_client
                .list_rooms(vec![room_id.to_string()])
                .await
                .map_err(classify)
        })
        .await?;

        rooms
            .into_iter()
            .next()
            .map(room_from_proto)
            .ok_or(MediaError::NotFound)
    }

    async fn get_participant(
        &self,
        room_id: &RoomId,
        identity: &str,
    ) -> Result<MediaParticipant> {
        let participant = with_backoff(|| async {
            self.room_client
                .get_participant(room_id.as_str(), identity)
                .await
                .map_err(classify)
        })
        .await?;

        Ok(participant_from_proto(participant))
    }

    async fn remove_participant(&self, room_id: &RoomId, identity: &str) -> Result<()> {
        with_backoff(|| async {
            self.room_client
                .remove_participant(room_id.as_str(), identity)
                .await
                .map_err(classify)
        })
        .await
    }

    async fn update_participant_metadata(
        &self,
        room_id: &RoomId,
        identity: &str,
        metadata: String,
    ) -> Result<()> {
        let _ = with_backoff(|| async {
            self.room_client
                .update_participant(
                    room_id.as_str(),
                    identity,
                    UpdateParticipantOptions {
                        metadata: metadata.clone(),
                        ..Default::default()
                    },
                )
                .await
                .map_err(classify)
        })
        .await?;

        Ok(())
    }

    async fn send_data(
        &self,
        room_id: &RoomId,
        payload: Vec<u8>,
        topic: String,
        destinations: Vec<String>,
    ) -> Result<()> {
        with_backoff(|| async {
            self.room_client
                .send_data(
                    room_id.as_str(),
                    payload.clone(),
                    SendDataOptions {
                        topic: Some(topic.clone()),
                        destination_identities: destinations.clone(),
                        ..Default::default()
                    },
                )
                .await
                .map_err(classify)
        })
        .await
    }

    async fn start_room_composite(
        &self,
        room_id: &RoomId,
        output: FileOutputParams,
    ) -> Result<EgressDescriptor> {
        // Not wrapped in the retry helper: a timed-out request may still
        // have started an egress on the server side.
        let info = self
            .egress_client
            .start_room_composite_egress(
                room_id.as_str(),
                vec![EgressOutput::File(proto::EncodedFileOutput {
                    file_type: proto::EncodedFileType::Mp4 as i32,
                    filepath: output.filepath.clone(),
                    output: Some(proto::encoded_file_output::Output::S3(self.s3_upload())),
                    ..Default::default()
                })],
                RoomCompositeOptions {
                    layout: output.layout.clone(),
                    audio_only: output.audio_only,
                    ..Default::default()
                },
            )
            .await
            .map_err(classify)?;

        Ok(egress_from_proto(info))
    }

    async fn stop_egress(&self, egress_id: &EgressId) -> Result<EgressDescriptor> {
        let info = self
            .egress_client
            .stop_egress(egress_id.as_str())
            .await
            .map_err(classify)?;

        Ok(egress_from_proto(info))
    }

    async fn get_egress(
        &self,
        room_id: &RoomId,
        egress_id: &EgressId,
    ) -> Result<EgressDescriptor> {
        let infos = with_backoff(|| async {
            self.egress_client
                .list_egress(EgressListOptions {
                    filter: EgressListFilter::Room(room_id.to_string()),
                    active: false,
                })
                .await
                .map_err(classify)
        })
        .await?;

        infos
            .into_iter()
            .map(egress_from_proto)
            .find(|egress| &egress.egress_id == egress_id)
            .ok_or(MediaError::NotFound)
    }

    async fn get_active_egress(&self, room_id: &RoomId) -> Result<Vec<EgressDescriptor>> {
        let infos = with_backoff(|| async {
            self.egress_client
                .list_egress(EgressListOptions {
                    filter: EgressListFilter::Room(room_id.to_string()),
                    active: true,
                })
                .await
                .map_err(classify)
        })
        .await?;

        Ok(infos.into_iter().map(egress_from_proto).collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn egress_status_maps_to_state() {
        let info = proto::EgressInfo {
            egress_id: "EG_1".into(),
            room_name: "demo-1".into(),
            status: proto::EgressStatus::EgressActive as i32,
            ..Default::default()
        };

        let egress = egress_from_proto(info);

        assert_eq!(egress.status, EgressState::Active);
        assert!(egress.status.is_in_progress());
        assert_eq!(egress.error, None);
    }
}
