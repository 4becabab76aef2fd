// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Cross-replica event fan-out.
//!
//! Events flow through a process-wide [`tokio::sync::broadcast`] channel;
//! subscribers filter it by topic. With RabbitMQ configured, two small
//! background tasks mirror that channel onto a fanout exchange: one
//! forwards published events to the broker, one feeds remote deliveries
//! back in. Either tier is best-effort; a lagging subscriber or an
//! unreachable broker drops events instead of blocking publishers.

use std::{str::FromStr as _, sync::Arc, time::Duration};

use bytestring::ByteString;
use lapin::{
    BasicProperties, Consumer, ExchangeKind,
    options::{
        BasicConsumeOptions, BasicPublishOptions, ExchangeDeclareOptions, QueueBindOptions,
        QueueDeclareOptions,
    },
    types::FieldTable,
};
use lapin_pool::{RabbitMqChannel, RabbitMqPool};
use serde::{Deserialize, Serialize};
use snafu::Snafu;
use tokio::{
    sync::{broadcast, mpsc},
    time::sleep,
};
use tokio_stream::StreamExt as _;
use uuid::Uuid;

use crate::Topic;

#[derive(Debug, Snafu)]
pub enum ExchangeError {
    #[snafu(display("failed to open channel"), context(false))]
    CreateChannel { source: lapin_pool::Error },

    #[snafu(display("failed to set up the exchange"), context(false))]
    Setup { source: lapin::Error },
}

#[derive(Debug, Snafu)]
#[snafu(display("Cannot publish event. The RabbitMQ forwarder is gone"))]
pub struct PublishError;

const EXCHANGE: &str = "ovmeet_controller";

/// Events a slow subscriber may fall behind before it starts losing them.
const LOCAL_BUFFER: usize = 256;

/// Pause between attempts to re-attach a lost broker connection.
const REATTACH_DELAY: Duration = Duration::from_secs(1);

/// An event as it travels through the local broadcast channel.
#[derive(Debug, Clone)]
struct Envelope {
    topic: Topic,
    data: ByteString,
}

/// Wire format of an event forwarded to the other replicas.
#[derive(Serialize)]
struct FrameRef<'e> {
    sender: Uuid,
    topic: &'e str,
    data: &'e str,
}

#[derive(Deserialize)]
struct Frame {
    sender: Uuid,
    topic: String,
    data: String,
}

/// Constructors for the exchange; see [`ExchangeHandle`] for the API.
pub struct ExchangeTask;

impl ExchangeTask {
    /// Process-local exchange without cross-replica fan-out.
    pub fn spawn() -> ExchangeHandle {
        let (local, _) = broadcast::channel(LOCAL_BUFFER);

        ExchangeHandle {
            local,
            forwarder: None,
        }
    }

    /// Exchange with RabbitMQ fan-out to the other replicas.
    pub async fn spawn_with_rabbitmq(
        pool: Arc<RabbitMqPool>,
    ) -> Result<ExchangeHandle, ExchangeError> {
        let (local, _) = broadcast::channel(LOCAL_BUFFER);
        let replica = Uuid::new_v4();

        let (frames, frame_queue) = mpsc::unbounded_channel();
        let (channel, consumer) = attach(&pool).await?;

        tokio::spawn(forward_frames(pool.clone(), channel, frame_queue));
        tokio::spawn(pump_deliveries(pool, consumer, replica, local.clone()));

        Ok(ExchangeHandle {
            local,
            forwarder: Some(Forwarder { frames, replica }),
        })
    }
}

#[derive(Clone)]
struct Forwarder {
    frames: mpsc::UnboundedSender<String>,
    replica: Uuid,
}

/// Publishes events and creates topic subscriptions.
#[derive(Clone)]
pub struct ExchangeHandle {
    local: broadcast::Sender<Envelope>,
    forwarder: Option<Forwarder>,
}

impl ExchangeHandle {
    /// Subscribe to all events published under the given `topics`.
    ///
    /// Only events published after this call are observed.
    pub fn create_subscriber(&self, topics: &[Topic]) -> SubscriberHandle {
        SubscriberHandle {
            topics: topics.to_vec(),
            receiver: self.local.subscribe(),
        }
    }

    /// Publish an event to every replica, including this one.
    pub fn publish(&self, topic: Topic, data: impl Into<String>) -> Result<(), PublishError> {
        let data = ByteString::from(data.into());

        // Local delivery; an error here only means nobody subscribed
        let _ = self.local.send(Envelope {
            topic,
            data: data.clone(),
        });

        if let Some(forwarder) = &self.forwarder {
            let frame = serde_json::to_string(&FrameRef {
                sender: forwarder.replica,
                topic: topic.as_ref(),
                data: &data,
            })
            .expect("event frame serialization cannot fail");

            forwarder.frames.send(frame).map_err(|_| PublishError)?;
        }

        Ok(())
    }
}

/// A topic-filtered subscription on the exchange.
pub struct SubscriberHandle {
    topics: Vec<Topic>,
    receiver: broadcast::Receiver<Envelope>,
}

impl SubscriberHandle {
    /// Receive the next event payload under one of the subscribed topics.
    ///
    /// Returns `None` when the exchange is gone. A subscriber that fell
    /// more than [`LOCAL_BUFFER`] events behind loses the overwritten
    /// events and continues with the live stream.
    pub async fn receive(&mut self) -> Option<ByteString> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) if self.topics.contains(&envelope.topic) => {
                    return Some(envelope.data);
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Subscriber lagged behind, {skipped} events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Declare the fanout exchange and bind a private, broker-named queue.
///
/// The queue is exclusive and auto-deleted, so it disappears together
/// with this replica's connection.
async fn attach(pool: &RabbitMqPool) -> Result<(RabbitMqChannel, Consumer), ExchangeError> {
    let channel = pool.create_channel().await?;

    channel
        .exchange_declare(
            EXCHANGE,
            ExchangeKind::Fanout,
            ExchangeDeclareOptions::default(),
            FieldTable::default(),
        )
        .await?;

    let queue = channel
        .queue_declare(
            "",
            QueueDeclareOptions {
                exclusive: true,
                auto_delete: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    channel
        .queue_bind(
            queue.name().as_str(),
            EXCHANGE,
            "",
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await?;

    let consumer = channel
        .basic_consume(
            queue.name().as_str(),
            "",
            BasicConsumeOptions {
                no_ack: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    Ok((channel, consumer))
}

/// Forward published frames to the broker.
///
/// A failed publish gets one retry on a fresh channel; after that the
/// frame is dropped. Remote fan-out is at-most-once, local subscribers
/// already received the event.
async fn forward_frames(
    pool: Arc<RabbitMqPool>,
    mut channel: RabbitMqChannel,
    mut frames: mpsc::UnboundedReceiver<String>,
) {
    while let Some(frame) = frames.recv().await {
        if publish_frame(&channel, &frame).await.is_ok() {
            continue;
        }

        match pool.create_channel().await {
            Ok(fresh) => {
                channel = fresh;
                if let Err(e) = publish_frame(&channel, &frame).await {
                    log::warn!("Dropping event after failed re-publish: {e}");
                }
            }
            Err(e) => {
                log::warn!("Dropping event, RabbitMQ is unreachable: {e}");
            }
        }
    }
}

async fn publish_frame(channel: &RabbitMqChannel, frame: &str) -> Result<(), lapin::Error> {
    let _ = channel
        .basic_publish(
            EXCHANGE,
            "",
            BasicPublishOptions::default(),
            frame.as_bytes(),
            BasicProperties::default(),
        )
        .await?;

    Ok(())
}

/// Feed remote deliveries into the local broadcast channel.
///
/// When the consumer stream ends the task re-attaches to the broker,
/// pausing [`REATTACH_DELAY`] between attempts. Events published by other
/// replicas while detached are lost; delivery is best-effort at-most-once.
async fn pump_deliveries(
    pool: Arc<RabbitMqPool>,
    mut consumer: Consumer,
    replica: Uuid,
    local: broadcast::Sender<Envelope>,
) {
    loop {
        match consumer.next().await {
            Some(Ok(delivery)) => deliver(&delivery.data, replica, &local),
            Some(Err(e)) => {
                log::warn!("RabbitMQ consumer error: {e}");
            }
            None => {
                log::error!("Lost the RabbitMQ consumer, re-attaching");

                loop {
                    sleep(REATTACH_DELAY).await;

                    match attach(&pool).await {
                        Ok((_, fresh)) => {
                            consumer = fresh;
                            log::info!("Re-attached to the RabbitMQ exchange");
                            break;
                        }
                        Err(e) => log::warn!("RabbitMQ re-attach failed: {e}"),
                    }
                }
            }
        }
    }
}

fn deliver(raw: &[u8], replica: Uuid, local: &broadcast::Sender<Envelope>) {
    let frame: Frame = match serde_json::from_slice(raw) {
        Ok(frame) => frame,
        Err(e) => {
            log::warn!("Dropping malformed frame from RabbitMQ: {e}");
            return;
        }
    };

    // Our own frames were delivered locally at publish time
    if frame.sender == replica {
        return;
    }

    let Ok(topic) = Topic::from_str(&frame.topic) else {
        log::debug!("Dropping frame with unknown topic {}", frame.topic);
        return;
    };

    let _ = local.send(Envelope {
        topic,
        data: ByteString::from(frame.data),
    });
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn subscribers_only_see_their_topics() {
        let handle = ExchangeTask::spawn();

        let mut recording = handle.create_subscriber(&[Topic::RecordingActive]);
        let mut meetings = handle.create_subscriber(&[Topic::MeetingEnded]);

        handle.publish(Topic::RecordingActive, "payload").unwrap();
        handle.publish(Topic::MeetingEnded, "done").unwrap();

        assert_eq!(recording.receive().await.unwrap(), "payload");
        assert_eq!(meetings.receive().await.unwrap(), "done");
    }

    #[tokio::test]
    async fn late_subscribers_miss_earlier_events() {
        let handle = ExchangeTask::spawn();

        // Keep the channel alive while publishing
        let _early = handle.create_subscriber(&[Topic::StorageReady]);

        handle.publish(Topic::StorageReady, "first").unwrap();

        let mut late = handle.create_subscriber(&[Topic::StorageReady]);
        handle.publish(Topic::StorageReady, "second").unwrap();

        assert_eq!(late.receive().await.unwrap(), "second");
    }

    #[tokio::test]
    async fn dropped_subscribers_do_not_break_publishing() {
        let handle = ExchangeTask::spawn();

        let subscriber = handle.create_subscriber(&[Topic::StorageReady]);
        drop(subscriber);

        handle.publish(Topic::StorageReady, "{}").unwrap();
    }

    #[test]
    fn frames_round_trip_with_topic_names() {
        let frame = serde_json::to_string(&FrameRef {
            sender: Uuid::nil(),
            topic: Topic::RecordingActive.as_ref(),
            data: "{}",
        })
        .unwrap();

        let parsed: Frame = serde_json::from_str(&frame).unwrap();

        assert_eq!(parsed.sender, Uuid::nil());
        assert_eq!(Topic::from_str(&parsed.topic), Ok(Topic::RecordingActive));
        assert_eq!(parsed.data, "{}");
    }
}
