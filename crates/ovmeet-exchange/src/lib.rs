// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Controller to controller messaging and the local event bus.
//!
//! Two tiers: the [`EventBus`] dispatches [`SystemEvent`]s to listeners
//! registered in the emitting replica, while the exchange carries
//! published events through a process-wide broadcast channel that is
//! mirrored onto a RabbitMQ fanout exchange when replicas are clustered.
//! Without RabbitMQ the exchange stays process-local.

mod bus;
mod events;
mod task;

pub use bus::{EventBus, HandlerId, WaitError};
pub use events::{SystemEvent, Topic};
pub use task::{ExchangeError, ExchangeHandle, ExchangeTask, PublishError, SubscriberHandle};
