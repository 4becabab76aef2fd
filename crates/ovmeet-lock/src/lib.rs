// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Named, TTL'd distributed mutexes shared by all controller replicas.
//!
//! Locks live in redis as `SET NX PX` keys whose value carries the owning
//! replica, a random token and the acquisition timestamp. Release and renew
//! compare the token first, so a lock that expired and was re-acquired by
//! another replica can not be revoked by the previous owner.

use snafu::Snafu;

mod manager;
mod names;

pub use manager::{Lock, LockInfo, LockManager, MemoryLockManager, RedisLockManager};
pub use names::LockName;

pub type Result<T> = std::result::Result<T, LockError>;

#[derive(Debug, Snafu)]
pub enum LockError {
    /// The lock store is unreachable; callers treat this as "not acquired".
    #[snafu(display("Lock store unavailable: {message}"))]
    Unavailable { message: String },

    #[snafu(display("Lock metadata is corrupt: {message}"))]
    CorruptMetadata { message: String },
}

impl From<redis::RedisError> for LockError {
    fn from(source: redis::RedisError) -> Self {
        Self::Unavailable {
            message: source.to_string(),
        }
    }
}
