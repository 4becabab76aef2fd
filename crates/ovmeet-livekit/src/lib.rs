// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Thin, failure-typed facade over the LiveKit media server.
//!
//! Every call returns either the typed result or one of the four
//! [`MediaError`] kinds. Callers may retry only
//! [`MediaError::Unavailable`], which [`with_backoff`] does with bounded
//! exponential backoff; `NotFound` and `Conflict` are never retried.

use std::{future::Future, time::Duration};

use snafu::Snafu;

mod adapter;
mod livekit;
#[cfg(feature = "mocking")]
mod mock;
mod webhooks;

pub use adapter::{
    CreateRoomParams, EgressDescriptor, EgressState, FileOutputParams, MediaAdapter,
    MediaParticipant, MediaRoom,
};
pub use livekit::LiveKitAdapter;
#[cfg(feature = "mocking")]
pub use mock::MockMediaAdapter;
pub use webhooks::{MediaWebhook, WebhookKind, WebhookVerifier, WebhookVerifyError};

pub type Result<T, E = MediaError> = std::result::Result<T, E>;

#[derive(Debug, Clone, Snafu, PartialEq, Eq)]
pub enum MediaError {
    /// The referenced room, participant or egress does not exist.
    #[snafu(display("Resource not found on the media server"))]
    NotFound,

    /// The request conflicts with the media server state.
    #[snafu(display("Conflicting state on the media server"))]
    Conflict,

    /// Transport-level failure; the only retryable kind.
    #[snafu(display("Media server unavailable: {message}"))]
    Unavailable { message: String },

    #[snafu(display("Media server error: {message}"))]
    Internal { message: String },
}

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(2);

/// Run `op`, retrying [`MediaError::Unavailable`] results with bounded
/// exponential backoff (3 attempts, 200 ms base, 2 s cap).
pub async fn with_backoff<T, F, Fut>(mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = RETRY_BASE_DELAY;

    for attempt in 1..=RETRY_ATTEMPTS {
        match op().await {
            Err(MediaError::Unavailable { message }) if attempt < RETRY_ATTEMPTS => {
                log::debug!(
                    "Media server unavailable (attempt {attempt}/{RETRY_ATTEMPTS}), \
                     retrying in {delay:?}: {message}"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(RETRY_MAX_DELAY);
            }
            other => return other,
        }
    }

    unreachable!("loop returns on the last attempt")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn unavailable_is_retried_up_to_three_times() {
        let calls = AtomicU32::new(0);

        let result: Result<()> = with_backoff(|| {
            let _ = calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(MediaError::Unavailable {
                    message: "connection refused".into(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(MediaError::Unavailable { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn conflict_is_never_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<()> = with_backoff(|| {
            let _ = calls.fetch_add(1, Ordering::SeqCst);
            async { Err(MediaError::Conflict) }
        })
        .await;

        assert_eq!(result, Err(MediaError::Conflict));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn success_after_transient_failure() {
        let calls = AtomicU32::new(0);

        let result = with_backoff(|| {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(MediaError::Unavailable {
                        message: "timeout".into(),
                    })
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
