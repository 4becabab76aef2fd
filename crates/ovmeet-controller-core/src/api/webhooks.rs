// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Webhook ingress from the media server.

use actix_web::{HttpRequest, HttpResponse, post, web::Data};
use ovmeet_livekit::WebhookVerifier;
use ovmeet_service::WebhookSink;
use ovmeet_types::api::error::ApiError;

/// Receive a webhook delivery.
///
/// Returns 200 on success and for idempotent duplicates, 401 on signature
/// mismatch. Processing failures are logged and acknowledged so the media
/// server does not enter a retry storm.
#[post("/webhooks/livekit")]
pub async fn receive(
    verifier: Data<WebhookVerifier>,
    sink: Data<WebhookSink>,
    request: HttpRequest,
    body: String,
) -> Result<HttpResponse, ApiError> {
    let auth_token = request
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized().with_message("Missing webhook signature"))?;

    let webhook = verifier.verify(&body, auth_token).map_err(|e| {
        log::warn!("Rejected webhook delivery: {e}");
        ApiError::unauthorized().with_message("Invalid webhook signature")
    })?;

    sink.process(&webhook).await?;

    Ok(HttpResponse::Ok().finish())
}
