// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Request authentication middleware.
//!
//! Resolves the caller's credentials into an [`AuthContext`] stored in the
//! request extensions. The middleware itself never rejects a request;
//! handlers enforce the access level they need through the context.

use core::{
    future::{Future, Ready, ready},
    pin::Pin,
    task::{Context, Poll},
};
use std::rc::Rc;

use actix_http::{HttpMessage, header::Header as _};
use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    error::Error,
    web::Data,
};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};
use ovmeet_service::{AccessClaims, AuthService, MemberClaims};
use ovmeet_types::{
    api::error::{ApiError, AuthenticationError},
    rooms::RoomId,
    users::UserRole,
};
use serde::Deserialize;
use snafu::Report;

/// Header carrying the room member token.
pub const MEMBER_TOKEN_HEADER: &str = "X-OvMeet-Room-Member-Token";

/// Header carrying the management API key.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// The authenticated principal of a request.
#[derive(Debug, Clone)]
pub enum AuthContext {
    /// No (valid) credentials were presented.
    Anonymous,
    /// A user authenticated with an access token.
    User(AccessClaims),
    /// The management API key.
    ApiKey,
    /// A room member token.
    Member(MemberClaims),
}

impl AuthContext {
    /// Management access: a user account or the API key.
    ///
    /// A user that still has to change their password is locked out of
    /// everything but the password change itself.
    pub fn require_management(&self) -> Result<(), ApiError> {
        match self {
            Self::ApiKey => Ok(()),
            Self::User(claims) if claims.must_change_password => Err(ApiError::forbidden()
                .with_code("password_change_required")
                .with_message("The password must be changed before using the API")),
            Self::User(_) => Ok(()),
            Self::Member(_) => Err(ApiError::forbidden()),
            Self::Anonymous => Err(ApiError::unauthorized()
                .with_www_authenticate(AuthenticationError::InvalidAccessToken)),
        }
    }

    /// Administrator access: an admin account or the API key.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        self.require_management()?;

        match self {
            Self::ApiKey => Ok(()),
            Self::User(claims) if claims.role == UserRole::Admin => Ok(()),
            _ => Err(ApiError::forbidden()),
        }
    }

    /// The authenticated user, regardless of the password-change flag.
    pub fn require_user(&self) -> Result<&AccessClaims, ApiError> {
        match self {
            Self::User(claims) => Ok(claims),
            _ => Err(ApiError::unauthorized()
                .with_www_authenticate(AuthenticationError::InvalidAccessToken)),
        }
    }

    /// The member claims when the caller is a member of `room_id`.
    pub fn member_of(&self, room_id: &RoomId) -> Option<&MemberClaims> {
        match self {
            Self::Member(claims) if &claims.room_id == room_id => Some(claims),
            _ => None,
        }
    }

    /// Whether the caller has management access.
    pub fn is_management(&self) -> bool {
        self.require_management().is_ok()
    }
}

/// Token query parameters accepted on streaming endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenQuery {
    access_token: Option<String>,
    room_member_token: Option<String>,
}

/// Middleware factory for [`ApiAuthMiddleware`]
pub struct ApiAuth {
    auth: Data<AuthService>,
}

impl ApiAuth {
    pub fn new(auth: Data<AuthService>) -> Self {
        Self { auth }
    }
}

impl<S> Transform<S, ServiceRequest> for ApiAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse;
    type Error = Error;
    type Transform = ApiAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ApiAuthMiddleware {
            service: Rc::new(service),
            auth: self.auth.clone(),
        }))
    }
}

/// Middleware which resolves the request credentials into an
/// [`AuthContext`] for the handlers to inspect.
pub struct ApiAuthMiddleware<S> {
    service: Rc<S>,

    auth: Data<AuthService>,
}

type ResultFuture<O, E> = Pin<Box<dyn Future<Output = Result<O, E>>>>;

impl<S> Service<ServiceRequest> for ApiAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse;
    type Error = Error;
    type Future = ResultFuture<Self::Response, Self::Error>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let auth = self.auth.clone();

        Box::pin(async move {
            let context = resolve_context(&auth, &req).await;

            let _ = req.extensions_mut().insert(context);

            service.call(req).await
        })
    }
}

async fn resolve_context(auth: &AuthService, req: &ServiceRequest) -> AuthContext {
    let query: TokenQuery = serde_urlencoded::from_str(req.query_string()).unwrap_or_default();

    if let Some(candidate) = header_value(req, API_KEY_HEADER) {
        match auth.verify_api_key(&candidate).await {
            Ok(true) => return AuthContext::ApiKey,
            Ok(false) => {
                log::warn!("Request presented an unknown API key");
                return AuthContext::Anonymous;
            }
            Err(e) => {
                log::error!("API key verification failed: {e}");
                return AuthContext::Anonymous;
            }
        }
    }

    let member_token = header_value(req, MEMBER_TOKEN_HEADER)
        .map(|value| strip_bearer(&value).to_owned())
        .or(query.room_member_token);

    if let Some(token) = member_token {
        match auth.verify_member_token(&token).await {
            Ok(claims) => return AuthContext::Member(claims),
            Err(e) => {
                log::debug!("Rejected room member token: {e}");
                return AuthContext::Anonymous;
            }
        }
    }

    let access_token = Authorization::<Bearer>::parse(req)
        .ok()
        .map(|authorization| authorization.into_scheme().token().to_string())
        .or(query.access_token);

    if let Some(token) = access_token {
        match auth.token_service().verify_access(&token) {
            Ok(claims) => return AuthContext::User(claims),
            Err(e) => {
                log::debug!("Rejected access token, {}", Report::from_error(e));
                return AuthContext::Anonymous;
            }
        }
    }

    AuthContext::Anonymous
}

fn header_value(req: &ServiceRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(ToOwned::to_owned)
}

fn strip_bearer(value: &str) -> &str {
    value
        .strip_prefix("Bearer ")
        .unwrap_or(value)
        .trim()
}
