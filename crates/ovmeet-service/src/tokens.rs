// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Minting and verification of the three token kinds.
//!
//! All tokens are HS256 JWTs signed with the server secret. Room member
//! tokens embed a permissions snapshot and the `permissionsEpoch` they
//! were minted at; the epoch pins the token to a permissions state and is
//! checked against storage at verification time (see
//! [`AuthService::verify_member_token`](crate::AuthService::verify_member_token)).

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use ovmeet_types::{
    members::RoomMember,
    permissions::PermissionSet,
    rooms::{Room, RoomId, RoomRole},
    users::{User, UserRole},
};
use serde::{Deserialize, Serialize};
use snafu::Snafu;

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum TokenError {
    #[snafu(display("Token expired"))]
    Expired,

    #[snafu(display("Invalid token"))]
    Invalid,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        match value.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Invalid,
        }
    }
}

/// Claims of an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// The user id.
    pub sub: String,
    pub role: UserRole,
    pub must_change_password: bool,
    pub iat: i64,
    pub exp: i64,
    typ: TokenKind,
}

/// Claims of a refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// The user id.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    typ: TokenKind,
}

/// Claims of a room member token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberClaims {
    /// The member id, or the anonymous pseudo-subject.
    pub sub: String,
    pub room_id: RoomId,
    pub base_role: RoomRole,
    /// Permission snapshot taken at mint time.
    pub permissions: PermissionSet,
    /// `permissions_updated_at` of the member (or anonymous role entry) at
    /// mint time, in milliseconds.
    pub permissions_epoch: i64,
    pub anonymous: bool,
    pub iat: i64,
    pub exp: i64,
    typ: TokenKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TokenKind {
    Access,
    Refresh,
    Member,
}

/// Mints and verifies the controller's tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    member_ttl: Duration,
}

impl TokenService {
    pub fn new(
        secret: &str,
        access_ttl: Duration,
        refresh_ttl: Duration,
        member_ttl: Duration,
    ) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
            member_ttl,
        }
    }

    fn sign<T: Serialize>(&self, claims: &T) -> String {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .expect("HS256 signing cannot fail")
    }

    fn timestamps(ttl: Duration) -> (i64, i64) {
        let iat = Utc::now().timestamp();
        (iat, iat + ttl.as_secs() as i64)
    }

    pub fn mint_access(&self, user: &User) -> String {
        let (iat, exp) = Self::timestamps(self.access_ttl);

        self.sign(&AccessClaims {
            sub: user.user_id.to_string(),
            role: user.role,
            must_change_password: user.must_change_password,
            iat,
            exp,
            typ: TokenKind::Access,
        })
    }

    pub fn mint_refresh(&self, user: &User) -> String {
        let (iat, exp) = Self::timestamps(self.refresh_ttl);

        self.sign(&RefreshClaims {
            sub: user.user_id.to_string(),
            iat,
            exp,
            typ: TokenKind::Refresh,
        })
    }

    /// Mint a token for a durable room member.
    pub fn mint_member(&self, member: &RoomMember) -> String {
        let (iat, exp) = Self::timestamps(self.member_ttl);

        self.sign(&MemberClaims {
            sub: member.member_id.to_string(),
            room_id: member.room_id.clone(),
            base_role: member.base_role,
            permissions: member.effective_permissions,
            permissions_epoch: member.permissions_updated_at.timestamp_millis(),
            anonymous: false,
            iat,
            exp,
            typ: TokenKind::Member,
        })
    }

    /// Mint a token through the room's anonymous access entry for `role`.
    ///
    /// Returns `None` when anonymous access with that role is disabled.
    pub fn mint_anonymous(&self, room: &Room, role: RoomRole) -> Option<String> {
        let entry = room.anonymous.roles.get(&role).filter(|entry| entry.enabled)?;
        let (iat, exp) = Self::timestamps(self.member_ttl);

        Some(self.sign(&MemberClaims {
            sub: format!("anonymous-{role}"),
            room_id: room.room_id.clone(),
            base_role: role,
            permissions: room.role_template(role),
            permissions_epoch: entry.permissions_updated_at.timestamp_millis(),
            anonymous: true,
            iat,
            exp,
            typ: TokenKind::Member,
        }))
    }

    fn verify<T: serde::de::DeserializeOwned>(&self, token: &str) -> Result<T, TokenError> {
        let validation = Validation::new(Algorithm::HS256);

        Ok(decode::<T>(token, &self.decoding, &validation)?.claims)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let claims: AccessClaims = self.verify(token)?;

        if claims.typ != TokenKind::Access {
            return Err(TokenError::Invalid);
        }

        Ok(claims)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let claims: RefreshClaims = self.verify(token)?;

        if claims.typ != TokenKind::Refresh {
            return Err(TokenError::Invalid);
        }

        Ok(claims)
    }

    /// Decode and signature-check a member token.
    ///
    /// This checks crypto and expiry only; the storage-backed epoch checks
    /// happen in the auth service.
    pub fn decode_member(&self, token: &str) -> Result<MemberClaims, TokenError> {
        let claims: MemberClaims = self.verify(token)?;

        if claims.typ != TokenKind::Member {
            return Err(TokenError::Invalid);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use ovmeet_types::users::UserId;
    use pretty_assertions::assert_eq;

    use super::*;

    fn service() -> TokenService {
        TokenService::new(
            "test-secret",
            Duration::from_secs(900),
            Duration::from_secs(86400),
            Duration::from_secs(3600),
        )
    }

    fn user() -> User {
        User {
            user_id: UserId::from("alice"),
            name: "Alice".into(),
            password_hash: "unused".into(),
            role: UserRole::User,
            must_change_password: false,
        }
    }

    #[test]
    fn access_token_round_trip() {
        let service = service();

        let token = service.mint_access(&user());
        let claims = service.verify_access(&token).unwrap();

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.role, UserRole::User);
        assert!(!claims.must_change_password);
    }

    #[test]
    fn token_kinds_do_not_cross_verify() {
        let service = service();

        let refresh = service.mint_refresh(&user());
        assert_eq!(service.verify_access(&refresh), Err(TokenError::Invalid));

        let access = service.mint_access(&user());
        assert_eq!(service.verify_refresh(&access), Err(TokenError::Invalid));
        assert_eq!(service.decode_member(&access), Err(TokenError::Invalid));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = service().mint_access(&user());

        let other = TokenService::new(
            "other-secret",
            Duration::from_secs(900),
            Duration::from_secs(86400),
            Duration::from_secs(3600),
        );

        assert_eq!(other.verify_access(&token), Err(TokenError::Invalid));
    }
}
