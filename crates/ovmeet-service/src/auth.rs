// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Login, token refresh, password changes and API key management.

use argon2::{
    Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier as _,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::Utc;
use ovmeet_storage::Repositories;
use ovmeet_types::{
    api::{auth::TokenPairResponseBody, error::ApiError},
    auth::{API_KEY_PREFIX, ApiKey},
    members::MemberId,
    users::{User, UserId},
};
use rand::Rng as _;

use crate::{ApiResult, MemberClaims, TokenService, tokens::TokenError};

/// Authentication and credential management.
#[derive(Clone)]
pub struct AuthService {
    repos: Repositories,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(repos: Repositories, tokens: TokenService) -> Self {
        Self { repos, tokens }
    }

    pub fn token_service(&self) -> &TokenService {
        &self.tokens
    }

    /// Hash a password into a PHC string.
    pub fn hash_password(password: &str) -> Result<String, ApiError> {
        Argon2::default()
            .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
            .map(|hash| hash.to_string())
            .map_err(|e| {
                log::error!("Password hashing failed: {e}");
                ApiError::internal()
            })
    }

    fn verify_password(password: &str, hash: &str) -> bool {
        PasswordHash::new(hash)
            .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
            .is_ok()
    }

    /// Generate a fresh management API key.
    pub fn generate_api_key() -> ApiKey {
        let suffix: String = rand::rng()
            .sample_iter(rand::distr::Alphanumeric)
            .take(40)
            .map(char::from)
            .collect();

        ApiKey {
            key: format!("{API_KEY_PREFIX}{suffix}"),
            creation_date: Utc::now(),
        }
    }

    #[tracing::instrument(skip_all, fields(user_id))]
    pub async fn login(&self, user_id: &str, password: &str) -> ApiResult<TokenPairResponseBody> {
        let user = self
            .repos
            .users()
            .get(&UserId::from(user_id))
            .await?
            .filter(|user| Self::verify_password(password, &user.password_hash))
            .ok_or_else(|| {
                ApiError::unauthorized().with_message("Unknown user or wrong password")
            })?;

        Ok(self.token_pair(&user))
    }

    /// Rotate a refresh token into a fresh token pair.
    ///
    /// Rejected when the subject user no longer exists.
    pub async fn refresh(&self, refresh_token: &str) -> ApiResult<TokenPairResponseBody> {
        let claims = self
            .tokens
            .verify_refresh(refresh_token)
            .map_err(token_error_to_api)?;

        let user = self
            .repos
            .users()
            .get(&UserId::from(claims.sub))
            .await?
            .ok_or_else(|| ApiError::unauthorized().with_message("Invalid token"))?;

        Ok(self.token_pair(&user))
    }

    pub async fn change_password(
        &self,
        user_id: &UserId,
        current_password: &str,
        new_password: &str,
    ) -> ApiResult<TokenPairResponseBody> {
        let users = self.repos.users();

        let mut user = users
            .get(user_id)
            .await?
            .filter(|user| Self::verify_password(current_password, &user.password_hash))
            .ok_or_else(|| {
                ApiError::unauthorized().with_message("Unknown user or wrong password")
            })?;

        user.password_hash = Self::hash_password(new_password)?;
        user.must_change_password = false;
        users.put(&user).await?;

        Ok(self.token_pair(&user))
    }

    fn token_pair(&self, user: &User) -> TokenPairResponseBody {
        TokenPairResponseBody {
            access_token: self.tokens.mint_access(user),
            refresh_token: self.tokens.mint_refresh(user),
        }
    }

    /// Verify a room member token against the current permissions state.
    ///
    /// Rejects when the signature is invalid, the token expired, the room
    /// is gone, the member is gone (non-anonymous), or the embedded
    /// `permissionsEpoch` lies before the current `permissionsUpdatedAt`
    /// of the member or anonymous role entry. Any permissions rotation
    /// therefore atomically invalidates previously minted tokens.
    pub async fn verify_member_token(&self, token: &str) -> ApiResult<MemberClaims> {
        let claims = self
            .tokens
            .decode_member(token)
            .map_err(token_error_to_api)?;

        let room = self
            .repos
            .rooms()
            .get(&claims.room_id)
            .await?
            .ok_or_else(invalid_token)?;

        if claims.anonymous {
            let entry = room
                .anonymous
                .roles
                .get(&claims.base_role)
                .filter(|entry| entry.enabled)
                .ok_or_else(invalid_token)?;

            if claims.permissions_epoch < entry.permissions_updated_at.timestamp_millis() {
                return Err(invalid_token().into());
            }
        } else {
            let member = self
                .repos
                .members()
                .get(&claims.room_id, &MemberId::from(claims.sub.clone()))
                .await?
                .ok_or_else(invalid_token)?;

            // The epoch must cover the member snapshot and the room-roles
            // record; either moving forward invalidates the token.
            let current = member
                .permissions_updated_at
                .max(room.permissions_updated_at);

            if claims.permissions_epoch < current.timestamp_millis() {
                return Err(invalid_token().into());
            }
        }

        Ok(claims)
    }

    pub async fn create_api_key(&self) -> ApiResult<ApiKey> {
        let api_key = Self::generate_api_key();
        self.repos.config().put_api_key(&api_key).await?;

        Ok(api_key)
    }

    pub async fn get_api_key(&self) -> ApiResult<ApiKey> {
        self.repos
            .config()
            .get_api_key()
            .await?
            .ok_or_else(|| ApiError::not_found().into())
    }

    pub async fn delete_api_key(&self) -> ApiResult<()> {
        self.repos.config().delete_api_key().await?;
        Ok(())
    }

    /// Whether `candidate` matches the active API key.
    pub async fn verify_api_key(&self, candidate: &str) -> ApiResult<bool> {
        Ok(self
            .repos
            .config()
            .get_api_key()
            .await?
            .is_some_and(|api_key| api_key.matches(candidate)))
    }
}

fn invalid_token() -> ApiError {
    ApiError::unauthorized().with_message("Invalid token")
}

fn token_error_to_api(error: TokenError) -> ApiError {
    match error {
        TokenError::Expired => ApiError::unauthorized().with_message("Token expired"),
        TokenError::Invalid => invalid_token(),
    }
}

#[cfg(test)]
mod tests {
    use ovmeet_types::users::UserRole;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_util::TestContext;

    async fn seeded_auth(ctx: &TestContext) -> AuthService {
        let auth = ctx.auth_service();

        ctx.repos
            .users()
            .put(&User {
                user_id: UserId::from("alice"),
                name: "Alice".into(),
                password_hash: AuthService::hash_password("correct horse").unwrap(),
                role: UserRole::User,
                must_change_password: false,
            })
            .await
            .unwrap();

        auth
    }

    #[tokio::test]
    async fn login_verifies_the_password() {
        let ctx = TestContext::new().await;
        let auth = seeded_auth(&ctx).await;

        let pair = auth.login("alice", "correct horse").await.unwrap();
        assert!(!pair.access_token.is_empty());

        let err = auth.login("alice", "wrong").await.unwrap_err();
        assert_eq!(err.as_api_error().status.as_u16(), 401);

        let err = auth.login("nobody", "correct horse").await.unwrap_err();
        assert_eq!(err.as_api_error().status.as_u16(), 401);
    }

    #[tokio::test]
    async fn refresh_rejects_deleted_users() {
        let ctx = TestContext::new().await;
        let auth = seeded_auth(&ctx).await;

        let pair = auth.login("alice", "correct horse").await.unwrap();

        // Rotation works while the user exists
        let rotated = auth.refresh(&pair.refresh_token).await.unwrap();
        assert!(!rotated.access_token.is_empty());

        ctx.repos.users().delete(&UserId::from("alice")).await.unwrap();

        let err = auth.refresh(&pair.refresh_token).await.unwrap_err();
        assert_eq!(err.as_api_error().status.as_u16(), 401);
    }

    #[tokio::test]
    async fn change_password_clears_the_flag() {
        let ctx = TestContext::new().await;
        let auth = ctx.auth_service();

        ctx.repos
            .users()
            .put(&User {
                user_id: UserId::from("admin"),
                name: "Admin".into(),
                password_hash: AuthService::hash_password("initial").unwrap(),
                role: UserRole::Admin,
                must_change_password: true,
            })
            .await
            .unwrap();

        let _ = auth
            .change_password(&UserId::from("admin"), "initial", "brand new secret")
            .await
            .unwrap();

        let user = ctx.repos.users().get(&UserId::from("admin")).await.unwrap().unwrap();
        assert!(!user.must_change_password);

        let _ = auth.login("admin", "brand new secret").await.unwrap();
    }

    #[tokio::test]
    async fn api_key_management_keeps_one_active_key() {
        let ctx = TestContext::new().await;
        let auth = ctx.auth_service();

        let first = auth.create_api_key().await.unwrap();
        assert!(auth.verify_api_key(&first.key).await.unwrap());

        let second = auth.create_api_key().await.unwrap();
        assert!(!auth.verify_api_key(&first.key).await.unwrap());
        assert!(auth.verify_api_key(&second.key).await.unwrap());

        auth.delete_api_key().await.unwrap();
        assert!(!auth.verify_api_key(&second.key).await.unwrap());
    }

    mod member_token_invalidation {
        use ovmeet_types::{
            api::members::{PatchMemberRequestBody, PostMemberRequestBody},
            permissions::PermissionOverrides,
            rooms::{RoomId, RoomRole},
        };

        use super::*;
        use crate::test_util::test_room;

        /// The permissions epoch has millisecond resolution; spacing the
        /// mint and the update keeps the comparison meaningful.
        async fn tick() {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        fn room_id() -> RoomId {
            RoomId::parse("demo-1").unwrap()
        }

        async fn minted_member_token(ctx: &TestContext) -> (AuthService, String) {
            let auth = ctx.auth_service();

            ctx.repos.rooms().put(&test_room("demo-1")).await.unwrap();

            let member = ctx
                .member_service()
                .create(
                    &room_id(),
                    PostMemberRequestBody {
                        user_id: None,
                        name: "Moderator".into(),
                        base_role: RoomRole::Moderator,
                        custom_permissions: None,
                    },
                )
                .await
                .unwrap();

            let token = auth.token_service().mint_member(&member);

            (auth, token)
        }

        #[tokio::test]
        async fn a_fresh_token_verifies() {
            let ctx = TestContext::new().await;
            let (auth, token) = minted_member_token(&ctx).await;

            let claims = auth.verify_member_token(&token).await.unwrap();
            assert_eq!(claims.room_id, room_id());
            assert!(claims.permissions.can_make_moderator);
        }

        #[tokio::test]
        async fn updating_member_permissions_invalidates_the_token() {
            let ctx = TestContext::new().await;
            let (auth, token) = minted_member_token(&ctx).await;
            let member_id = auth
                .verify_member_token(&token)
                .await
                .unwrap()
                .sub
                .clone();

            tick().await;

            let _ = ctx
                .member_service()
                .update(
                    &room_id(),
                    &ovmeet_types::members::MemberId::from(member_id),
                    PatchMemberRequestBody {
                        custom_permissions: Some(PermissionOverrides {
                            can_make_moderator: Some(false),
                            ..Default::default()
                        }),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();

            let err = auth.verify_member_token(&token).await.unwrap_err();
            assert_eq!(err.as_api_error().status.as_u16(), 401);
        }

        #[tokio::test]
        async fn updating_room_roles_invalidates_the_token() {
            let ctx = TestContext::new().await;
            let (auth, token) = minted_member_token(&ctx).await;

            let room = ctx.repos.rooms().get(&room_id()).await.unwrap().unwrap();
            let mut roles = room.roles.clone();
            roles
                .get_mut(&RoomRole::Moderator)
                .unwrap()
                .can_make_moderator = false;

            tick().await;

            let _ = ctx.room_service().update_roles(&room_id(), roles).await.unwrap();

            let err = auth.verify_member_token(&token).await.unwrap_err();
            assert_eq!(err.as_api_error().status.as_u16(), 401);
        }

        #[tokio::test]
        async fn config_updates_keep_the_token_valid() {
            let ctx = TestContext::new().await;
            let (auth, token) = minted_member_token(&ctx).await;

            let room = ctx.repos.rooms().get(&room_id()).await.unwrap().unwrap();
            let mut config = room.config.clone();
            config.chat.enabled = false;

            let _ = ctx.room_service().update_config(&room_id(), config).await.unwrap();

            let _ = auth.verify_member_token(&token).await.unwrap();
        }

        #[tokio::test]
        async fn deleting_the_member_or_room_invalidates_the_token() {
            let ctx = TestContext::new().await;
            let (auth, token) = minted_member_token(&ctx).await;
            let member_id = auth.verify_member_token(&token).await.unwrap().sub.clone();

            ctx.member_service()
                .delete(
                    &room_id(),
                    &ovmeet_types::members::MemberId::from(member_id),
                )
                .await
                .unwrap();

            let err = auth.verify_member_token(&token).await.unwrap_err();
            assert_eq!(err.as_api_error().status.as_u16(), 401);

            // Same for a deleted room
            let (auth, token) = minted_member_token(&ctx).await;
            ctx.repos.rooms().delete(&room_id()).await.unwrap();

            let err = auth.verify_member_token(&token).await.unwrap_err();
            assert_eq!(err.as_api_error().status.as_u16(), 401);
        }

        #[tokio::test]
        async fn anonymous_tokens_pin_to_the_anonymous_entry() {
            let ctx = TestContext::new().await;
            let auth = ctx.auth_service();

            let mut room = test_room("demo-1");
            let _ = room.anonymous.roles.insert(
                RoomRole::Speaker,
                ovmeet_types::rooms::AnonymousRoleAccess {
                    enabled: true,
                    secret: "s-speaker".into(),
                    access_url: "https://meet.example.com/demo-1?secret=s-speaker"
                        .parse()
                        .unwrap(),
                    permissions_updated_at: chrono::Utc::now(),
                },
            );
            ctx.repos.rooms().put(&room).await.unwrap();

            let token = auth
                .token_service()
                .mint_anonymous(&room, RoomRole::Speaker)
                .unwrap();
            let claims = auth.verify_member_token(&token).await.unwrap();
            assert!(claims.anonymous);

            // Rotating the anonymous entry invalidates the token
            let mut toggles = std::collections::BTreeMap::new();
            let _ = toggles.insert(
                RoomRole::Speaker,
                ovmeet_types::api::rooms::AnonymousRoleToggle { enabled: true },
            );
            tick().await;

            let _ = ctx
                .room_service()
                .update_anonymous(&room_id(), toggles)
                .await
                .unwrap();

            let err = auth.verify_member_token(&token).await.unwrap_err();
            assert_eq!(err.as_api_error().status.as_u16(), 401);
        }
    }
}
