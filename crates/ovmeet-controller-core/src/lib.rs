// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Core library of the *OvMeet Controller*.
//!
//! # Example
//!
//! ```no_run
//! use ovmeet_controller_core::Controller;
//! use snafu::Whatever;
//!
//! #[actix_web::main]
//! async fn main() {
//!     ovmeet_controller_core::try_or_exit(run()).await;
//! }
//!
//! async fn run() -> Result<(), Whatever> {
//!     if let Some(controller) = Controller::create("OvMeet Controller").await? {
//!         controller.run().await?;
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::{future::Future, net::Ipv6Addr, process::exit, sync::Arc, time::Duration};

use actix_web::{App, HttpServer, web, web::Data};
use lapin_pool::RabbitMqPool;
use ovmeet_exchange::{EventBus, ExchangeTask};
use ovmeet_livekit::{LiveKitAdapter, MediaAdapter, WebhookVerifier};
use ovmeet_lock::{LockManager, RedisLockManager};
use ovmeet_scheduler::TaskScheduler;
use ovmeet_service::{
    AuthService, MemberService, RecordingService, RoomService, ServiceConfig, TokenService,
    WebhookSink, register_garbage_collectors,
};
use ovmeet_settings::Settings;
use ovmeet_storage::{
    Cache, Repositories, S3ObjectStore, StorageInitializer, StorageSeed,
};
use ovmeet_types::{config::GlobalConfig, users::{User, UserId, UserRole}};
use snafu::{Report, ResultExt as _, Whatever, whatever};
use uuid::Uuid;

mod api;
mod cli;

pub use api::{ApiAuth, AuthContext};

type Result<T, E = Whatever> = std::result::Result<T, E>;

/// TTL of cache entries in front of the object store.
const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Run `future` and exit the process with a readable report on error.
pub async fn try_or_exit<T, F>(future: F) -> T
where
    F: Future<Output = Result<T>>,
{
    match future.await {
        Ok(value) => value,
        Err(e) => {
            eprintln!("{}", Report::from_error(e));
            exit(1);
        }
    }
}

/// The assembled controller, ready to serve.
pub struct Controller {
    settings: Settings,
    service_config: ServiceConfig,
    auth: AuthService,
    tokens: TokenService,
    rooms: RoomService,
    recordings: RecordingService,
    members: MemberService,
    webhook_sink: WebhookSink,
    webhook_verifier: WebhookVerifier,
    scheduler: TaskScheduler,
}

impl Controller {
    /// Parse the command line, load the settings and assemble the
    /// controller.
    ///
    /// Returns `None` when the invocation only asked for version output.
    pub async fn create(program_name: &str) -> Result<Option<Self>> {
        let args = cli::Args::parse_args();

        if args.version {
            println!("{program_name} {}", env!("CARGO_PKG_VERSION"));
            return Ok(None);
        }

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .try_init()
            .ok();

        let settings = Settings::load(&args.config)
            .whatever_context("Failed to load settings")?;

        Self::init(settings).await.map(Some)
    }

    async fn init(settings: Settings) -> Result<Self> {
        let replica_id = format!("ovmeet-{}", Uuid::new_v4());
        log::info!("Starting controller replica {replica_id}");

        // Connect to redis
        let redis_client = redis::Client::open(settings.redis.url.clone())
            .whatever_context("Invalid redis URL")?;
        let redis = redis::aio::ConnectionManager::new(redis_client)
            .await
            .whatever_context("Failed to connect to redis")?;

        let locks: Arc<dyn LockManager> =
            Arc::new(RedisLockManager::new(redis.clone(), replica_id));

        // Cross-replica messaging; process-local without RabbitMQ
        let exchange = match settings.rabbit_mq.as_ref() {
            Some(config) => {
                let pool: Arc<RabbitMqPool> = RabbitMqPool::from_config(
                    &config.url,
                    config.min_connections,
                    config.max_channels_per_connection,
                );
                ExchangeTask::spawn_with_rabbitmq(pool)
                    .await
                    .whatever_context("Failed to spawn exchange task")?
            }
            None => ExchangeTask::spawn(),
        };
        let bus = EventBus::new(exchange);

        // Connect to MinIO
        let store = S3ObjectStore::new(&settings.minio)
            .await
            .whatever_context("Failed to initialize object storage")?;
        let repos = Repositories::new(
            Arc::new(store),
            Cache::redis(redis, "ovmeet:cache", CACHE_TTL),
        );

        let media: Arc<dyn MediaAdapter> = Arc::new(LiveKitAdapter::new(
            &settings.livekit,
            settings.minio.clone(),
        ));

        let service_config = ServiceConfig::from(&settings);

        let tokens = TokenService::new(
            &settings.tokens.secret,
            Duration::from_secs(settings.tokens.access_token_ttl_secs),
            Duration::from_secs(settings.tokens.refresh_token_ttl_secs),
            Duration::from_secs(settings.tokens.member_token_ttl_secs),
        );
        let auth = AuthService::new(repos.clone(), tokens.clone());

        let rooms = RoomService::new(
            repos.clone(),
            media.clone(),
            locks.clone(),
            bus.clone(),
            service_config.clone(),
        );
        let recordings = RecordingService::new(
            repos.clone(),
            media.clone(),
            locks.clone(),
            bus.clone(),
            service_config.clone(),
        );
        let members = MemberService::new(repos.clone(), media, bus.clone());

        let webhook_sink = WebhookSink::new(rooms.clone(), recordings.clone(), locks.clone());
        let webhook_verifier =
            WebhookVerifier::new(&settings.livekit.api_key, &settings.livekit.api_secret);

        // Exactly one replica seeds the defaults
        let initial_password_hash =
            match AuthService::hash_password(&settings.initial_account.password) {
                Ok(hash) => hash,
                Err(e) => whatever!("Failed to hash the initial account password: {e}"),
            };

        StorageInitializer::new(repos, locks.clone(), bus)
            .run(StorageSeed {
                global_config: GlobalConfig::default(),
                initial_admin: User {
                    user_id: UserId::from(settings.initial_account.user_id.clone()),
                    name: settings.initial_account.user_id.clone(),
                    password_hash: initial_password_hash,
                    role: UserRole::Admin,
                    must_change_password: true,
                },
                api_key: AuthService::generate_api_key(),
            })
            .await
            .whatever_context("Storage initialization failed")?;

        // Background garbage collectors
        let scheduler = TaskScheduler::new(locks)
            .await
            .whatever_context("Failed to start the task scheduler")?;
        register_garbage_collectors(&scheduler, rooms.clone(), recordings.clone(), &service_config)
            .await
            .whatever_context("Failed to register the garbage collectors")?;

        Ok(Self {
            settings,
            service_config,
            auth,
            tokens,
            rooms,
            recordings,
            members,
            webhook_sink,
            webhook_verifier,
            scheduler,
        })
    }

    /// Serve until the process receives a termination signal.
    pub async fn run(self) -> Result<()> {
        let Self {
            settings,
            service_config,
            auth,
            tokens,
            rooms,
            recordings,
            members,
            webhook_sink,
            webhook_verifier,
            scheduler,
            ..
        } = self;

        let auth = Data::new(auth);
        let tokens = Data::new(tokens);
        let rooms = Data::new(rooms);
        let recordings = Data::new(recordings);
        let members = Data::new(members);
        let webhook_sink = Data::new(webhook_sink);
        let webhook_verifier = Data::new(webhook_verifier);
        let service_config = Data::new(service_config);

        let base_path = settings.http.base_path.clone();
        let port = settings.http.port;

        log::info!("Listening on port {port} with base path {base_path:?}");

        let server = HttpServer::new(move || {
            let app = App::new()
                .wrap(actix_web::middleware::Logger::default())
                .app_data(auth.clone())
                .app_data(tokens.clone())
                .app_data(rooms.clone())
                .app_data(recordings.clone())
                .app_data(members.clone())
                .app_data(webhook_sink.clone())
                .app_data(webhook_verifier.clone())
                .app_data(service_config.clone());

            let routes = web::scope(&base_path)
                .service(api::v1::scope().wrap(ApiAuth::new(auth.clone())))
                .service(api::internal::scope().wrap(ApiAuth::new(auth.clone())))
                .service(api::webhooks::receive);

            app.service(routes)
        })
        .bind((Ipv6Addr::UNSPECIFIED, port))
        .whatever_context("Failed to bind HTTP listener")?
        .run();

        let result = server.await.whatever_context("HTTP server failed");

        // Drop the recurring tasks before the services go away
        let _ = scheduler.cancel("room_expiration").await;
        let _ = scheduler.cancel("room_status_consistency").await;
        let _ = scheduler.cancel("recording_orphan_locks").await;

        result
    }
}
