mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::{Config, StorageBackend};
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::{database, middleware};
use crate::features::admin::routes as admin_routes;
use crate::features::admin::services::{AdminGate, AdminTokenStore, CleanupService};
use crate::features::auth;
use crate::features::auth::routes as auth_routes;
use crate::features::files::repositories::{FileRepository, PgFileRepository};
use crate::features::files::{routes as files_routes, FileService};
use crate::features::policy::repositories::PgPolicyStore;
use crate::features::policy::routes as policy_routes;
use crate::features::policy::services::PolicyService;
use crate::features::statistics::repositories::{PgStatisticsRepository, StatisticsRepository};
use crate::features::statistics::routes as statistics_routes;
use crate::features::statistics::services::{DownloadRecorder, StatisticsService};
use crate::modules::security::Argon2PasswordHasher;
use crate::modules::storage::{BlobStore, LocalBlobStore, MinIOClient};
use axum::{middleware::from_fn, Router};
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "System info: tokio_worker_threads={}, pid={}",
        worker_threads,
        std::process::id()
    );
    tracing::info!("Configuration loaded successfully");

    let pool = database::create_pool(&config.database).await?;
    database::run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    let jwt_validator = Arc::new(auth::JwtValidator::new(
        &config.auth.jwt_secret,
        config.auth.jwt_leeway,
    ));
    tracing::info!("Auth configuration initialized");

    // Blob backend
    let blob_store: Arc<dyn BlobStore> = match config.storage.backend {
        StorageBackend::MinIO => {
            let client = MinIOClient::new(config.storage.minio.clone())
                .await
                .map_err(|e| anyhow::anyhow!("Failed to initialize MinIO client: {}", e))?;
            tracing::info!(
                "MinIO blob store initialized for bucket: {}",
                config.storage.minio.bucket
            );
            Arc::new(client)
        }
        StorageBackend::Local => {
            let store = LocalBlobStore::new(config.storage.local_root.clone())
                .await
                .map_err(|e| anyhow::anyhow!("Failed to initialize local blob store: {}", e))?;
            tracing::info!("Local blob store initialized at {}", config.storage.local_root);
            Arc::new(store)
        }
    };

    // Policy
    let policy_store = Arc::new(PgPolicyStore::new(pool.clone()));
    policy_store.ensure_default().await?;
    let policy_service = Arc::new(PolicyService::new(policy_store));
    tracing::info!("Policy service initialized");

    // Registry, statistics and the download recorder worker
    let file_repository: Arc<dyn FileRepository> = Arc::new(PgFileRepository::new(pool.clone()));
    let statistics_repository: Arc<dyn StatisticsRepository> =
        Arc::new(PgStatisticsRepository::new(pool.clone()));

    let (download_recorder, _recorder_worker) = DownloadRecorder::spawn(
        Arc::clone(&statistics_repository),
        config.statistics.queue_capacity,
    );
    tracing::info!(
        "Download recorder started (queue_capacity={})",
        config.statistics.queue_capacity
    );

    let file_service = Arc::new(FileService::new(
        Arc::clone(&file_repository),
        Arc::clone(&policy_service),
        Arc::clone(&blob_store),
        Arc::new(Argon2PasswordHasher::default()),
        download_recorder,
    ));
    tracing::info!("File service initialized");

    let statistics_service = Arc::new(StatisticsService::new(
        Arc::clone(&file_repository),
        statistics_repository,
    ));
    tracing::info!("Statistics service initialized");

    // Admin gate and cleanup sweeper
    let admin_tokens = Arc::new(AdminTokenStore::new());
    let _rotation = Arc::clone(&admin_tokens).spawn_rotation(config.admin.token_rotation_interval);
    let admin_gate = Arc::new(AdminGate::new(
        Arc::clone(&admin_tokens),
        config.admin.cron_secret.clone(),
    ));
    if admin_gate.cron_secret.is_none() {
        tracing::warn!("CLEANUP_SECRET not set; scheduled cleanup must use the admin token");
    }

    let cleanup_service = Arc::new(CleanupService::new(
        file_repository,
        blob_store,
        config.admin.cleanup_quota,
        config.admin.cleanup_window,
    ));
    tracing::info!(
        "Cleanup service initialized (quota={} per {:?})",
        config.admin.cleanup_quota,
        config.admin.cleanup_window
    );

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    // Build swagger router
    let swagger = if let Some(credentials) = config.swagger.credentials() {
        tracing::info!("Swagger UI basic auth enabled");
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
            .layer(from_fn(middleware::basic_auth_middleware(Arc::new(
                credentials,
            ))))
    } else {
        tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
    };

    // Protected routes (require JWT authentication)
    let protected_routes = Router::new()
        .merge(auth_routes::protected_routes())
        .merge(files_routes::protected_routes(Arc::clone(&file_service)))
        .merge(statistics_routes::protected_routes(statistics_service))
        .route_layer(axum::middleware::from_fn_with_state(
            jwt_validator.clone(),
            middleware::auth_middleware,
        ));

    // Share-link routes (identity attached when a token is presented)
    let share_routes = Router::new()
        .merge(files_routes::public_routes(
            file_service,
            config.app.max_request_body_size,
        ))
        .route_layer(axum::middleware::from_fn_with_state(
            jwt_validator,
            middleware::optional_auth_middleware,
        ));

    // Admin routes (rotating admin token or cron secret)
    let admin_router = Router::new()
        .merge(policy_routes::admin_routes(policy_service))
        .merge(admin_routes::routes(cleanup_service))
        .route_layer(axum::middleware::from_fn_with_state(
            admin_gate,
            middleware::admin_middleware,
        ));

    // Simple health check endpoint (no auth required)
    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }
    let health_route = Router::new().route("/health", axum::routing::get(health_check));

    let app = Router::new()
        .merge(swagger)
        .merge(protected_routes)
        .merge(share_routes)
        .merge(admin_router)
        .merge(health_route)
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nodelay(true)?;

    socket.set_recv_buffer_size(256 * 1024)?;
    socket.set_send_buffer_size(256 * 1024)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(65535)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "Swagger UI available at {}",
        format!("http://{}/swagger-ui/", addr)
    );

    axum::serve(listener, app).await?;

    Ok(())
}
