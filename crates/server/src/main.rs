//! RhythMe server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use rhythme_api::{
    BroadcastEventPublisher, StreamingState, middleware::AppState, router as api_router,
    streaming_handler,
};
use rhythme_common::Config;
use rhythme_core::{
    AccountService, BlockingService, EmailService, EventPublisherService, FollowingService,
    MessagingService, NotificationService, PostService, RecommendationService, ReportService,
    SpotifyService, UserService, VisibilityService,
};
use rhythme_db::repositories::{
    BlockingRepository, ConversationRepository, FollowingRepository, MessageRepository,
    NotificationRepository, PostRepository, ReportRepository, SpotifyAccountRepository,
    UserProfileRepository, UserRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rhythme=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting RhythMe server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = rhythme_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    rhythme_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let profile_repo = UserProfileRepository::new(Arc::clone(&db));
    let following_repo = FollowingRepository::new(Arc::clone(&db));
    let blocking_repo = BlockingRepository::new(Arc::clone(&db));
    let post_repo = PostRepository::new(Arc::clone(&db));
    let conversation_repo = ConversationRepository::new(Arc::clone(&db));
    let message_repo = MessageRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));
    let report_repo = ReportRepository::new(Arc::clone(&db));
    let spotify_account_repo = SpotifyAccountRepository::new(Arc::clone(&db));

    // Initialize streaming state; core services publish real-time events
    // through the broadcast bus it wraps.
    let streaming = StreamingState::new();
    let event_publisher: EventPublisherService =
        Arc::new(BroadcastEventPublisher::new(streaming.clone()));

    // Initialize services
    let email_service = EmailService::new(config.email.clone(), config.server.url.clone());

    let mut notification_service = NotificationService::new(notification_repo);
    notification_service.set_event_publisher(event_publisher.clone());

    let visibility_service = VisibilityService::new(
        profile_repo.clone(),
        following_repo.clone(),
        blocking_repo.clone(),
    );

    let account_service =
        AccountService::new(user_repo.clone(), profile_repo.clone(), email_service);

    let user_service = UserService::new(
        user_repo.clone(),
        profile_repo.clone(),
        following_repo.clone(),
        visibility_service.clone(),
    );

    let following_service = FollowingService::new(
        following_repo.clone(),
        blocking_repo.clone(),
        user_repo.clone(),
        notification_service.clone(),
    );

    let blocking_service = BlockingService::new(
        blocking_repo.clone(),
        following_repo.clone(),
        user_repo.clone(),
    );

    let mut post_service = PostService::new(
        post_repo.clone(),
        user_repo.clone(),
        following_repo.clone(),
        visibility_service,
        notification_service.clone(),
    );
    post_service.set_event_publisher(event_publisher.clone());

    let recommendation_service =
        RecommendationService::new(post_repo, following_repo.clone(), user_repo.clone());

    let mut messaging_service = MessagingService::new(
        conversation_repo,
        message_repo,
        blocking_repo,
        user_repo.clone(),
        notification_service.clone(),
    );
    messaging_service.set_event_publisher(event_publisher);

    let report_service =
        ReportService::new(report_repo, user_repo, notification_service.clone());

    let spotify_service = SpotifyService::new(config.spotify.clone(), spotify_account_repo);

    // Create app state
    let state = AppState {
        account_service,
        user_service,
        following_service,
        blocking_service,
        post_service,
        recommendation_service,
        messaging_service,
        notification_service,
        report_service,
        spotify_service,
        streaming,
    };

    // Build router
    let app = Router::new()
        .route("/streaming", get(streaming_handler))
        .nest("/api/v1", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rhythme_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
