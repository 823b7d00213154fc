use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use roommate_match::config::{LoggingSettings, Settings};
use roommate_match::core::{CandidateSelector, MatchService};
use roommate_match::routes::{self, AppState};
use roommate_match::services::{
    AppwritePushNotifier, AppwriteProfiles, CacheManager, InMemoryStore, InterestLedger,
    JwtIdentityProvider, LogNotifier, NotificationDispatcher, Notifier, PostgresStore,
    PreferenceStore, ProfileDirectory,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_argument".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_argument".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_logging(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

async fn build_cache(settings: &Settings) -> Arc<CacheManager> {
    let ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_size = settings.cache.l1_cache_size.unwrap_or(1000);

    match &settings.cache.redis_url {
        Some(url) => match CacheManager::new(url, l1_size, ttl).await {
            Ok(cache) => {
                info!("Cache manager initialized (L1: {} entries, TTL: {}s, Redis L2)", l1_size, ttl);
                Arc::new(cache)
            }
            Err(e) => {
                warn!("Failed to connect to Redis ({}), running with L1 cache only", e);
                Arc::new(CacheManager::local(l1_size, ttl))
            }
        },
        None => {
            info!("Cache manager initialized (L1: {} entries, TTL: {}s)", l1_size, ttl);
            Arc::new(CacheManager::local(l1_size, ttl))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load();
    let logging = settings
        .as_ref()
        .map(|s| s.logging.clone())
        .unwrap_or_default();
    init_logging(&logging);

    info!("Starting roommate matching service...");

    let settings = settings.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    info!("Configuration loaded successfully");

    // Relational store, or the in-process store for local development
    let (preferences, ledger): (Arc<dyn PreferenceStore>, Arc<dyn InterestLedger>) =
        if settings.database.is_memory() {
            warn!("Using in-memory store; data is lost on restart");
            let store = Arc::new(InMemoryStore::new());
            (store.clone() as Arc<dyn PreferenceStore>, store as Arc<dyn InterestLedger>)
        } else {
            let store = Arc::new(
                PostgresStore::from_settings(
                    &settings.database.url,
                    settings.database.max_connections,
                    settings.database.min_connections,
                    settings.database.acquire_timeout_secs,
                    settings.database.idle_timeout_secs,
                )
                .await
                .map_err(|e| {
                    error!("Failed to connect to PostgreSQL: {}", e);
                    std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e.to_string())
                })?,
            );
            info!(
                "PostgreSQL store initialized (max: {} connections)",
                settings.database.max_connections.unwrap_or(10)
            );
            (store.clone() as Arc<dyn PreferenceStore>, store as Arc<dyn InterestLedger>)
        };

    let cache = build_cache(&settings).await;

    let (profiles, notifier): (Arc<dyn ProfileDirectory>, Arc<dyn Notifier>) = match &settings.appwrite {
        Some(appwrite) => {
            let profiles = AppwriteProfiles::new(
                appwrite.endpoint.clone(),
                appwrite.api_key.clone(),
                appwrite.project_id.clone(),
                appwrite.database_id.clone(),
                appwrite.profiles_collection.clone(),
                appwrite.images_bucket.clone(),
                Some(cache.clone()),
            )
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

            let notifier: Arc<dyn Notifier> = if settings.notifier.enabled {
                Arc::new(
                    AppwritePushNotifier::new(
                        appwrite.endpoint.clone(),
                        appwrite.api_key.clone(),
                        appwrite.project_id.clone(),
                    )
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?,
                )
            } else {
                Arc::new(LogNotifier)
            };

            info!("Appwrite profile directory initialized");
            (Arc::new(profiles) as Arc<dyn ProfileDirectory>, notifier)
        }
        None => {
            warn!("Appwrite not configured; match enrichment and push notifications disabled");
            (
                Arc::new(InMemoryStore::new()) as Arc<dyn ProfileDirectory>,
                Arc::new(LogNotifier) as Arc<dyn Notifier>,
            )
        }
    };

    let dispatcher = NotificationDispatcher::new(
        notifier,
        Duration::from_millis(settings.notifier.timeout_ms),
        settings.notifier.max_retries,
        Duration::from_millis(settings.notifier.backoff_ms),
    );

    let selector = CandidateSelector::new(
        settings.matching.candidate_limit,
        settings.matching.default_budget_overlap,
    );

    let service = MatchService::new(
        preferences,
        ledger,
        profiles,
        dispatcher,
        selector,
        settings.matching.request_timeout(),
    );

    let identity = JwtIdentityProvider::new(
        &settings.auth.jwt_secret,
        settings.auth.issuer.as_deref(),
        settings.auth.leeway_secs,
    );

    let app_state = AppState {
        service: service.clone(),
        identity,
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    let result = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await;

    service.shutdown().await;
    result
}
