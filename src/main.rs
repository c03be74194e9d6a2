mod config;
mod core;
mod models;
mod routes;
mod services;

use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use crate::config::{LoggingSettings, Settings};
use crate::core::{Recommender, RecommenderOptions};
use crate::routes::AppState;
use crate::services::{load_store, GeocoderClient, OpenAiClient};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
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
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// LOG_LEVEL / LOG_FORMAT win over the logging section
fn init_logging(settings: &LoggingSettings) {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.level.clone());
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.format.clone());

    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn io_error(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load();
    init_logging(
        &settings
            .as_ref()
            .map(|s| s.logging.clone())
            .unwrap_or_default(),
    );

    info!("Starting housing recommendation service...");

    let settings = settings.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        io_error(e)
    })?;

    info!("Configuration loaded successfully");

    let store = load_store(&settings.dataset.root, &settings.dataset.regions).map_err(|e| {
        error!("Failed to load dataset: {}", e);
        io_error(e)
    })?;
    if store.is_empty() {
        warn!("No buildings found under {}", settings.dataset.root.display());
    }

    let geocoder = GeocoderClient::from_settings(&settings.geocoder).map_err(io_error)?;
    match &geocoder {
        Some(_) => info!("Geocoder enabled (cache: {} entries)", settings.geocoder.cache_size),
        None => warn!("No geocoder endpoint configured, place names will not be resolved"),
    }

    let llm = OpenAiClient::from_settings(&settings.llm).map_err(io_error)?;
    match &llm {
        Some(client) => info!("Ranking service enabled ({})", client.chat_model()),
        None => warn!("No LLM API key configured, shortlists will follow score order"),
    }

    let options = RecommenderOptions {
        region_bounds: settings.recommendation.region_bounds,
        top_n: settings.recommendation.top_n,
        refine_top_n: settings.recommendation.refine_top_n,
    };

    let recommender = Recommender::new(store, options)
        .with_geocoder(geocoder)
        .with_llm(llm);

    info!("Recommender initialized with options: {:?}", options);

    let app_state = AppState {
        recommender: Arc::new(recommender),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
