use actix_cors::Cors;
use actix_web::{dev::Service as _, http::header, middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use lms_server::api;
use lms_server::config::{AppConfig, FirebaseConfig};
use lms_server::database::{MemoryDb, MongoDB, Repository};
use lms_server::middleware;
use lms_server::seeds;
use lms_server::services::auth_service::TokenIssuer;
use lms_server::state::AppState;
use lms_server::storage::{FirebaseIdentity, GcsStorage, IdentityProvider, MemoryStorage, ObjectStorage, ServiceAccount};

type Adapters = (Option<Arc<dyn ObjectStorage>>, Option<Arc<dyn IdentityProvider>>);

fn to_io(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}

/// Storage bucket and identity provider backed by one service account.
/// Any failure disables both; the server still starts.
fn firebase_adapters(config: &FirebaseConfig) -> Adapters {
    let http = match reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(120))
        .build()
    {
        Ok(http) => http,
        Err(e) => {
            log::error!("❌ Failed to build HTTP client for Firebase: {}", e);
            return (None, None);
        }
    };

    match ServiceAccount::new(config, http.clone()) {
        Ok(account) => {
            let account = Arc::new(account);
            let storage = GcsStorage::new(&config.storage_bucket, account.clone(), http.clone());
            let identity = FirebaseIdentity::new(&config.project_id, account, http);
            log::info!("✅ Firebase adapters ready (bucket: {})", config.storage_bucket);
            let storage: Arc<dyn ObjectStorage> = Arc::new(storage);
            let identity: Arc<dyn IdentityProvider> = Arc::new(identity);
            (Some(storage), Some(identity))
        }
        Err(e) => {
            log::error!("❌ Firebase initialization failed: {}", e);
            (None, None)
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(to_io)?;

    log::info!("🚀 Starting LMS server...");

    let (db, (storage, identity)): (Arc<dyn Repository>, Adapters) = if config.mock_mode {
        log::warn!("🧪 Mock mode: in-memory store with fixture data, nothing is persisted");
        let users = seeds::mock_users().map_err(to_io)?;
        let courses = users
            .iter()
            .find(|u| u.role == lms_server::models::Role::Instructor)
            .map(seeds::mock_courses)
            .unwrap_or_default();
        let db: Arc<dyn Repository> = Arc::new(MemoryDb::with_fixtures(users, courses));
        let storage: Arc<dyn ObjectStorage> = Arc::new(MemoryStorage::new());
        (db, (Some(storage), None))
    } else {
        let uri = config
            .mongo_uri
            .as_deref()
            .ok_or_else(|| to_io("MONGO_URI must be set"))?;
        let mongo = MongoDB::new(uri, config.mongo_database.as_deref())
            .await
            .map_err(to_io)?;

        let adapters = match config.firebase.as_ref() {
            Some(firebase) => firebase_adapters(firebase),
            None => {
                log::warn!("⚠️ Firebase is not configured: media routes will answer 500");
                (None, None)
            }
        };
        let db: Arc<dyn Repository> = Arc::new(mongo);
        (db, adapters)
    };

    // 🌱 Demo data
    if config.seed_demo_data {
        if let Err(e) = seeds::seed_demo_data(db.as_ref()).await {
            log::error!("❌ Failed to seed demo data: {}", e);
        }
    }

    let state = web::Data::new(AppState {
        db,
        tokens: TokenIssuer::new(&config.jwt_secret),
        storage,
        identity,
        mock_mode: config.mock_mode,
    });

    let host = config.host.clone();
    let port = config.port;
    let client_url = config.client_url.clone();

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("🔓 CORS origin: {}", client_url);

    // Start HTTP server
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&client_url)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .supports_credentials()
            .max_age(3600);

        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .wrap_fn(|req, srv| {
                api::metrics::increment_request_count();
                srv.call(req)
            })
            // Swagger UI
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi))
            .configure(api::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
