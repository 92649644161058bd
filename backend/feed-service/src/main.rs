use actix_web::{dev::Service, web, App, HttpServer};
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feed_service::config::Config;
use feed_service::db::{create_pool, PgAudienceResolver, PgPostStore};
use feed_service::handlers::{self, FeedHandlerState};
use feed_service::jobs::score_refresher::start_score_refresher;
use feed_service::{metrics, openapi, FeedService};

async fn openapi_json(
    doc: web::Data<utoipa::openapi::OpenApi>,
) -> actix_web::Result<actix_web::HttpResponse> {
    let body = serde_json::to_string(&*doc).map_err(|e| {
        tracing::error!("OpenAPI serialization failed: {}", e);
        actix_web::error::ErrorInternalServerError("OpenAPI serialization error")
    })?;

    Ok(actix_web::HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},actix_web=info,sqlx=warn", default_level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true),
        )
        .init();
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config.app.log_level);

    info!("Starting feed-service v{}", env!("CARGO_PKG_VERSION"));
    info!(env = %config.app.env, "Configuration loaded");

    let db_pool = match create_pool(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database pool creation failed: {:#}", e);
            eprintln!("ERROR: Failed to create database pool: {}", e);
            std::process::exit(1);
        }
    };

    let feed = Arc::new(FeedService::new(
        Arc::new(PgPostStore::new(db_pool.clone())),
        Arc::new(PgAudienceResolver::new(db_pool.clone())),
        config.feed.clone(),
    ));
    let feed_handler_state = web::Data::new(FeedHandlerState::new(feed));

    if config.score_refresh.enabled {
        let refresher_db = db_pool.clone();
        let refresher_config = config.score_refresh.clone();
        tokio::spawn(async move {
            start_score_refresher(refresher_db, refresher_config).await;
        });
        info!("Score refresher background job started");
    } else {
        info!("Score refresher disabled by configuration");
    }

    let openapi_doc = web::Data::new(openapi::doc());
    let bind_addr = format!("{}:{}", config.app.host, config.app.port);
    info!(addr = %bind_addr, "HTTP server listening");

    HttpServer::new(move || {
        App::new()
            .app_data(openapi_doc.clone())
            .app_data(feed_handler_state.clone())
            .route("/api/v1/openapi.json", web::get().to(openapi_json))
            .route("/health", web::get().to(|| async { "OK" }))
            // Health endpoints for K8s probes
            .route("/api/v1/health", web::get().to(|| async { "OK" }))
            .route("/api/v1/health/live", web::get().to(|| async { "OK" }))
            .route("/api/v1/health/ready", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .wrap_fn(|req, srv| {
                let method = req.method().to_string();
                let path = req
                    .match_pattern()
                    .unwrap_or_else(|| req.path().to_string());
                let start = Instant::now();

                let fut = srv.call(req);
                async move {
                    match fut.await {
                        Ok(res) => {
                            metrics::observe_http_request(
                                &method,
                                &path,
                                res.status().as_u16(),
                                start.elapsed(),
                            );
                            Ok(res)
                        }
                        Err(err) => {
                            let status = err.as_response_error().status_code().as_u16();
                            metrics::observe_http_request(&method, &path, status, start.elapsed());
                            Err(err)
                        }
                    }
                }
            })
            .configure(handlers::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
