/// PromptCut Service - HTTP Server
///
/// Upload reservation, payment gating, directive compilation, and the
/// edit-job lifecycle behind one HTTP surface.
use actix_cors::Cors;
use actix_web::{middleware as actix_middleware, web, App, HttpServer};
use promptcut_service::handlers;
use promptcut_service::middleware;
use promptcut_service::services::{
    jobs, storage, DetachedEngine, ExecutionEngine, JobService, MockEngine,
};
use promptcut_service::Config;
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Interval of the background sweep that reclaims expired outputs
const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Invalid configuration: {e}")))?;

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!(%bind_address, env = %config.app.env, "promptcut-service starting");

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Database connect failed: {e}")))?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Migration failed: {e}")))?;

    let s3_client = storage::get_s3_client(&config.s3)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("S3 init failed: {e}")))?;

    if let Err(e) = storage::health_check(&s3_client, &config.s3).await {
        return Err(io::Error::new(io::ErrorKind::Other, format!("{e}")));
    }

    let engine: Arc<dyn ExecutionEngine> = if config.engine.enable_mock {
        tracing::info!("using in-process mock execution engine");
        Arc::new(MockEngine::new(db_pool.clone()))
    } else {
        tracing::info!("expecting external execution engine callbacks");
        Arc::new(DetachedEngine)
    };

    let job_service = web::Data::new(JobService::new(db_pool.clone(), engine));

    // Reclamation sweep for outputs whose download window has closed.
    // Reads apply expiry lazily as well, so a missed tick is harmless.
    {
        let sweep_pool = db_pool.clone();
        let sweep_client = s3_client.clone();
        let sweep_s3_config = config.s3.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(EXPIRY_SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                match jobs::run_expiry_sweep(&sweep_pool).await {
                    Ok(expired) => {
                        for job in expired {
                            if let Some(key) = job.download_key {
                                if let Err(e) =
                                    storage::delete_object(&sweep_client, &sweep_s3_config, &key)
                                        .await
                                {
                                    tracing::warn!(job_id = %job.id, error = %e, "output cleanup failed");
                                }
                            }
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "expiry sweep failed"),
                }
            }
        });
    }

    let config_data = web::Data::new(config.clone());
    let pool_data = web::Data::new(db_pool);
    let s3_data = web::Data::new(s3_client);

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST"])
            .allow_any_header()
            .max_age(3600);
        for origin in &config.cors.allowed_origins {
            cors = if origin == "*" {
                Cors::permissive()
            } else {
                cors.allowed_origin(origin)
            };
        }

        App::new()
            .app_data(config_data.clone())
            .app_data(pool_data.clone())
            .app_data(s3_data.clone())
            .app_data(job_service.clone())
            .wrap(cors)
            .wrap(actix_middleware::Logger::default())
            .route("/api/v1/health", web::get().to(handlers::health))
            .route(
                "/api/v1/health/ready",
                web::get().to(|| async { actix_web::HttpResponse::Ok().finish() }),
            )
            .route(
                "/api/v1/health/live",
                web::get().to(|| async { actix_web::HttpResponse::Ok().finish() }),
            )
            .route("/metrics", web::get().to(handlers::metrics_endpoint))
            .service(
                web::scope("/internal")
                    .route("/jobs/{job_id}/result", web::post().to(handlers::job_result)),
            )
            .service(
                web::scope("/api/v1")
                    .wrap(middleware::IdentityMiddleware)
                    .wrap(middleware::MetricsMiddleware)
                    .service(
                        web::scope("/uploads")
                            .route("", web::post().to(handlers::init_upload))
                            .route("/{session_id}", web::get().to(handlers::get_session))
                            .route(
                                "/{session_id}/complete",
                                web::post().to(handlers::complete_upload),
                            ),
                    )
                    .service(
                        web::scope("/billing")
                            .route("/quote", web::get().to(handlers::preview_quote))
                            .route(
                                "/quotes/{quote_id}/confirm",
                                web::post().to(handlers::confirm_quote),
                            ),
                    )
                    .service(
                        web::scope("/jobs")
                            .route("", web::post().to(handlers::create_job))
                            .route("", web::get().to(handlers::list_jobs))
                            .route("/{job_id}", web::get().to(handlers::get_job))
                            .route("/{job_id}/download", web::get().to(handlers::download_job)),
                    ),
            )
    })
    .bind(&bind_address)?
    .run()
    .await
}
