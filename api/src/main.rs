use std::sync::Arc;

use actix_cors::Cors;
use actix_web::App;
use actix_web::middleware::Logger;
use actix_web::web::Data;
use clap::Parser;
use log::info;
use paperclip::actix::{OpenApiExt, web};
use sqlx::postgres::PgPoolOptions;
use webhook_api::{APP_TITLE, handlers, openapi};
use webhook_core::CommonConfig;
use webhook_core::cache::SubscriptionCache;
use webhook_core::store::{MIGRATOR, PgStore};

use handlers::AppState;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = APP_TITLE)]
struct Config {
    #[command(flatten)]
    common: CommonConfig,

    /// IP address on which to start the HTTP server.
    #[arg(long, env, default_value = "127.0.0.1")]
    ip: String,

    /// Port on which to start the HTTP server.
    #[arg(long, env, default_value_t = 8080)]
    port: u16,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    webhook_core::logging::init();
    let config = Config::parse();

    let pool = PgPoolOptions::new()
        .max_connections(config.common.max_db_connections)
        .connect(&config.common.database_url)
        .await?;
    MIGRATOR.run(&pool).await?;
    info!(
        "started a pool of maximum {} DB connections",
        config.common.max_db_connections
    );

    let cache = SubscriptionCache::connect(&config.common.redis_url).await?;
    let state = AppState {
        store: Arc::new(PgStore::new(pool)),
        cache,
    };

    info!("starting {APP_TITLE} on {}:{}", config.ip, config.port);
    actix_web::HttpServer::new(move || {
        App::new()
            .app_data(Data::new(state.clone()))
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .wrap_api_with_spec(openapi::default_spec())
            .service(
                web::scope("/api/v1")
                    .service(web::resource("/health").route(web::get().to(handlers::health::health)))
                    .service(
                        web::scope("/subscriptions")
                            .service(
                                web::resource("")
                                    .route(web::get().to(handlers::subscriptions::list))
                                    .route(web::post().to(handlers::subscriptions::create)),
                            )
                            .service(
                                web::resource("/{subscription_id}")
                                    .route(web::get().to(handlers::subscriptions::get))
                                    .route(web::put().to(handlers::subscriptions::update))
                                    .route(web::delete().to(handlers::subscriptions::delete)),
                            ),
                    )
                    .service(
                        web::scope("/webhooks")
                            .service(
                                web::resource("/ingest/{subscription_id}")
                                    .route(web::post().to(handlers::webhooks::ingest)),
                            )
                            .service(
                                web::resource("/{webhook_id}/status")
                                    .route(web::get().to(handlers::webhooks::status)),
                            )
                            .service(
                                web::resource("/subscription/{subscription_id}")
                                    .route(web::get().to(handlers::webhooks::list_for_subscription)),
                            ),
                    )
                    .service(
                        web::scope("/stats").service(
                            web::resource("/subscription/{subscription_id}")
                                .route(web::get().to(handlers::stats::stats)),
                        ),
                    ),
            )
            .with_json_spec_at("/api/spec/v1")
            .build()
    })
    .bind((config.ip.as_str(), config.port))?
    .run()
    .await
    .map_err(Into::into)
}
