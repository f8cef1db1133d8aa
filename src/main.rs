use std::sync::Arc;

use actix_web::web;
use dotenvy::dotenv;
use order_intake::application::OrderService;
use order_intake::clock::SystemClock;
use order_intake::config::Config;
use order_intake::domain::ports::RowStore;
use order_intake::infrastructure::DieselRowStore;
use order_intake::scheduler::spawn_retention_sweeper;
use order_intake::{build_server, create_pool, run_migrations};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().expect("Invalid configuration");

    let pool = create_pool(&config.database_url).expect("Failed to create database connection pool");
    run_migrations(&pool);

    let store: Box<dyn RowStore> = Box::new(DieselRowStore::new(pool));
    let service = web::Data::new(OrderService::new(
        store,
        Arc::new(SystemClock::new(config.utc_offset)),
        config.orders.clone(),
    ));

    if config.sweep_enabled {
        log::info!(
            "Retention sweep every {:?}, keeping {} days",
            config.sweep_interval,
            config.orders.retention_days
        );
        spawn_retention_sweeper(service.clone().into_inner(), config.sweep_interval);
    }

    log::info!(
        "Starting server at http://{}:{} (sheet '{}', listing window {})",
        config.host,
        config.port,
        config.orders.orders_sheet,
        config.orders.listing_window
    );

    build_server(service, &config.host, config.port)?.await
}
