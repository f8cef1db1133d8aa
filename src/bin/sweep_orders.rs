//! Runs one retention sweep against the configured sheet and exits.
//!
//! Takes an optional sheet name as its only argument.

use std::sync::Arc;

use dotenvy::dotenv;
use order_intake::application::OrderService;
use order_intake::clock::SystemClock;
use order_intake::config::Config;
use order_intake::infrastructure::DieselRowStore;
use order_intake::{create_pool, run_migrations};

fn main() {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().expect("Invalid configuration");
    let sheet = std::env::args().nth(1);

    let pool = create_pool(&config.database_url).expect("Failed to create database connection pool");
    run_migrations(&pool);

    let service = OrderService::new(
        DieselRowStore::new(pool),
        Arc::new(SystemClock::new(config.utc_offset)),
        config.orders,
    );
    let report = service.sweep_expired(sheet.as_deref());

    println!(
        "examined {} rows, {} expired, {} deleted, {} skipped",
        report.examined, report.expired, report.deleted, report.skipped
    );
}
