use actix_web::{middleware, HttpServer};
use clap::Parser;
use log::info;

use expense_tracker::{
    auth::TokenKeys,
    build_app,
    cli::{self, Cli, Command},
    config::{ClientConfig, ServerConfig},
    db, AppState,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => {
            env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
            serve().await
        }
        command => {
            env_logger::init_from_env(env_logger::Env::new().default_filter_or("warn"));
            if let Err(e) = cli::run(command, ClientConfig::from_env()).await {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

async fn serve() -> std::io::Result<()> {
    let config = ServerConfig::from_env().map_err(|e| {
        log::error!("FATAL: {}", e);
        e
    })?;

    let db_pool = db::connect(&config.database_url).await?;
    let tokens = TokenKeys::new(config.jwt_secret.as_bytes());

    info!(
        "Starting HTTP server on http://{}:{}/",
        config.host, config.port
    );

    HttpServer::new(move || {
        build_app(AppState {
            db_pool: db_pool.clone(),
            tokens: tokens.clone(),
        })
        // enable automatic response compression - usually register this first
        .wrap(middleware::Compress::default())
        // enable logger - always register Actix Web Logger middleware last
        .wrap(middleware::Logger::default())
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
