use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use course_server::{
    config::Config,
    db,
    server::{Server, router},
    utils::init_log,
};
use rustls::crypto::{CryptoProvider, aws_lc_rs};
use tracing::info;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file, defaults are used when absent
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long)]
    database: Option<PathBuf>,
    #[arg(short = 'H', long)]
    host: Option<String>,
    #[arg(short, long)]
    port: Option<u16>,
    /// Directory for daily log files, stdout when absent
    #[arg(short, long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(database) = args.database {
        config.database = database;
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.log_dir.is_some() {
        config.log_dir = args.log_dir;
    }
    let _guard = init_log(config.log_dir.clone(), &config.log_level)?;
    info!("{:?}", config);

    let database = db::connect(&config.database).await?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let tls = config.tls.clone();
    let server = Arc::new(Server::new(config, database)?);
    let app = router(server);

    match tls {
        Some(tls) => {
            CryptoProvider::install_default(aws_lc_rs::default_provider()).map_err(|e| {
                anyhow::anyhow!("Failed to initialize rustls crypto provider: {:?}", e)
            })?;
            let rustls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
            info!("Starting server at https://{}", addr);
            info!("Swagger UI available at https://{}/swagger-ui/", addr);
            axum_server::bind_rustls(addr, rustls_config)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!("Starting server at http://{}", addr);
            info!("Swagger UI available at http://{}/swagger-ui/", addr);
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
