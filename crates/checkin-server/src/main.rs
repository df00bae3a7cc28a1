use anyhow::Context;
use checkin_server::{
    config::{Cli, Command},
    db::Db,
    gc, router, seed, AppState,
};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::new(&cli.log))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = cli.to_config();

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;
    let db = Db::open(&config.db_path())?;

    match cli.command() {
        Command::InitDb => {
            seed::init_db(&db)?;
            println!("OK: andmebaas loodud ja algandmed sisestatud.");
        }
        Command::Serve => {
            if config.uses_default_secret() {
                warn!("SECRET_KEY is not set; using the development default");
            }
            info!("starting server with config: {:?}", config);

            let listen = config.listen;
            let state = AppState::new(db, config);
            gc::spawn_session_gc(state.clone());

            let app = router(state);
            let listener = tokio::net::TcpListener::bind(listen)
                .await
                .with_context(|| format!("binding {listen}"))?;
            info!("listening on http://{}", listen);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                warn!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown requested");
}
