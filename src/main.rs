use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chanarchive::app::AppContext;
use chanarchive::cli::{commands, Cli, Commands};
use chanarchive::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chanarchive=info")))
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Archive(args) => {
            commands::apply_overrides(&mut config, &args);
            let ctx = AppContext::new(config)?;
            let running = Arc::new(AtomicBool::new(true));
            spawn_shutdown_listener(running.clone());

            if let Err(e) = commands::archive(&ctx, args.resume, running).await {
                tracing::error!("Archive run failed: {:#}", e);
                return Err(e);
            }
        }
        Commands::Dialogs => {
            let ctx = AppContext::new(config)?;
            commands::list_dialogs(&ctx).await?;
        }
        Commands::Status { channel } => {
            if channel.is_some() {
                config.channel_name = channel;
            }
            let ctx = AppContext::new(config)?;
            commands::status(&ctx).await?;
        }
    }

    Ok(())
}

/// Clear `running` on SIGINT/SIGTERM so the driver stops between posts.
fn spawn_shutdown_listener(running: Arc<AtomicBool>) {
    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                _ => {
                    tracing::warn!("Failed to install signal handlers");
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
        }
        tracing::info!("Shutdown requested, finishing current post");
        running.store(false, Ordering::SeqCst);
    });

    #[cfg(not(unix))]
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutdown requested, finishing current post");
        running.store(false, Ordering::SeqCst);
    });
}
