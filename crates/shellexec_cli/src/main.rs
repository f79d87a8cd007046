mod lifecycle;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use shellexec_core::ShellexecConfig;
use shellexec_gateway::GatewayServer;
use shellexec_os::Execution;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "shellexec", author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "SHELLEXEC_CONFIG", default_value = "shellexec.toml")]
    config: PathBuf,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sync and run the script, then serve the HTTP trigger (default)
    Serve,
    /// Sync and run the script once, exiting with its exit code
    Run,
    /// Replace the configured script with the contents of FILE
    SetScript {
        file: PathBuf,
    },
    /// Print the configured script
    Show,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.json);

    let config = ShellexecConfig::load_or_default(&args.config);
    let engine = lifecycle::build_engine(&config).await;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!("Initializing Shell Executor...");
            lifecycle::on_load(&engine, config.executor.run_on_startup).await;

            let server = GatewayServer::new(
                engine,
                config.gateway.api_token.clone(),
                &config.gateway.host,
                config.gateway.port,
            );
            server.serve(shutdown_signal()).await?;
            info!("Shell Executor stopped");
        }
        Command::Run => {
            lifecycle::on_load(&engine, false).await;
            match engine.execute().await {
                Execution::Completed(result) => {
                    print!("{}", result.stdout);
                    eprint!("{}", result.stderr);
                    // process::exit skips the stdout flush
                    std::io::stdout().flush()?;
                    std::process::exit(result.exit_code);
                }
                Execution::Skipped { reason } => bail!(reason),
                Execution::Failed { error } => bail!(error),
            }
        }
        Command::SetScript { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            lifecycle::on_config_updated(&engine, &content).await?;
            println!("Script saved to {}", engine.script_path().await.display());
        }
        Command::Show => {
            print!("{}", engine.config().await.script_content);
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
