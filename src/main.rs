use anyhow::Result;
use clap::Parser;
use segue::{
    app,
    cli::{handle_inspect_command, handle_locate_command, load_fragments, Cli, CliCommand},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        CliCommand::Version => {
            println!("segue {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliCommand::Inspect(args) => handle_inspect_command(args).await,
        CliCommand::Locate(args) => handle_locate_command(args).await,
        CliCommand::Serve(args) => {
            let fragments = load_fragments(&args.source)?;
            app::run_service(fragments, args.port).await
        }
    }
}
