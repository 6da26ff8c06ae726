use autolink::cli;
use autolink::cli::Cli;
use autolink::cli::Commands;
use autolink::Autolink;
use autolink::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = cli::load_config(&cli)?;

    if cli.verbose {
        autolink::logging::init_with_level("debug")?;
    } else {
        autolink::logging::init(&config.logging)?;
    }

    match &cli.command {
        Commands::Handle { payload } => {
            let autolink = Autolink::connect(&config).await?;
            cli::handle_payload_command(&autolink, payload).await?;
        }
        Commands::Plan => {
            let autolink = Autolink::connect(&config).await?;
            cli::handle_plan_command(&autolink)?;
        }
        Commands::Check => {
            cli::handle_check_command(&config).await?;
        }
    }

    Ok(())
}
