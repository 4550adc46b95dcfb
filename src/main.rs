use clap::Parser;
use color_eyre::Result;
use fundsctl::app::App;
use fundsctl::config::Config;
use fundsctl::credentials::EnvCredentials;
use fundsctl::funds::FundsClient;
use fundsctl::logging;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fundsctl")]
#[command(about = "A terminal console for initiative activities and their budgets")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/fundsctl/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Initiative whose activities to show
  #[arg(short, long)]
  initiative: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;

  // Override initiative if specified on command line
  let config = if let Some(initiative) = args.initiative {
    Config {
      default_initiative: Some(initiative),
      ..config
    }
  } else {
    config
  };

  // Flushes buffered log lines on drop
  let _log_guard = logging::init(&config.log)?;

  let client = FundsClient::new(&config)?;
  let mut app = App::new(&config, client, &EnvCredentials);
  app.run().await?;

  Ok(())
}
