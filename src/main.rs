use anyhow::Result;
use clap::Parser;
use flexi_logger::{Duplicate, FileSpec};

use invgraph::config::Config;

#[derive(Parser)]
#[clap(version = "0.1.0", author = "invgraph contributors")]
enum Cli {
    /// Start the inventory graph service
    Serve {
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli {
        Cli::Serve { config } => {
            let config = match Config::load(&config) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!(
                        "Failed to load config from '{}': {}, using default config",
                        config, e
                    );
                    Config::default()
                }
            };
            // Keep the handle alive; dropping it shuts the logger down.
            let _logger = init_logging(&config)?;
            invgraph::api::start_service(config).await?;
        }
    }

    Ok(())
}

fn init_logging(config: &Config) -> Result<flexi_logger::LoggerHandle> {
    let handle = flexi_logger::Logger::try_with_str(&config.log_level)?
        .log_to_file(
            FileSpec::default()
                .directory(&config.log_dir)
                .basename(&config.log_file),
        )
        .duplicate_to_stderr(Duplicate::Info)
        .start()?;
    Ok(handle)
}
