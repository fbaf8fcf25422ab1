mod cli;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli::config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Parse {
            files,
            output,
            pretty,
            format,
            no_ocr,
            tesseract_cmd,
            with_sections,
        } => {
            let options = cli::parse::Options {
                output,
                pretty,
                format,
                no_ocr,
                tesseract_cmd,
                with_sections,
            };
            cli::parse::run(config, &files, &options).await
        }
        Commands::Sections { file } => cli::sections::run(&config, &file).await,
        Commands::Config => cli::config::run(&config),
    }
}
