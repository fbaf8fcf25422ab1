use std::path::Path;

use anyhow::{Context, Result};
use vitae_core::{ParserConfig, ResumePipeline};

pub async fn run(config: &ParserConfig, file: &Path) -> Result<()> {
    let pipeline = ResumePipeline::from_config(config)?;
    let output = pipeline
        .parse_file(file)
        .await
        .with_context(|| format!("failed to parse {}", file.display()))?;

    for section in &output.sections {
        println!(
            "{:<15} {:>4}-{:<4} {}",
            section.kind,
            section.start_line,
            section.end_line,
            section.header.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
