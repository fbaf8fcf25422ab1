use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;
use vitae_core::{ParserConfig, ResumePipeline};

pub struct Options {
    pub output: Option<PathBuf>,
    pub pretty: bool,
    pub format: Option<String>,
    pub no_ocr: bool,
    pub tesseract_cmd: Option<PathBuf>,
    pub with_sections: bool,
}

pub async fn run(mut config: ParserConfig, files: &[PathBuf], options: &Options) -> Result<()> {
    if options.no_ocr {
        config.ocr_enabled = false;
    }
    if let Some(cmd) = &options.tesseract_cmd {
        config.tesseract_cmd = Some(cmd.clone());
    }
    let pipeline = ResumePipeline::from_config(&config)?;

    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        documents.push(parse_one(&pipeline, path, options).await?);
    }

    let value = if documents.len() == 1 {
        documents.remove(0)
    } else {
        Value::Array(documents)
    };
    let json = if options.pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };

    match &options.output {
        Some(out) => std::fs::write(out, json + "\n")
            .with_context(|| format!("failed to write {}", out.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

async fn parse_one(pipeline: &ResumePipeline, path: &Path, options: &Options) -> Result<Value> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let hint = options
        .format
        .as_deref()
        .or_else(|| path.extension().and_then(|e| e.to_str()));

    let output = pipeline
        .parse_bytes(&data, hint)
        .await
        .with_context(|| format!("failed to parse {}", path.display()))?;
    debug!(
        path = %path.display(),
        fields = output.stats.fields_kept,
        ms = output.stats.duration_ms,
        "parsed"
    );

    let value = if options.with_sections {
        serde_json::to_value(&output)?
    } else {
        serde_json::to_value(&output.record)?
    };
    Ok(value)
}
