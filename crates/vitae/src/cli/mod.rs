pub mod config;
pub mod parse;
pub mod sections;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "vitae",
    about = "Extract structured data from resumes",
    version
)]
pub struct Cli {
    /// JSON config file (defaults to $VITAE_CONFIG, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse resumes and print the extracted record as JSON
    Parse {
        /// Resume file(s): pdf, docx, txt, md or an image
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Write JSON to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pretty-print the JSON
        #[arg(short, long)]
        pretty: bool,
        /// Input format (extension or MIME type) instead of guessing
        #[arg(long)]
        format: Option<String>,
        /// Never fall back to OCR
        #[arg(long)]
        no_ocr: bool,
        /// Path to the tesseract executable
        #[arg(long)]
        tesseract_cmd: Option<PathBuf>,
        /// Print sections and stats alongside the record
        #[arg(long)]
        with_sections: bool,
    },
    /// Show how a resume was split into sections
    Sections {
        /// Resume file
        file: PathBuf,
    },
    /// Print the effective configuration
    Config,
}
