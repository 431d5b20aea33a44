//! CLI module - Command-line interface for Reviewarr
//!
//! This module provides a structured CLI using clap for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Reviewarr - Title Review Service
/// A REST backend for reviewing and rating titles
#[derive(Parser)]
#[command(name = "reviewarr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server (default when no command given)
    #[command(alias = "-d", alias = "--serve")]
    Serve,

    /// Load fixture data from a directory of CSV files
    #[command(alias = "import")]
    LoadCsv {
        /// Directory containing users.csv, category.csv, genre.csv,
        /// titles.csv, genre_title.csv, review.csv and comments.csv
        dir: PathBuf,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}
