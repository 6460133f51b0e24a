// Tabula CLI - headless spreadsheet operations

mod load;
mod output;
mod script;

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

use tabula_engine::sheet::Sheet;

// Exit codes are part of the shell contract. Usage errors exit 2 via clap.
const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;

#[derive(Parser)]
#[command(name = "tabula")]
#[command(about = "In-memory spreadsheet engine (CLI mode, headless)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a mutation script against an empty sheet and print the result
    #[command(after_help = "\
Script lines:
  A1=raw text      set a cell (a second '=' starts a formula: B1==A1*2)
  clear A1         reset a cell
  # ...            comment

Examples:
  tabula run model.tab
  echo 'A1=2
B1==A1*21' | tabula run -")]
    Run {
        /// Script file (omit or "-" to read stdin)
        script: Option<PathBuf>,

        /// Print cell texts instead of computed values
        #[arg(long)]
        texts: bool,

        /// Output format
        #[arg(long, short = 'f', default_value = "grid")]
        format: OutputFormat,

        /// Trace each operation on stderr
        #[arg(long, short = 'v')]
        verbose: bool,
    },

    /// Load a delimited file into the sheet and print the evaluated grid
    #[command(after_help = "\
Examples:
  tabula csv data.csv
  tabula csv data.csv --texts
  cat data.csv | tabula csv - -f json")]
    Csv {
        /// Input file (omit or "-" to read stdin)
        input: Option<PathBuf>,

        /// Field delimiter
        #[arg(long, default_value = ",")]
        delimiter: char,

        /// Print cell texts instead of computed values
        #[arg(long)]
        texts: bool,

        /// Output format
        #[arg(long, short = 'f', default_value = "grid")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Tab-separated printable rectangle
    Grid,
    /// JSON dump of every non-empty cell
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run {
            script,
            texts,
            format,
            verbose,
        } => {
            let source = read_input(script.as_deref())?;
            let mut sheet = Sheet::new();
            script::run_script(&mut sheet, &source, verbose)?;
            emit(&sheet, texts, format)
        }
        Commands::Csv {
            input,
            delimiter,
            texts,
            format,
        } => {
            let delimiter =
                u8::try_from(delimiter).context("delimiter must be a single ASCII character")?;
            let data = read_input(input.as_deref())?;
            let mut sheet = Sheet::new();
            load::load_csv(&mut sheet, data.as_bytes(), delimiter)?;
            emit(&sheet, texts, format)
        }
    }
}

fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(p) if p != Path::new("-") => {
            fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))
        }
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}

fn emit(sheet: &Sheet, texts: bool, format: OutputFormat) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Grid => {
            if texts {
                sheet.print_texts(&mut out)?;
            } else {
                sheet.print_values(&mut out)?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &output::dump(sheet))?;
            writeln!(out)?;
        }
    }
    Ok(())
}
