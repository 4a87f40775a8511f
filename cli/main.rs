#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{Parser, ValueEnum};
use log::info;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;

use binarymap::table::load_variant_frame;
use binarymap::{AlphabetChoice, AnyBinaryMap, BinaryMapConfig};

#[derive(Clone, ValueEnum)]
pub enum AlphabetCli {
    AminoAcids,
    AminoAcidsWithStop,
    AminoAcidsWithGap,
    AminoAcidsWithStopAndGap,
}

impl From<AlphabetCli> for AlphabetChoice {
    fn from(choice: AlphabetCli) -> Self {
        match choice {
            AlphabetCli::AminoAcids => AlphabetChoice::AminoAcids,
            AlphabetCli::AminoAcidsWithStop => AlphabetChoice::AminoAcidsWithStop,
            AlphabetCli::AminoAcidsWithGap => AlphabetChoice::AminoAcidsWithGap,
            AlphabetCli::AminoAcidsWithStopAndGap => AlphabetChoice::AminoAcidsWithStopAndGap,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "binarymap",
    about = "Encode sequence variants as one-hot binary feature vectors",
    long_about = "Reads a CSV/TSV table of variants, builds the substitution index, and \
                 writes the feature table (index, site, substitution) to stdout."
)]
struct Cli {
    /// Path to a CSV or TSV (.tsv/.tab) file with a header row
    input: PathBuf,

    /// TOML file with binary map options; flags below override it
    #[arg(long, value_name = "TOML")]
    config: Option<PathBuf>,

    /// Name of the column holding space-delimited substitutions
    #[arg(long)]
    substitutions_col: Option<String>,

    #[arg(long, value_enum)]
    alphabet: Option<AlphabetCli>,

    /// Treat sites as strings so they may carry suffixes like 214a
    #[arg(long)]
    sites_as_str: bool,

    /// Encode every alphabet character at every site of --wtseq
    #[arg(long)]
    expand: bool,

    /// Wildtype sequence, required by --expand
    #[arg(long)]
    wtseq: Option<String>,

    /// File of whitespace-separated substitutions to index exactly
    #[arg(long, value_name = "FILE")]
    allowed_subs: Option<PathBuf>,

    /// Fail when a named annotation column is absent
    #[arg(long)]
    no_optional_cols: bool,

    /// Also print the active indices of every variant
    #[arg(long)]
    rows: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading options from: {}", path.display());
            BinaryMapConfig::load(path)?
        }
        None => BinaryMapConfig::default(),
    };

    if let Some(col) = cli.substitutions_col {
        config.columns.substitutions_col = col;
    }
    if let Some(alphabet) = cli.alphabet {
        config.alphabet = alphabet.into();
    }
    if cli.no_optional_cols {
        config.columns.cols_optional = false;
    }
    config.sites_as_str |= cli.sites_as_str;
    config.expand |= cli.expand;
    if cli.wtseq.is_some() {
        config.wtseq = cli.wtseq;
    }
    if let Some(path) = &cli.allowed_subs {
        let tokens = fs::read_to_string(path)?
            .split_whitespace()
            .map(str::to_string)
            .collect();
        config.allowed_subs = Some(tokens);
    }

    let frame = load_variant_frame(&cli.input)?;
    let map = config.build(&frame)?;
    info!(
        "Encoded {} variants into {} features ({:?} sites)",
        map.nvariants(),
        map.binarylength(),
        map.site_kind()
    );

    write_feature_table(&map)?;
    if cli.rows {
        write_row_indices(&map)?;
    }
    Ok(())
}

fn write_feature_table(map: &AnyBinaryMap) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(io::stdout().lock());
    writer.write_record(["index", "site", "substitution"])?;
    for (index, site) in map.binary_sites().iter().enumerate() {
        writer.write_record([index.to_string(), site.clone(), map.i_to_sub(index)?])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_row_indices(map: &AnyBinaryMap) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(io::stdout().lock());
    writer.write_record(["row", "variant", "indices"])?;
    let matrix = map.binary_variants();
    for (row, variant) in map.substitution_variants().iter().enumerate() {
        let indices = matrix
            .row(row)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        writer.write_record([row.to_string(), variant.clone(), indices])?;
    }
    writer.flush()?;
    Ok(())
}
