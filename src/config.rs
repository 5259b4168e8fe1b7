use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use serde::Deserialize;
use structopt::StructOpt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

const DEFAULT_DATASET: &str = "adult";
const DEFAULT_K: u32 = 10;
const DEFAULT_NA_SENTINEL: &str = "?";
const DEFAULT_SEPARATOR: char = ';';

fn default_qid_columns() -> Vec<String> {
    vec![
        "workclass".to_string(),
        "sex".to_string(),
        "education".to_string(),
    ]
}

/// Settings accepted from an optional `--config-file` JSON document.
///
/// Every field is optional: anything left unset falls back to the CLI flag's own default, and
/// any CLI flag that was explicitly passed always wins over the file.
#[allow(non_snake_case)]
#[derive(Deserialize, Debug, Default)]
pub struct RawConfig {
    resourceDir: Option<PathBuf>,
    hierarchiesDir: Option<PathBuf>,
    dataset: Option<String>,
    k: Option<u32>,
    qidColumns: Option<Vec<String>>,
    dropna: Option<bool>,
    naSentinel: Option<String>,
    separator: Option<char>,
}

/// Command-line interface for the Incognito search tool.
#[derive(StructOpt, Debug)]
#[structopt(name = "incognito")]
pub struct Cli {
    /// Name of the dataset to load (looked up under --resource-dir/{dataset}/{dataset}.csv)
    #[structopt(long = "dataset")]
    pub dataset: Option<String>,

    /// k-anonymity parameter
    #[structopt(short = "k", long = "k")]
    pub k: Option<u32>,

    /// Quasi-identifier columns, in a fixed order (repeat the flag to list more than one)
    #[structopt(long = "qid")]
    pub qid_columns: Vec<String>,

    /// Path to the root directory of resources (datasets and hierarchies)
    #[structopt(short = "p", long = "resource-dir", parse(from_os_str))]
    pub resource_dir: Option<PathBuf>,

    /// Directory containing one hierarchy file per quasi-identifier column
    #[structopt(long = "hierarchies-dir", parse(from_os_str))]
    pub hierarchies_dir: Option<PathBuf>,

    /// Path to an optional settings file in JSON format
    #[structopt(short = "r", long = "config-file", parse(from_os_str))]
    pub config_file: Option<PathBuf>,

    /// Drop records containing the NaN sentinel in any quasi-identifier column
    #[structopt(long = "dropna")]
    pub dropna: bool,

    /// String used in the dataset to represent a missing value
    #[structopt(long = "na-sentinel")]
    pub na_sentinel: Option<String>,

    /// Field separator used by the dataset and CSV-matrix hierarchy files (reference datasets
    /// mix ';' and ',')
    #[structopt(long = "separator")]
    pub separator: Option<char>,

    /// Enable verbose diagnostic output on stderr
    #[structopt(short = "v", long = "verbose")]
    pub verbose: bool,

    /// Output file: if not present, results are printed to stdout
    #[structopt(short = "o", long = "output", parse(from_os_str))]
    pub output_file: Option<PathBuf>,
}

/// Fully-resolved configuration: CLI flags merged over an optional settings file.
#[derive(Debug)]
pub struct Config {
    pub resource_dir: PathBuf,
    pub hierarchies_dir: Option<PathBuf>,
    pub dataset: String,
    pub k: u32,
    pub qid_columns: Vec<String>,
    pub dropna: bool,
    pub na_sentinel: String,
    pub separator: char,
    pub verbose: bool,
    pub output_file: Option<PathBuf>,
}

impl Config {
    pub fn new(cli: &Cli) -> Result<Self, ConfigError> {
        let raw_config: RawConfig = match &cli.config_file {
            Some(path) => {
                let file = File::open(path)?;
                let reader = BufReader::new(file);
                serde_json::from_reader(reader)?
            }
            None => RawConfig::default(),
        };

        let resource_dir = cli
            .resource_dir
            .clone()
            .or(raw_config.resourceDir)
            .unwrap_or_else(|| PathBuf::from("."));

        let hierarchies_dir = cli
            .hierarchies_dir
            .clone()
            .or(raw_config.hierarchiesDir)
            .map(|p| Self::join_if_relative(&resource_dir, p));

        let dataset = cli
            .dataset
            .clone()
            .or(raw_config.dataset)
            .unwrap_or_else(|| DEFAULT_DATASET.to_string());

        let k = cli.k.or(raw_config.k).unwrap_or(DEFAULT_K);

        let qid_columns = if !cli.qid_columns.is_empty() {
            cli.qid_columns.clone()
        } else {
            raw_config.qidColumns.unwrap_or_else(default_qid_columns)
        };

        let dropna = cli.dropna || raw_config.dropna.unwrap_or(false);

        let na_sentinel = cli
            .na_sentinel
            .clone()
            .or(raw_config.naSentinel)
            .unwrap_or_else(|| DEFAULT_NA_SENTINEL.to_string());

        let separator = cli.separator.or(raw_config.separator).unwrap_or(DEFAULT_SEPARATOR);

        Ok(Config {
            resource_dir,
            hierarchies_dir,
            dataset,
            k,
            qid_columns,
            dropna,
            na_sentinel,
            separator,
            verbose: cli.verbose,
            output_file: cli.output_file.clone(),
        })
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.resource_dir
            .join(&self.dataset)
            .join(format!("{}.csv", self.dataset))
    }

    pub fn hierarchies_dir_path(&self) -> PathBuf {
        self.hierarchies_dir
            .clone()
            .unwrap_or_else(|| self.resource_dir.join(&self.dataset).join("hierarchies"))
    }

    fn join_if_relative(resource_dir: &PathBuf, file_path: PathBuf) -> PathBuf {
        if file_path.is_absolute() {
            file_path
        } else {
            resource_dir.join(file_path)
        }
    }
}

/// Print a diagnostic line to stderr, but only when verbose mode is enabled.
pub fn vprint(config: &Config, message: &str) {
    if config.verbose {
        eprintln!("{}", message);
    }
}
