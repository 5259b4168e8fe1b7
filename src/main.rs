use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process;

use structopt::StructOpt;

use incognito::config::{vprint, Cli, Config};
use incognito::loader::{self, NaPolicy};
use incognito::prelude::*;

fn main() {
    let cli = Cli::from_args();

    let config = match Config::new(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load config: {}", err);
            process::exit(1);
        }
    };

    if let Err(err) = execute(&config) {
        eprintln!("{}", describe_error(&err));
        process::exit(exit_code(&err));
    }
}

fn execute(config: &Config) -> IncognitoResult<()> {
    vprint(config, &format!("loading dataset {:?}", config.dataset_path()));
    let table = loader::read_dataset(&config.dataset_path(), config.separator as u8, &config.na_sentinel)?;

    vprint(config, &format!("loading hierarchies from {:?}", config.hierarchies_dir_path()));
    let entries = loader::read_hierarchies(&config.hierarchies_dir_path(), &config.qid_columns)?;
    let vgh = VghStore::from_entries(entries);

    let policy = if config.dropna {
        NaPolicy::DropRows
    } else {
        NaPolicy::Keep
    };
    let table = loader::apply_na_policy(table, &config.qid_columns, &policy);

    vprint(config, &format!("searching over {} quasi-identifiers, k={}", config.qid_columns.len(), config.k));
    let results = run_with_verification(&table, &config.qid_columns, &vgh, config.k, config)?;

    write_results(config, &results)
}

/// Runs the search, and in verbose mode re-verifies every returned vector against the
/// evaluator directly as a sanity check before reporting it.
fn run_with_verification(
    table: &Table,
    columns: &[String],
    vgh: &VghStore,
    k: u32,
    config: &Config,
) -> IncognitoResult<Vec<Vector>> {
    let results = incognito::driver::run_verbose(table, columns, vgh, k, None, Some(config))?;

    if config.verbose {
        for vector in &results {
            let verified = incognito::evaluator::is_k_anonymous(table, vgh, vector, k)?;
            vprint(config, &format!("verifying {:?}: {}", vector, verified));
        }
    }

    Ok(results)
}

fn write_results(config: &Config, results: &[Vector]) -> IncognitoResult<()> {
    let mut writer: Box<dyn Write> = match &config.output_file {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };

    for vector in results {
        let line = vector
            .iter()
            .map(|(column, level)| format!("{}={}", column, level))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(writer, "{}", line)?;
    }

    Ok(())
}

fn describe_error(err: &IncognitoError) -> String {
    match err {
        IncognitoError::UnknownColumn(c) => format!("unknown column: {}", c),
        IncognitoError::UnknownDataset(d) => format!("unknown dataset: {}", d),
        IncognitoError::HierarchyFileNotFound(c, p) => {
            format!("no hierarchy file for column {} at {:?}", c, p)
        }
        other => other.to_string(),
    }
}

fn exit_code(err: &IncognitoError) -> i32 {
    match err {
        IncognitoError::UnknownColumn(_) => 2,
        IncognitoError::UnknownDataset(_) => 3,
        IncognitoError::HierarchyFileNotFound(_, _) => 4,
        _ => 1,
    }
}
