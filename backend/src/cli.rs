//! Command-line front end over [`RecordStorage`].

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use record_store::config::{self, StoreConfig};
use record_store::storage::csv::codec;
use record_store::{Fields, ImportMode, Outcome, RecordId, RecordStorage, Table, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "record-store")]
#[command(about = "Store records in a CSV file or a Google Sheets worksheet", long_about = None)]
pub struct Cli {
    /// Config file (default: $RECORD_STORE_CONFIG or record-store.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print every record
    List {
        /// Output JSON instead of CSV
        #[arg(long)]
        json: bool,
    },

    /// Print the column names, one per line
    Columns,

    /// Add a record
    Add {
        /// Field as key=value; repeatable
        #[arg(short, long = "field", value_parser = parse_field, required = true)]
        fields: Vec<(String, Value)>,
    },

    /// Change fields of an existing record
    Update {
        id: RecordId,
        /// Field as key=value; repeatable
        #[arg(short, long = "field", value_parser = parse_field, required = true)]
        fields: Vec<(String, Value)>,
    },

    /// Delete a record
    Delete { id: RecordId },

    /// Print records whose COLUMN equals VALUE exactly
    Search {
        column: String,
        value: String,
        /// Output JSON instead of CSV
        #[arg(long)]
        json: bool,
    },

    /// Import records from a CSV file with a header line
    Import {
        file: PathBuf,
        /// append keeps existing records, replace discards them
        #[arg(long, default_value_t = ImportMode::Append)]
        mode: ImportMode,
    },

    /// Write every record to a CSV file
    Export { file: PathBuf },

    /// Summary of the stored table
    Stats,

    /// Verify the backend can be reached
    Check,
}

/// Parse `key=value`; the value may itself contain `=`
pub fn parse_field(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing field name in '{}'", raw));
    }
    Ok((key.to_string(), Value::from_cell(value)))
}

pub fn run(cli: Cli) -> Result<bool> {
    let config_path = config::config_path(cli.config);
    let store_config = StoreConfig::load(&config_path)?;
    let storage = config::open_storage(&store_config)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let outcome = execute(storage.as_ref(), &cli.command, &mut out)?;
    out.flush()?;

    if let Some(diagnostic) = &outcome.diagnostic {
        eprintln!("{}", diagnostic);
    }
    Ok(outcome.value)
}

/// Run one command; the outcome's value tells whether it succeeded
pub fn execute(storage: &dyn RecordStorage, command: &Command, out: &mut dyn Write) -> Result<Outcome<bool>> {
    match command {
        Command::List { json } => {
            let outcome = storage.read_all();
            print_table(&outcome.value, *json, out)?;
            Ok(succeeded_without_diagnostic(outcome))
        }
        Command::Columns => {
            let outcome = storage.list_columns();
            for column in &outcome.value {
                writeln!(out, "{}", column)?;
            }
            Ok(succeeded_without_diagnostic(outcome))
        }
        Command::Add { fields } => {
            let outcome = storage.add(&to_fields(fields));
            if let Some(id) = outcome.value {
                writeln!(out, "Added record {}", id)?;
            }
            Ok(outcome.map(|id| id.is_some()))
        }
        Command::Update { id, fields } => {
            let outcome = storage.update(*id, &to_fields(fields));
            if outcome.value {
                writeln!(out, "Updated record {}", id)?;
            }
            Ok(outcome)
        }
        Command::Delete { id } => {
            let outcome = storage.delete(*id);
            if outcome.value {
                writeln!(out, "Deleted record {}", id)?;
            }
            Ok(outcome)
        }
        Command::Search { column, value, json } => {
            let outcome = storage.search(column, &Value::from(value.as_str()));
            print_table(&outcome.value, *json, out)?;
            Ok(succeeded_without_diagnostic(outcome))
        }
        Command::Import { file, mode } => {
            let reader = File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
            let rows = codec::read_table(BufReader::new(reader))
                .with_context(|| format!("Failed to parse {}", file.display()))?;
            let outcome = storage.bulk_import(&rows, *mode);
            if outcome.value {
                writeln!(out, "Imported {} records ({})", rows.len(), mode)?;
            }
            Ok(outcome)
        }
        Command::Export { file } => {
            let outcome = storage.read_all();
            if outcome.has_diagnostic() {
                return Ok(succeeded_without_diagnostic(outcome));
            }
            let writer = File::create(file).with_context(|| format!("Failed to create {}", file.display()))?;
            codec::write_table(BufWriter::new(writer), &outcome.value)?;
            writeln!(out, "Exported {} records to {}", outcome.value.len(), file.display())?;
            Ok(Outcome::ok(true))
        }
        Command::Stats => {
            let outcome = storage.read_all();
            print_stats(storage, &outcome.value, out)?;
            Ok(succeeded_without_diagnostic(outcome))
        }
        Command::Check => {
            let outcome = storage.list_columns();
            if !outcome.has_diagnostic() {
                writeln!(out, "OK: {} ({} columns)", storage.location(), outcome.value.len())?;
            }
            Ok(succeeded_without_diagnostic(outcome))
        }
    }
}

fn succeeded_without_diagnostic<T>(outcome: Outcome<T>) -> Outcome<bool> {
    let success = !outcome.has_diagnostic();
    outcome.map(|_| success)
}

fn to_fields(pairs: &[(String, Value)]) -> Fields {
    pairs.iter().cloned().collect()
}

fn print_table(table: &Table, json: bool, out: &mut dyn Write) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, table.records())?;
        writeln!(out)?;
    } else {
        codec::write_table(out, table)?;
    }
    Ok(())
}

fn print_stats(storage: &dyn RecordStorage, table: &Table, out: &mut dyn Write) -> Result<()> {
    let last_update = table.records().iter().filter_map(|r| r.timestamp()).max();
    writeln!(out, "Location:    {}", storage.location())?;
    writeln!(out, "Records:     {}", table.len())?;
    writeln!(out, "Columns:     {} ({})", table.columns().len(), table.columns().join(", "))?;
    writeln!(out, "Next id:     {}", table.next_id())?;
    writeln!(out, "Last update: {}", last_update.unwrap_or("-"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use record_store::storage::csv::{CsvConnection, CsvRecordRepository};
    use std::fs;
    use tempfile::TempDir;

    fn storage_in(dir: &TempDir) -> CsvRecordRepository {
        CsvRecordRepository::new(CsvConnection::new(dir.path().join("shared_data.csv")).unwrap())
    }

    fn run_command(storage: &dyn RecordStorage, command: Command) -> (Outcome<bool>, String) {
        let mut out = Vec::new();
        let outcome = execute(storage, &command, &mut out).unwrap();
        (outcome, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_parse_field() {
        assert_eq!(parse_field("name=Emma").unwrap(), ("name".to_string(), Value::from("Emma")));
        assert_eq!(parse_field("expr=a=b").unwrap().1, Value::from("a=b"));
        assert_eq!(parse_field("note=").unwrap().1, Value::Empty);
        assert!(parse_field("no-equals").is_err());
        assert!(parse_field("=value").is_err());
    }

    #[test]
    fn test_cli_parses_repeated_fields() {
        let cli = Cli::try_parse_from([
            "record-store", "--config", "x.yaml", "update", "3", "-f", "name=Emma", "--field", "age=9",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.yaml")));
        match cli.command {
            Command::Update { id, fields } => {
                assert_eq!(id, 3);
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[1], ("age".to_string(), Value::from("9")));
            }
            _ => panic!("expected update"),
        }
    }

    #[test]
    fn test_cli_rejects_bad_import_mode() {
        assert!(Cli::try_parse_from(["record-store", "import", "a.csv", "--mode", "merge"]).is_err());
    }

    #[test]
    fn test_add_then_list() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);

        let (outcome, printed) = run_command(
            &storage,
            Command::Add {
                fields: vec![("name".to_string(), Value::from("Emma"))],
            },
        );
        assert!(outcome.value);
        assert_eq!(printed, "Added record 1\n");

        let (outcome, printed) = run_command(&storage, Command::List { json: true });
        assert!(outcome.value);
        let parsed: serde_json::Value = serde_json::from_str(&printed).unwrap();
        assert_eq!(parsed[0]["id"], "1");
        assert_eq!(parsed[0]["name"], "Emma");
    }

    #[test]
    fn test_missing_record_fails() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);

        let (outcome, printed) = run_command(&storage, Command::Delete { id: 9 });
        assert!(!outcome.value);
        assert_eq!(outcome.diagnostic.as_deref(), Some("Record with ID 9 not found"));
        assert!(printed.is_empty());
    }

    #[test]
    fn test_import_and_export_files() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        let input = dir.path().join("people.csv");
        fs::write(&input, "name,age\nEmma,8\nLiam,9\n").unwrap();

        let (outcome, printed) = run_command(
            &storage,
            Command::Import {
                file: input,
                mode: ImportMode::Append,
            },
        );
        assert!(outcome.value);
        assert_eq!(printed, "Imported 2 records (append)\n");

        let output = dir.path().join("out.csv");
        let (outcome, _) = run_command(&storage, Command::Export { file: output.clone() });
        assert!(outcome.value);
        let exported = fs::read_to_string(output).unwrap();
        assert!(exported.starts_with("id,timestamp,name,age\n1,"));
        assert_eq!(exported.lines().count(), 3);
    }

    #[test]
    fn test_search_unknown_column_fails() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);

        let (outcome, _) = run_command(
            &storage,
            Command::Search {
                column: "color".to_string(),
                value: "red".to_string(),
                json: false,
            },
        );
        assert!(!outcome.value);
        assert_eq!(outcome.diagnostic.as_deref(), Some("Column color not found"));
    }

    #[test]
    fn test_stats() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        storage.add(&Fields::new().with("name", "Emma"));

        let (outcome, printed) = run_command(&storage, Command::Stats);
        assert!(outcome.value);
        assert!(printed.contains("Records:     1\n"));
        assert!(printed.contains("Columns:     3 (id, timestamp, name)\n"));
        assert!(printed.contains("Next id:     2\n"));
    }
}
