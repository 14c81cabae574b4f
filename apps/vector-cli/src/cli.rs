//! CLI argument parsing.
//!
//! Global flags override the `VECTOR_*` environment variables.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use core_config::{ConfigError, FromEnv, env_or_default};
use domain_vector::config::DEFAULT_FILE_PATH;
use domain_vector::{BackendConfig, QdrantConfig, RetrieverConfig, StoreBackend};
use serde_json::Value;

/// Vector CLI
///
/// Store and search embedded documents in a CSV file or a Qdrant collection.
#[derive(Parser, Debug)]
#[command(name = "vector-cli")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Storage backend: file or qdrant (overrides VECTOR_BACKEND)
    #[arg(long, global = true)]
    pub backend: Option<StoreBackend>,

    /// CSV file used by the file backend (overrides VECTOR_FILE_PATH, invalid with qdrant)
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,

    /// Collection name (overrides VECTOR_COLLECTION)
    #[arg(short, long, global = true)]
    pub collection: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Embed a document and store it
    Add {
        /// Document text
        text: String,

        /// Store under this id, replacing any existing record
        #[arg(long)]
        id: Option<String>,

        /// Payload field as key=value; JSON values are parsed, anything else is a string
        #[arg(short, long = "meta", value_parser = parse_meta)]
        meta: Vec<(String, Value)>,
    },

    /// Embed a query and print the closest documents
    Query {
        /// Query text
        text: String,

        /// Maximum number of results
        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: usize,
    },

    /// Print one record
    Get { id: String },

    /// Delete records by id; unknown ids are ignored
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Print every record
    List,

    /// Print the number of records
    Count,
}

impl Cli {
    /// Environment configuration with the command-line overrides applied
    pub fn retriever_config(&self) -> Result<RetrieverConfig, ConfigError> {
        let mut config = RetrieverConfig::from_env()?;

        match self.backend {
            Some(backend) if backend != config.backend.backend() => {
                config.backend = match backend {
                    StoreBackend::File => BackendConfig::File {
                        path: PathBuf::from(env_or_default("VECTOR_FILE_PATH", DEFAULT_FILE_PATH)),
                    },
                    StoreBackend::Qdrant => BackendConfig::Qdrant(QdrantConfig::from_env()?),
                };
            }
            _ => {}
        }

        match (&self.file, &mut config.backend) {
            (Some(file), BackendConfig::File { path }) => *path = file.clone(),
            (Some(file), BackendConfig::Qdrant(_)) => {
                return Err(ConfigError::UnsupportedValue {
                    key: "--file".to_string(),
                    value: file.display().to_string(),
                    expected: "no --file with the qdrant backend".to_string(),
                });
            }
            (None, _) => {}
        }

        if let Some(collection) = &self.collection {
            config.collection_name = collection.clone();
        }

        Ok(config)
    }
}

fn parse_meta(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("metadata key must not be empty".to_string());
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VARS: [&str; 3] = ["VECTOR_BACKEND", "VECTOR_FILE_PATH", "VECTOR_COLLECTION"];

    #[test]
    fn test_cli_query_defaults() {
        let cli = Cli::parse_from(["vector-cli", "query", "invoices"]);
        match cli.command {
            Commands::Query { text, top_k } => {
                assert_eq!(text, "invoices");
                assert_eq!(top_k, 5);
            }
            _ => panic!("Expected Query command"),
        }
    }

    #[test]
    fn test_cli_add_with_meta() {
        let cli = Cli::parse_from([
            "vector-cli",
            "add",
            "hello",
            "--id",
            "doc-1",
            "--meta",
            "source=notes",
            "--meta",
            "page=3",
        ]);
        match cli.command {
            Commands::Add { text, id, meta } => {
                assert_eq!(text, "hello");
                assert_eq!(id.as_deref(), Some("doc-1"));
                assert_eq!(
                    meta,
                    vec![
                        ("source".to_string(), json!("notes")),
                        ("page".to_string(), json!(3)),
                    ]
                );
            }
            _ => panic!("Expected Add command"),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["vector-cli", "count", "--backend", "qdrant", "-c", "notes"]);
        assert_eq!(cli.backend, Some(StoreBackend::Qdrant));
        assert_eq!(cli.collection.as_deref(), Some("notes"));
        assert!(matches!(cli.command, Commands::Count));
    }

    #[test]
    fn test_cli_delete_requires_ids() {
        assert!(Cli::try_parse_from(["vector-cli", "delete"]).is_err());
    }

    #[test]
    fn test_cli_rejects_unknown_backend() {
        assert!(Cli::try_parse_from(["vector-cli", "list", "--backend", "redis"]).is_err());
    }

    #[test]
    fn test_parse_meta() {
        assert_eq!(parse_meta("a=b").unwrap(), ("a".to_string(), json!("b")));
        assert_eq!(parse_meta("flag=true").unwrap(), ("flag".to_string(), json!(true)));
        assert_eq!(parse_meta("eq=x=y").unwrap(), ("eq".to_string(), json!("x=y")));
        assert!(parse_meta("novalue").is_err());
        assert!(parse_meta("=value").is_err());
    }

    #[test]
    fn test_file_flag_overrides_env() {
        temp_env_unset(|| {
            let cli = Cli::parse_from(["vector-cli", "list", "--file", "/tmp/other.csv"]);
            let config = cli.retriever_config().unwrap();
            assert_eq!(
                config.backend,
                BackendConfig::File {
                    path: PathBuf::from("/tmp/other.csv")
                }
            );
            assert_eq!(config.collection_name, "documents");
        });
    }

    #[test]
    fn test_backend_flag_switches_to_qdrant() {
        temp_env_unset(|| {
            let cli = Cli::parse_from(["vector-cli", "list", "--backend", "qdrant"]);
            let config = cli.retriever_config().unwrap();
            assert_eq!(config.backend.backend(), StoreBackend::Qdrant);
        });
    }

    #[test]
    fn test_file_flag_rejected_for_qdrant() {
        temp_env_unset(|| {
            let cli = Cli::parse_from([
                "vector-cli",
                "list",
                "--backend",
                "qdrant",
                "--file",
                "/tmp/other.csv",
            ]);
            match cli.retriever_config() {
                Err(ConfigError::UnsupportedValue { key, value, .. }) => {
                    assert_eq!(key, "--file");
                    assert_eq!(value, "/tmp/other.csv");
                }
                other => panic!("expected UnsupportedValue, got {other:?}"),
            }
        });

        temp_env::with_vars(
            [
                ("VECTOR_BACKEND", Some("qdrant")),
                ("VECTOR_FILE_PATH", None),
                ("VECTOR_COLLECTION", None),
            ],
            || {
                let cli = Cli::parse_from(["vector-cli", "count", "--file", "/tmp/other.csv"]);
                assert!(cli.retriever_config().is_err());
            },
        );
    }

    fn temp_env_unset(f: impl FnOnce()) {
        temp_env::with_vars_unset(VARS, f);
    }
}
