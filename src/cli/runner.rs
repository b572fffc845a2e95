//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{load_collection, CollectionDefinition};
use crate::error::{Error, Result, ResultExt};
use crate::pagination::LoadOutcome;
use crate::types::OptionStringExt;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use std::hash::{Hash, Hasher};
use std::io::{self, Write};
use std::time::Instant;
use tracing::{debug, info};

/// Dependency key given on the command line
///
/// Plain `--key` values become JSON strings; `--key-json` values keep their
/// structure so templates can address fields like `{{ key.user_id }}`.
/// Equality and hashing use the canonical JSON text.
#[derive(Debug, Clone)]
pub struct CliKey {
    value: Value,
    canonical: String,
}

impl CliKey {
    /// Key from a plain string
    pub fn plain(key: impl Into<String>) -> Self {
        Self::from_value(Value::String(key.into()))
    }

    /// Key from inline JSON
    pub fn parse_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| Error::invalid_value("key_json", e.to_string()))?;
        Ok(Self::from_value(value))
    }

    fn from_value(value: Value) -> Self {
        let canonical = value.to_string();
        Self { value, canonical }
    }

    /// The key as JSON
    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl PartialEq for CliKey {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for CliKey {}

impl Hash for CliKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl Serialize for CliKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Fetch {
                key,
                key_json,
                max_pages,
                page_size,
                base_url,
            } => {
                let key = match (key.clone().none_if_empty(), key_json) {
                    (_, Some(raw)) => CliKey::parse_json(raw)?,
                    (Some(key), None) => CliKey::plain(key),
                    (None, None) => return Err(Error::missing_field("key")),
                };
                self.fetch(key, *max_pages, *page_size, base_url.as_deref())
                    .await
            }
            Commands::Validate => self.validate(),
            Commands::Inspect => self.inspect(),
        }
    }

    /// Load collection definition
    fn load_collection(&self) -> Result<CollectionDefinition> {
        let path = self
            .cli
            .collection
            .as_ref()
            .ok_or_else(|| Error::config("Collection file not specified (use -c flag)"))?;
        load_collection(path)
    }

    /// Walk the collection and print its items
    async fn fetch(
        &self,
        key: CliKey,
        max_pages: Option<usize>,
        page_size: Option<u32>,
        base_url: Option<&str>,
    ) -> Result<()> {
        let mut def = self.load_collection()?;
        if let Some(size) = page_size {
            def.page_size = size;
        }
        if let Some(url) = base_url {
            def.base_url = url.to_string();
        }
        def.validate()?;

        info!(
            "Fetching '{}' for key {} (page size {})",
            def.name,
            key.value(),
            def.page_size
        );
        let start = Instant::now();

        let view = def.build_view(key)?;
        let summary = view.load_until_end(max_pages).await;
        let snapshot = view.snapshot();

        write_items(&mut io::stdout().lock(), &snapshot.items, self.cli.format)?;

        let stats = view.stats();
        eprintln!(
            "{}: {} items from {} pages (total {}), reached end: {}, duplicates dropped: {}, {:.2?}",
            def.name,
            snapshot.items.len(),
            snapshot.page_count,
            snapshot
                .total_count
                .map_or_else(|| "unknown".to_string(), |t| t.to_string()),
            snapshot.is_reaching_end,
            stats.duplicates_dropped,
            start.elapsed()
        );
        if let Some(divergence) = snapshot.count_divergence {
            eprintln!(
                "warning: page {} reported total {} but the first page reported {}",
                divergence.page_index, divergence.observed, divergence.canonical
            );
        }

        debug!("Last outcome: {:?}", summary.last_outcome);
        match summary.last_outcome {
            Some(LoadOutcome::Failed(error)) => Err(Error::Other(format!(
                "Stopped after {} pages: {error}",
                snapshot.page_count
            ))),
            _ => Ok(()),
        }
    }

    /// Validate collection definition
    fn validate(&self) -> Result<()> {
        let def = self.load_collection()?;

        self.output_message(&json!({
            "valid": true,
            "name": def.name,
            "message": format!(
                "Collection '{}' is valid ({} {}, page size {})",
                def.name,
                def.request.method,
                def.request.path,
                def.page_size
            )
        }));

        Ok(())
    }

    /// Print the normalized definition with all defaults filled in
    fn inspect(&self) -> Result<()> {
        let def = self.load_collection()?;

        match self.cli.format {
            OutputFormat::Json => self.output_message(&serde_json::to_value(&def)?),
            OutputFormat::Pretty => {
                let yaml = serde_yaml::to_string(&def).context("Failed to render definition")?;
                print!("{yaml}");
            }
        }

        Ok(())
    }

    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Write fetched items as JSON lines or one pretty-printed array
///
/// Write failures such as a closed pipe surface as [`Error::Io`].
pub(crate) fn write_items<W: Write>(
    out: &mut W,
    items: &[Value],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            for item in items {
                writeln!(out, "{}", serde_json::to_string(item)?)?;
            }
        }
        OutputFormat::Pretty => {
            writeln!(out, "{}", serde_json::to_string_pretty(items)?)?;
        }
    }
    out.flush()?;
    Ok(())
}
