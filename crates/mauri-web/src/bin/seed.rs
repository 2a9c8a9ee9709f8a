//! Load the legacy pest export into the database.
//!
//! Run with: cargo run -p mauri-web --bin mauri-seed -- data/pests.json

use anyhow::Context;
use clap::Parser;
use mauri_common::{Config, FacetSet, NewPest};
use mauri_db::Database;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const MAX_FACET_CHARS: usize = 500;

#[derive(Parser, Debug)]
#[command(name = "mauri-seed", about = "Import pests from the legacy JSON export")]
struct Args {
    /// JSON array of legacy pest records.
    path: PathBuf,

    /// Do nothing if the catalog already has pests.
    #[arg(long)]
    skip_if_populated: bool,
}

/// One record of the legacy export. Field names follow the export.
#[derive(Debug, Deserialize)]
struct LegacyPest {
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Latin", default)]
    latin: Option<String>,
    /// A name, or `false` when there is none.
    #[serde(rename = "AlsoKnownAs", default)]
    also_known_as: Value,
    #[serde(default)]
    keywords: Option<String>,
    #[serde(default)]
    pestgroups: Option<String>,
    #[serde(default)]
    pesttypes: Option<String>,
    #[serde(default)]
    managementapproaches: Option<String>,
    #[serde(rename = "Alert", default)]
    alert: Value,
    #[serde(rename = "Pinned", default)]
    pinned: Value,
    #[serde(default)]
    visible: Value,
    #[serde(rename = "FeaturedImage", default)]
    featured_image: Option<String>,
    #[serde(rename = "Link", default)]
    link: Option<String>,
}

fn truncated(value: Option<String>) -> Option<String> {
    value.map(|v| v.chars().take(MAX_FACET_CHARS).collect())
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        Value::String(s) => !s.is_empty() && s != "0" && !s.eq_ignore_ascii_case("false"),
        _ => false,
    }
}

impl From<LegacyPest> for NewPest {
    fn from(legacy: LegacyPest) -> Self {
        let facets = |raw: Option<String>| FacetSet::parse_opt(truncated(raw).as_deref());
        NewPest {
            latin: legacy.latin,
            also_known_as: legacy.also_known_as.as_str().map(str::to_string),
            keywords: truncated(legacy.keywords),
            pest_groups: facets(legacy.pestgroups),
            pest_types: facets(legacy.pesttypes),
            management_approaches: facets(legacy.managementapproaches),
            alert: truthy(&legacy.alert),
            pinned: truthy(&legacy.pinned),
            // Missing means visible; only an explicit `false` hides.
            visible: legacy.visible != Value::Bool(false),
            featured_image: legacy.featured_image,
            link: legacy.link,
            ..NewPest::new(legacy.title)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = Config::load()?;
    let db = Database::connect(&config.database).await;
    if !db.is_configured() {
        anyhow::bail!("DATABASE_URL is not set or the database is unreachable");
    }

    if args.skip_if_populated {
        let existing = db.pests().list_all().await?.len();
        if existing > 0 {
            info!(existing, "catalog already populated, nothing to do");
            return Ok(());
        }
    }

    let raw = std::fs::read_to_string(&args.path)
        .with_context(|| format!("reading {}", args.path.display()))?;
    let records: Vec<LegacyPest> = serde_json::from_str(&raw).context("parsing legacy pest export")?;
    info!(count = records.len(), "importing pests");

    let (mut imported, mut failed) = (0usize, 0usize);
    for record in records {
        let title = record.title.clone();
        match db.pests().create(record.into()).await {
            Ok(_) => {
                imported += 1;
                if imported % 50 == 0 {
                    info!(imported, "progress");
                }
            }
            Err(e) => {
                failed += 1;
                warn!(title = %title, error = %e, "pest not imported");
            }
        }
    }

    info!(imported, failed, "import complete");
    println!("Imported: {imported}");
    println!("Failed:   {failed}");
    Ok(())
}
