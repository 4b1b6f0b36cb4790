//! # ev — command line browser for eventscope
//!
//! Talks to `ev-hub` over HTTP.
//!
//! - `ev events` — page through matching events and print them.
//! - `ev fields` — list the numeric fields found in the fetched events.
//! - `ev chart --field <path>` — aggregate fields into a time series.

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use ev_core::{aggregate, discover, FieldPath, FieldSelection, QueryFilter, StoreKind, WindowToken};

mod browse;
mod client;
mod render;

use browse::{browse, Browse};
use client::EventsClient;

/// Browse and chart events stored in ClickHouse or PostgreSQL.
#[derive(Parser)]
#[command(name = "ev", version, about, long_about = None)]
struct Cli {
    /// Hub base URL (default: $EV_BASE_URL or http://127.0.0.1:7890).
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct FilterArgs {
    /// Recent-time window: 1m, 5m, 20m, 1h, 5h, 1d, 1w or 1mo.
    #[arg(long)]
    time_range: Option<String>,

    /// Substring to look for in the structured payload.
    #[arg(long)]
    content: Option<String>,

    /// Exact topic.
    #[arg(long)]
    topic: Option<String>,

    /// Store to query: columnar (clickhouse) or relational (postgresql).
    #[arg(long, default_value = "columnar")]
    database: String,

    /// Page size.
    #[arg(long, default_value_t = ev_core::DEFAULT_LIMIT)]
    limit: u32,

    /// Stop after this many pages.
    #[arg(long)]
    max_pages: Option<usize>,
}

impl FilterArgs {
    fn to_filter(&self) -> Result<QueryFilter, String> {
        let store = StoreKind::parse(&self.database).map_err(|e| e.to_string())?;
        let mut filter = QueryFilter::new(store).page(self.limit, 0);
        if let Some(token) = &self.time_range {
            filter = filter.with_window(WindowToken::parse(token));
        }
        if let Some(content) = &self.content {
            filter = filter.with_content(content.as_str());
        }
        if let Some(topic) = &self.topic {
            filter = filter.with_topic(topic.as_str());
        }
        Ok(filter)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Page through matching events and print them as a table.
    Events {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// List numeric fields discovered in the fetched events.
    Fields {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Sum selected numeric fields per timestamp.
    Chart {
        #[command(flatten)]
        filter: FilterArgs,

        /// Field path to plot, e.g. `cpu.load` or `disks[0].used`. Repeatable;
        /// every discovered field when omitted.
        #[arg(long = "field")]
        fields: Vec<String>,

        /// Print the series as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to build tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(async_main(cli)) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn async_main(cli: Cli) -> Result<(), String> {
    let base_url = cli
        .base_url
        .or_else(|| std::env::var("EV_BASE_URL").ok())
        .unwrap_or_else(|| "http://127.0.0.1:7890".to_string());
    let client = EventsClient::new(&base_url, Duration::from_secs(cli.timeout_secs))
        .map_err(|e| e.to_string())?;

    match cli.command {
        Commands::Events { filter } => {
            let result = fetch_all(&client, &filter).await?;
            println!("{}", render::events_table(&result.events));
            report(&result);
        }

        Commands::Fields { filter } => {
            let result = fetch_all(&client, &filter).await?;
            let catalogue = discover(&result.events);
            if catalogue.is_empty() {
                eprintln!("No numeric fields in {} events", result.events.len());
            }
            for path in &catalogue {
                println!("{}", path);
            }
        }

        Commands::Chart {
            filter,
            fields,
            json,
        } => {
            let result = fetch_all(&client, &filter).await?;
            let catalogue = discover(&result.events);
            let selected = select_fields(&fields, &catalogue)?;
            if selected.is_empty() {
                return Err("no numeric fields to chart".into());
            }

            let series = aggregate(&result.events, &selected);
            if json {
                let out = serde_json::to_string_pretty(&series).map_err(|e| e.to_string())?;
                println!("{}", out);
            } else {
                println!("{}", render::series_table(&series, &selected));
            }
        }
    }

    Ok(())
}

async fn fetch_all(client: &EventsClient, args: &FilterArgs) -> Result<Browse, String> {
    let filter = args.to_filter()?;
    eprintln!("Fetching {} ({})", client.events_url(), filter.store);
    let result = browse(filter, args.max_pages, |f| async move {
        client.fetch_page(&f).await
    })
    .await;

    match &result.error {
        Some(message) if result.events.is_empty() => Err(message.clone()),
        Some(message) => {
            eprintln!("Warning: stopped early: {}", message);
            Ok(result)
        }
        None => Ok(result),
    }
}

fn report(result: &Browse) {
    let suffix = if result.exhausted {
        ""
    } else {
        " (more available)"
    };
    eprintln!(
        "{} events in {} page(s){}",
        result.events.len(),
        result.pages,
        suffix
    );
}

/// Parse requested paths and keep those present in the catalogue. With no
/// request, everything discovered is selected.
fn select_fields(requested: &[String], catalogue: &[FieldPath]) -> Result<Vec<FieldPath>, String> {
    let mut selection = FieldSelection::new();
    if requested.is_empty() {
        for path in catalogue {
            selection.select(path.clone());
        }
        return Ok(selection.fields());
    }

    for raw in requested {
        let path = FieldPath::parse(raw).map_err(|e| format!("bad field '{}': {}", raw, e))?;
        selection.select(path);
    }
    let before = selection.fields();
    selection.retain_known(catalogue);
    for missing in before.iter().filter(|p| !selection.is_selected(p)) {
        eprintln!("Warning: '{}' is not a numeric field of the fetched events", missing);
    }
    Ok(selection.fields())
}
