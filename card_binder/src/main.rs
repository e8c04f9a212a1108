//! Card Binder - static HTML binder views for MTG inventories
//!
//! Reads an inventory list, resolves each card against Scryfall through a
//! local cache and writes a browsable binder to an output directory.

use card_binder::binder::{self, BinderEdit, CreateRequest};
use card_binder::cache::{CachePolicy, CacheStore, MetadataCache};
use card_binder::config::{default_home_dir, FailurePolicy, FetchSettings, OutputMode, PageLayout, Settings};
use card_binder::inventory::{LineFormat, ParseOptions};
use card_binder::{registry, BinderError, CardKey, Result, ScryfallClient};
use chrono::TimeDelta;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// MTG binder view - renders an inventory list as a static HTML binder
#[derive(Parser, Debug)]
#[command(name = "card_binder")]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding the card cache and binder registry
    #[arg(long, global = true, default_value_os_t = default_home_dir())]
    home: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a binder view from an inventory list
    Create(CreateArgs),

    /// List registered binders
    List,

    /// Show a registered binder
    Show {
        /// Binder id
        id: String,

        /// Also list the binder's cards
        #[arg(long, default_value_t = false)]
        cards: bool,
    },

    /// Change a binder's id, name or path (e.g. after moving its directory)
    Edit {
        /// Binder id
        id: String,

        /// New binder id
        #[arg(long = "id", value_name = "NEW_ID")]
        new_id: Option<String>,

        /// New binder display name
        #[arg(short, long)]
        name: Option<String>,

        /// New location of the binder view directory
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Unregister a binder
    Delete {
        /// Binder id
        id: String,

        /// Also delete the binder's output directory
        #[arg(long, default_value_t = false)]
        delete_directory: bool,
    },

    /// Inspect or modify the card cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Show record counts
    Stats,

    /// Drop a cached card so the next run fetches it again
    Invalidate {
        /// Card name
        name: String,

        /// Set code the card was listed with
        #[arg(long)]
        set: Option<String>,
    },

    /// Drop every cached not-found record
    ClearNegative,
}

#[derive(clap::Args, Debug)]
struct CreateArgs {
    /// Inventory list file
    inventory: PathBuf,

    /// Directory to write the binder view to
    output_dir: PathBuf,

    /// Binder display name
    #[arg(short, long)]
    name: Option<String>,

    /// Binder id (defaults to the name, or `default`)
    #[arg(long)]
    id: Option<String>,

    /// Card rows per page
    #[arg(long, default_value_t = 3)]
    rows: usize,

    /// Card columns per page
    #[arg(long, default_value_t = 3)]
    cols: usize,

    /// Render placeholders for cards that could not be fetched instead of failing
    #[arg(long, default_value_t = false)]
    best_effort: bool,

    /// Write into a non-empty output directory
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Inventory uses tappedout board lines (`4x Name (SET) *F*`)
    #[arg(long, default_value_t = false)]
    board: bool,

    /// Field delimiter for delimited inventory lines
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Lines starting with this prefix are ignored
    #[arg(long, default_value = "#")]
    comment_prefix: String,

    /// Hours a not-found card is remembered before it is looked up again
    #[arg(long, default_value_t = 7 * 24)]
    negative_ttl_hours: i64,

    /// Hours a found card is served before it is refreshed (default: never)
    #[arg(long)]
    resolved_ttl_hours: Option<i64>,

    /// Maximum cards fetched at once
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Scryfall API base URL
    #[arg(long, default_value = card_binder::config::DEFAULT_API_URL)]
    api_url: String,
}

impl CreateArgs {
    fn settings(&self) -> Result<Settings> {
        if !self.delimiter.is_ascii() {
            return Err(BinderError::Config(format!(
                "delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            )));
        }
        let negative_ttl = ttl_hours("--negative-ttl-hours", self.negative_ttl_hours)?;
        let resolved_ttl = self
            .resolved_ttl_hours
            .map(|hours| ttl_hours("--resolved-ttl-hours", hours))
            .transpose()?;
        let settings = Settings {
            layout: PageLayout {
                rows: self.rows,
                cols: self.cols,
            },
            cache: CachePolicy {
                negative_ttl,
                resolved_ttl,
            },
            fetch: FetchSettings {
                api_url: self.api_url.clone(),
                timeout: Duration::from_secs(self.timeout_secs),
                max_concurrency: self.concurrency,
                ..FetchSettings::default()
            },
            failure_policy: if self.best_effort {
                FailurePolicy::BestEffort
            } else {
                FailurePolicy::Abort
            },
            output_mode: if self.overwrite {
                OutputMode::Overwrite
            } else {
                OutputMode::RequireEmpty
            },
            parse: ParseOptions {
                format: if self.board {
                    LineFormat::Board
                } else {
                    LineFormat::Delimited
                },
                delimiter: self.delimiter as u8,
                comment_prefix: self.comment_prefix.clone(),
            },
        };
        settings.validate()?;
        Ok(settings)
    }
}

fn ttl_hours(flag: &str, hours: i64) -> Result<TimeDelta> {
    TimeDelta::try_hours(hours)
        .ok_or_else(|| BinderError::Config(format!("{} value {} is out of range", flag, hours)))
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        log::error!("{}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    log::debug!("Home directory: {}", args.home.display());
    let store = CacheStore::open(&args.home)?;

    match args.command {
        Command::Create(create) => run_create(store, create).await,
        Command::List => {
            let binders = registry::list_binders(store.connection())?;
            if binders.is_empty() {
                println!("No binders yet.");
            }
            for b in binders {
                println!("{}\t{}\t{} cards\t{}", b.id, b.name, b.card_count, b.path);
            }
            Ok(())
        }
        Command::Show { id, cards } => {
            let (record, manifest) = binder::show_binder(&store, &id)?;
            println!("ID:    {}", record.id);
            println!("Name:  {}", record.name);
            println!("Path:  {}", record.path);
            println!("Cards: {}", record.card_count);
            if let Some(manifest) = manifest {
                println!("Pages: {}", manifest.pages);
                if cards {
                    for card in &manifest.cards {
                        println!(
                            "  {}x {}{}{} [{}] ({})",
                            card.quantity,
                            card.name,
                            card.set_code
                                .as_deref()
                                .map(|s| format!(" ({})", s.to_uppercase()))
                                .unwrap_or_default(),
                            if card.foil { " *F*" } else { "" },
                            card.condition.token(),
                            card.status.as_str()
                        );
                    }
                }
            }
            Ok(())
        }
        Command::Edit {
            id,
            new_id,
            name,
            path,
        } => {
            let edit = BinderEdit {
                id: new_id,
                name,
                path,
            };
            let record = binder::edit_binder(&store, &id, &edit)?;
            println!("Binder `{}` ({}) at {}", record.id, record.name, record.path);
            Ok(())
        }
        Command::Delete {
            id,
            delete_directory,
        } => {
            let record = binder::delete_binder(&store, &id, delete_directory)?;
            println!("Deleted binder `{}` ({})", record.id, record.name);
            Ok(())
        }
        Command::Cache { command } => run_cache(&store, command),
    }
}

async fn run_create(store: CacheStore, args: CreateArgs) -> Result<()> {
    let settings = args.settings()?;
    let client = ScryfallClient::new(&settings.fetch).map_err(|e| BinderError::Config(e.to_string()))?;
    let cache = Arc::new(MetadataCache::new(
        Arc::new(Mutex::new(store)),
        client,
        settings.cache,
    ));

    let request = CreateRequest {
        inventory: args.inventory,
        output_dir: args.output_dir,
        name: args.name,
        id: args.id,
    };
    let summary = binder::create_binder(cache, &request, &settings).await?;

    println!(
        "Binder `{}` ({}): {} cards on {} pages at {}",
        summary.id,
        summary.name,
        summary.cards,
        summary.pages,
        summary.output_dir.join("index.html").display()
    );
    if summary.not_found > 0 {
        println!("{} cards were not found on Scryfall", summary.not_found);
    }
    if summary.unavailable > 0 {
        println!("{} cards could not be fetched and are shown as placeholders", summary.unavailable);
    }
    Ok(())
}

fn run_cache(store: &CacheStore, command: CacheCommand) -> Result<()> {
    match command {
        CacheCommand::Stats => {
            let stats = store.stats()?;
            println!("Records:   {}", stats.records);
            println!("Resolved:  {}", stats.resolved);
            println!("Not found: {}", stats.not_found);
            println!("Images:    {} ({})", stats.with_image, store.image_dir().display());
        }
        CacheCommand::Invalidate { name, set } => {
            let key = CardKey::new(&name, set.as_deref());
            if store.remove(&key)? {
                println!("Invalidated {}", key);
            } else {
                println!("{} was not cached", key);
            }
        }
        CacheCommand::ClearNegative => {
            let cleared = store.clear_negative()?;
            println!("Cleared {} not-found records", cleared);
        }
    }
    Ok(())
}
