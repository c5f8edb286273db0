use card_gallery::app::AppState;
use card_gallery::config::{self, GalleryConfig};
use card_gallery::dataset::{Dataset, DatasetError};
use card_gallery::filter::{EraFilter, Query, SortMode};
use card_gallery::sync::{self, FormKind, FsImages, FsStore, ManualEntry, Syncer};
use card_gallery::{generate, output};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Manifest and selection flags shared by `build` and `list`.
#[derive(clap::Args, Clone)]
struct QueryArgs {
    /// Card manifest
    #[arg(long, default_value = "cards.json")]
    data: PathBuf,

    /// Case-insensitive search over names and contributions
    #[arg(long, default_value = "")]
    search: String,

    /// Era to show, or `all`
    #[arg(long, default_value = "all")]
    era: EraFilter,

    /// Sort mode: name, name-desc, era, recent, random
    #[arg(long, default_value = "name")]
    sort: SortMode,

    /// Seed for shuffles and carousel sampling (reproducible output)
    #[arg(long)]
    seed: Option<u64>,
}

impl QueryArgs {
    fn query(&self) -> Query {
        Query {
            search: self.search.clone(),
            era: self.era.clone(),
            sort: self.sort,
        }
    }

    fn load(&self) -> Result<Dataset, DatasetError> {
        Dataset::load(&self.data)
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

#[derive(clap::Args, Clone)]
struct BuildArgs {
    #[command(flatten)]
    query: QueryArgs,

    /// Output directory
    #[arg(long, default_value = "dist")]
    output: PathBuf,
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "card-gallery")]
#[command(about = "Trading card gallery renderer and submission sync")]
#[command(long_about = "\
Trading card gallery renderer and submission sync

The gallery is a single cards.json manifest plus the card images it points
at. 'build' renders it to static HTML (a flip grid and a 3D carousel with era
sections); 'add' and 'sync' write new cards into the repository.

Repository layout:

  cards.json                     # Manifest: cards, eras, last_updated
  cards/
  ├── curie_marie_front.png      # {id}_{face}.png, id derived from the name
  └── curie_marie_back.png
  gallery.toml                   # Optional config (see gen-config)

Card ids are last_first in lowercase: \"Marie Curie\" → curie_marie. A
resubmission of the same scientist overwrites the earlier card.

Run 'card-gallery gen-config' to generate a documented gallery.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (stock defaults when absent)
    #[arg(long, default_value = "gallery.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render the gallery pages
    Build(BuildArgs),
    /// Print the cards a query selects
    List(QueryArgs),
    /// Add a card whose images are already in the cards directory.
    /// The manifest is `sync.manifest` under `--root`.
    Add {
        name: String,
        years: String,
        era: String,
        contribution: String,
        /// Front image file name inside the cards directory
        front: String,
        /// Back image file name inside the cards directory
        back: String,
        #[arg(default_value = "")]
        student: String,
        /// Repository root
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Sync form responses into the repository.
    /// The manifest is `sync.manifest` under `--root`.
    Sync {
        /// JSON array of response rows
        #[arg(long)]
        responses: PathBuf,
        /// Rows come from the late submission form
        #[arg(long)]
        late: bool,
        /// First row is a header
        #[arg(long)]
        skip_header: bool,
        /// Repository root
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Directory holding the uploaded images, named by file id
        #[arg(long, default_value = "uploads")]
        images: PathBuf,
    },
    /// Print a stock gallery.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Build(BuildArgs { query: args, output: out_dir }) => {
            let config = config::load_config(&cli.config)?;
            let dataset = match args.load() {
                Ok(dataset) => dataset,
                Err(e) => {
                    error!(path = %args.data.display(), error = %e, "failed to load cards");
                    generate::generate_failure_page(&config, &out_dir)?;
                    return Err(e.into());
                }
            };
            let state = AppState::new(dataset, &config, args.rng(), 0).with_query(args.query(), 0);
            let report = generate::generate_site(&state, &config, data_root(&args.data), &out_dir)?;
            output::print_build_report(&report);
        }
        Command::List(args) => {
            let config = config::load_config(&cli.config)?;
            let dataset = args.load()?;
            let state = AppState::new(dataset, &config, args.rng(), 0).with_query(args.query(), 0);
            output::print_card_list(state.selected_cards(), state.dataset().cards.len());
        }
        Command::Add {
            name,
            years,
            era,
            contribution,
            front,
            back,
            student,
            root,
        } => {
            let config = config::load_config(&cli.config)?;
            add_card(
                &config,
                &root,
                ManualEntry {
                    name,
                    years,
                    era,
                    contribution,
                    front_file: front,
                    back_file: back,
                    student,
                },
            )?;
        }
        Command::Sync {
            responses,
            late,
            skip_header,
            root,
            images,
        } => {
            let config = config::load_config(&cli.config)?;
            let content = std::fs::read_to_string(&responses)?;
            let mut rows = sync::parse_rows(&content)?;
            if skip_header && !rows.is_empty() {
                rows.remove(0);
            }
            let (form, columns) = if late {
                (FormKind::Late, &config.sync.late_columns)
            } else {
                (FormKind::Regular, &config.sync.columns)
            };

            let mut store = FsStore::new(root);
            let images = FsImages::new(images);
            let mut syncer = Syncer::new(&mut store, &images, config.sync.layout());
            let reports = syncer.process_rows(&rows, columns, form, Utc::now());
            output::print_sync_report(&reports);

            let failed = reports.iter().filter(|r| r.result.is_err()).count();
            if failed > 0 {
                return Err(format!("{failed} of {} rows failed", reports.len()).into());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn add_card(
    config: &GalleryConfig,
    root: &Path,
    entry: ManualEntry,
) -> Result<(), Box<dyn std::error::Error>> {
    let now = Utc::now();
    let card = entry.into_card(&config.sync.cards_dir, now)?;
    let message = format!("Add card for {}", card.name);
    let mut store = FsStore::new(root);
    let outcome = sync::upsert_manifest(
        &mut store,
        &config.sync.layout(),
        card.clone(),
        None,
        &message,
        now,
    )?;
    output::print_add_result(&card, &outcome, &config.sync.manifest);
    Ok(())
}

/// Directory card image locators are relative to.
fn data_root(data: &Path) -> &Path {
    data.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}
