use clap::{Parser, Subcommand};
use static_api::author::{self, EntryChanges, NewEntry};
use static_api::config::{self, BuildConfig};
use static_api::{endpoints, output, plan};
use std::path::PathBuf;

/// Shared flags for commands that compute an update.
#[derive(clap::Args, Clone)]
struct BuildArgs {
    /// Rebuild everything, ignoring source/output timestamps
    #[arg(long)]
    force: bool,

    /// Content-hashed filenames (index-<hash>.json) + manifest.json
    #[arg(long)]
    hash: bool,

    /// With --hash: keep superseded hashed files instead of replacing them
    #[arg(long)]
    sub_version: bool,

    /// Page size for category indexes
    #[arg(long)]
    entities_per_page: Option<u32>,
}

/// Release tags report the crate version; other builds report the commit.
fn version_string() -> &'static str {
    if env!("ON_RELEASE_TAG") == "true" {
        return env!("CARGO_PKG_VERSION");
    }
    match env!("GIT_HASH") {
        "" => "dev@unknown",
        // Leaked into a 'static str exactly once, at startup
        hash => Box::leak(format!("dev@{hash}").into_boxed_str()),
    }
}

#[derive(Parser)]
#[command(name = "static-api")]
#[command(about = "Incremental static JSON endpoint generator")]
#[command(long_about = "\
Incremental static JSON endpoint generator

Your filesystem is the data source. Each child of the content root is a
content type, each directory inside it is one entity, and the output is a
tree of JSON endpoints a frontend can fetch directly.

Content structure:

  content/
  ├── config.toml                  # Build config (optional)
  └── posts/                       # Content type
      ├── hello-world/             # Entity (directory name = identity)
      │   ├── index.toml           # title, date, categories, slug, draft
      │   ├── content.md           # Body, rendered into the entity document
      │   ├── excerpt.md           # Excerpt, rendered into index pages
      │   └── static/              # Optional assets → dist/static/posts/hello-world/
      └── another-post/
          └── ...

Output structure:

  dist/
  ├── posts/<name>/index.json              # Entity documents
  ├── static/posts/<name>/...              # Copied static assets
  └── categories/posts/
      ├── index.json                       # Categories listing
      ├── <category>/<page>/index.json     # Paginated category indexes
      ├── cache.json                       # Incremental build state
      └── manifest.json                    # Hash lookup (with --hash)

Builds are incremental: unchanged entries are never re-read, and only index
pages affected by a change are rewritten. Run 'static-api gen-config' to
generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Content source directory
    #[arg(long, default_value = "content", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute and apply the update for every content type
    Build(BuildArgs),
    /// Compute the update and print it without writing anything
    Plan(BuildArgs),
    /// Validate every source entry without building
    Check,
    /// Scaffold a new draft entry
    Add {
        /// Content type the entry belongs to
        #[arg(value_name = "TYPE")]
        type_name: String,
        /// Entry title; also names the entry unless --slug is given
        title: String,
        /// Publication date as YYYYMMDD
        #[arg(long)]
        date: u32,
        /// Category the entry belongs to (repeatable)
        #[arg(long = "category", required = true)]
        categories: Vec<String>,
        /// Directory name and URL identity
        #[arg(long)]
        slug: Option<String>,
        /// Initial markdown body
        #[arg(long)]
        content: Option<String>,
        /// Initial markdown excerpt
        #[arg(long)]
        excerpt: Option<String>,
    },
    /// Update an existing entry's metadata, body, or excerpt
    Set {
        /// Content type the entry belongs to
        #[arg(value_name = "TYPE")]
        type_name: String,
        /// Entry name (source directory name)
        name: String,
        #[arg(long)]
        title: Option<String>,
        /// Publication date as YYYYMMDD
        #[arg(long)]
        date: Option<u32>,
        /// Replacement category set (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
        #[arg(long)]
        slug: Option<String>,
        /// Draft status; `--draft false` publishes the entry
        #[arg(long)]
        draft: Option<bool>,
        /// Replacement markdown body
        #[arg(long)]
        content: Option<String>,
        /// Replacement markdown excerpt
        #[arg(long)]
        excerpt: Option<String>,
    },
    /// Delete an entry's source; the next build removes its endpoints
    Remove {
        /// Content type the entry belongs to
        #[arg(value_name = "TYPE")]
        type_name: String,
        /// Entry name (source directory name)
        name: String,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Build(args) => {
            let config = build_config(&cli, args)?;
            run_types(&config, |type_name, config| {
                let update = plan::plan_type(type_name, config)?;
                let stats = endpoints::commit(&update, config)?;
                output::print_build_summary(type_name, &stats);
                Ok(())
            })?;
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Plan(args) => {
            let config = build_config(&cli, args)?;
            run_types(&config, |type_name, config| {
                let update = plan::plan_type(type_name, config)?;
                output::print_update_output(&update);
                Ok(())
            })?;
        }
        Command::Check => {
            // Forcing the plan renders every entry, so metadata and markdown
            // problems surface without writing anything.
            let mut config = build_config(&cli, &no_args())?;
            config.force = true;
            println!("==> Checking {}", cli.source.display());
            run_types(&config, |type_name, config| {
                let update = plan::plan_type(type_name, config)?;
                let entries = update.entries.add.len() + update.entries.update.len();
                println!("{}: {} entries", type_name, entries);
                Ok(())
            })?;
            println!("==> Content is valid");
        }
        Command::Add {
            type_name,
            title,
            date,
            categories,
            slug,
            content,
            excerpt,
        } => {
            let config = build_config(&cli, &no_args())?;
            let spec = NewEntry {
                title: title.clone(),
                date: *date,
                categories: categories.clone(),
                slug: slug.clone(),
                content: content.clone(),
                excerpt: excerpt.clone(),
            };
            let entry = author::add_entry(&spec, type_name, &config)?;
            println!("Added draft '{}' at {}", entry.name, entry.src.display());
            println!("Publish with: static-api set {} {} --draft false", type_name, entry.name);
        }
        Command::Set {
            type_name,
            name,
            title,
            date,
            categories,
            slug,
            draft,
            content,
            excerpt,
        } => {
            let config = build_config(&cli, &no_args())?;
            let changes = EntryChanges {
                title: title.clone(),
                date: *date,
                categories: (!categories.is_empty()).then(|| categories.clone()),
                slug: slug.clone(),
                draft: *draft,
                content: content.clone(),
                excerpt: excerpt.clone(),
            };
            let entry = author::set_entry(name, &changes, type_name, &config)?;
            println!("Updated '{}' at {}", entry.name, entry.src.display());
        }
        Command::Remove { type_name, name } => {
            let config = build_config(&cli, &no_args())?;
            let entry = author::remove_entry(name, type_name, &config)?;
            println!("Removed sources of '{}'", entry.name);
            println!("Run 'static-api build' to remove its endpoints");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn no_args() -> BuildArgs {
    BuildArgs {
        force: false,
        hash: false,
        sub_version: false,
        entities_per_page: None,
    }
}

/// Assemble the build configuration: defaults, then config.toml, then flags.
fn build_config(cli: &Cli, args: &BuildArgs) -> Result<BuildConfig, config::ConfigError> {
    let file = config::load_file_config(&cli.source)?;
    let mut config =
        BuildConfig::new(cli.source.clone(), cli.output.clone()).merge_file(&file);
    if args.force {
        config.force = true;
    }
    if args.hash {
        config.hash = true;
    }
    if args.sub_version {
        config.sub_version = true;
    }
    if let Some(n) = args.entities_per_page {
        config.entities_per_page = n;
    }
    config.validate()?;
    Ok(config)
}

/// Run one action per content type; a failing type does not stop the others.
///
/// An up-to-date type is reported, not treated as a failure.
fn run_types(
    config: &BuildConfig,
    action: impl Fn(&str, &BuildConfig) -> Result<(), Box<dyn std::error::Error>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let types = plan::list_types(config)?;
    let mut failed = 0;
    for type_name in &types {
        match action(type_name, config) {
            Ok(()) => {}
            Err(err) => {
                if let Some(plan::PlanError::NothingToBuild { .. }) =
                    err.downcast_ref::<plan::PlanError>()
                {
                    println!("{}: up to date", type_name);
                    continue;
                }
                eprintln!("{}", err);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        return Err(format!("{failed} of {} content types failed", types.len()).into());
    }
    Ok(())
}
