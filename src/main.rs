//! POS Overrides CLI
//!
//! Inspect a fixture set the way a branch sees it.

use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::{Args, Parser, Subcommand};
use rusty_money::iso::Currency;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pos_overrides::{
    catalog::Catalog,
    entities::{Entity, EntityKind},
    fixtures::Fixture,
    ids::BranchId,
    listing::ScopeFilter,
    records::EntityId,
    report::{currency, write_listing, write_view},
    wire::{override_to_json, parse_patch_str},
};

#[derive(Debug, Parser)]
#[command(name = "pos-overrides", about = "Branch override inspector", long_about = None)]
struct Cli {
    /// Directory holding the fixture sets
    #[arg(long, env = "POS_FIXTURES_DIR", default_value = "./fixtures", global = true)]
    fixtures: PathBuf,

    /// Fixture set name
    #[arg(long, env = "POS_FIXTURE_SET", default_value = "demo", global = true)]
    set: String,

    /// ISO currency code used to format amounts
    #[arg(long, env = "POS_CURRENCY", default_value = "IDR", global = true)]
    currency: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List everything a branch sees for one entity kind
    List(ListArgs),

    /// Resolve one general record for a branch
    Resolve(ResolveArgs),

    /// Apply an override patch and show the result
    Apply(ApplyArgs),
}

#[derive(Debug, Args)]
struct Target {
    /// Entity kind: category, product or discount
    #[arg(long)]
    kind: EntityKind,

    /// Branch id
    #[arg(long)]
    branch: String,
}

#[derive(Debug, Args)]
struct ListArgs {
    #[command(flatten)]
    target: Target,

    /// Scope filter: all, general, local or overridden
    #[arg(long, default_value = "all")]
    scope: ScopeFilter,
}

#[derive(Debug, Args)]
struct ResolveArgs {
    #[command(flatten)]
    target: Target,

    /// General record id
    #[arg(long)]
    id: String,
}

#[derive(Debug, Args)]
struct ApplyArgs {
    #[command(flatten)]
    target: Target,

    /// General record id
    #[arg(long)]
    id: String,

    /// JSON object keyed by field wire name; null resets a field
    #[arg(long)]
    patch: String,
}

fn main() -> ExitCode {
    let _env = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            #[expect(clippy::print_stderr, reason = "final error report for the user")]
            {
                eprintln!("{message}");
            }

            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let currency = currency(&cli.currency).map_err(|error| error.to_string())?;

    let mut fixture = Fixture::from_set_in(&cli.fixtures, &cli.set)
        .map_err(|error| format!("failed to load fixture set `{}`: {error}", cli.set))?;

    info!(set = %cli.set, path = %cli.fixtures.display(), "loaded fixture set");

    let out = io::stdout().lock();

    match cli.command {
        Commands::List(args) => match args.target.kind {
            EntityKind::Category => list(fixture.categories(), &args, currency, out),
            EntityKind::Product => list(fixture.products(), &args, currency, out),
            EntityKind::Discount => list(fixture.discounts(), &args, currency, out),
        },
        Commands::Resolve(args) => match args.target.kind {
            EntityKind::Category => resolve(fixture.categories(), &args, currency, out),
            EntityKind::Product => resolve(fixture.products(), &args, currency, out),
            EntityKind::Discount => resolve(fixture.discounts(), &args, currency, out),
        },
        Commands::Apply(args) => match args.target.kind {
            EntityKind::Category => apply(fixture.categories_mut(), &args, currency, out),
            EntityKind::Product => apply(fixture.products_mut(), &args, currency, out),
            EntityKind::Discount => apply(fixture.discounts_mut(), &args, currency, out),
        },
    }
}

fn list<E: Entity>(
    catalog: &Catalog<E>,
    args: &ListArgs,
    currency: &Currency,
    out: impl Write,
) -> Result<(), String> {
    let branch = BranchId::new(args.target.branch.as_str());

    let rows = catalog
        .branch_listing(&branch, args.scope)
        .map_err(|error| error.to_string())?;

    write_listing(out, &rows, currency).map_err(|error| error.to_string())
}

fn resolve<E: Entity>(
    catalog: &Catalog<E>,
    args: &ResolveArgs,
    currency: &Currency,
    out: impl Write,
) -> Result<(), String> {
    let branch = BranchId::new(args.target.branch.as_str());

    let view = catalog
        .resolve(&branch, &EntityId::new(args.id.as_str()))
        .map_err(|error| error.to_string())?;

    write_view(out, &view, currency).map_err(|error| error.to_string())
}

fn apply<E: Entity>(
    catalog: &mut Catalog<E>,
    args: &ApplyArgs,
    currency: &Currency,
    mut out: impl Write,
) -> Result<(), String> {
    let branch = BranchId::new(args.target.branch.as_str());
    let id = EntityId::new(args.id.as_str());

    let general = catalog.record(&id).map_err(|error| error.to_string())?;

    let patch = parse_patch_str(general.attributes(), &args.patch)
        .map_err(|error| format!("invalid patch: {error}"))?;

    let stored = catalog
        .apply_override(&branch, &id, &patch)
        .map_err(|error| error.to_string())?;

    let json = serde_json::to_string_pretty(&override_to_json(&stored))
        .map_err(|error| error.to_string())?;

    writeln!(out, "{json}").map_err(|error| error.to_string())?;

    let view = catalog
        .resolve(&branch, &id)
        .map_err(|error| error.to_string())?;

    write_view(out, &view, currency).map_err(|error| error.to_string())
}
