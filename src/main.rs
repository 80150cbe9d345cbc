use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use usda_import::config::{DEFAULT_ARCHIVE, DEFAULT_BATCH_SIZE, DEFAULT_DATABASE};
use usda_import::{db, logging, migrate, query, run_import};
use usda_import::{EntitySelection, ImportConfig, SourceEncoding};

#[derive(Parser)]
#[command(name = "usda-import", version, about = "USDA Standard Reference importer")]
struct Cli {
    /// SQLite database to import into or read from
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_DATABASE)]
    database: PathBuf,

    /// 0 = warnings, 1 = progress, 2 = every row, 3 = SQL
    #[arg(short, long, global = true, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=3))]
    verbosity: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Import an SR distribution archive
    Import(ImportArgs),
    /// Inspect imported foods
    #[command(subcommand)]
    Foods(FoodsCmd),
    /// Apply schema migrations only
    Migrate,
}

#[derive(Args)]
struct ImportArgs {
    /// Zip archive of the SR distribution
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_ARCHIVE)]
    filename: PathBuf,

    /// Import everything (the default when no type is flagged)
    #[arg(long)]
    all: bool,
    /// Food groups
    #[arg(long)]
    group: bool,
    /// Foods
    #[arg(long)]
    food: bool,
    /// Nutrient definitions
    #[arg(long)]
    nutrient: bool,
    /// Weights
    #[arg(long)]
    weight: bool,
    /// Footnotes
    #[arg(long)]
    footnote: bool,
    /// Bibliographic data sources
    #[arg(long)]
    datasource: bool,
    /// Data derivation codes
    #[arg(long)]
    derivation: bool,
    /// Source codes
    #[arg(long)]
    source: bool,
    /// Nutrient data
    #[arg(long)]
    data: bool,
    /// Nutrient data to data source links
    #[arg(long)]
    link: bool,

    /// Nutrient data rows per batch
    #[arg(long, value_name = "N", default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Encoding of the archive members (latin1 or utf8)
    #[arg(long, default_value_t = SourceEncoding::Latin1)]
    encoding: SourceEncoding,

    /// Write a JSON report of the run into this directory
    #[arg(long, value_name = "DIR")]
    report_dir: Option<PathBuf>,
}

impl ImportArgs {
    fn selection(&self) -> EntitySelection {
        EntitySelection {
            all: self.all,
            group: self.group,
            food: self.food,
            nutrient: self.nutrient,
            weight: self.weight,
            footnote: self.footnote,
            datasource: self.datasource,
            derivation: self.derivation,
            source: self.source,
            data: self.data,
            link: self.link,
        }
    }
}

#[derive(Subcommand)]
enum FoodsCmd {
    /// List foods by databank number
    List {
        #[arg(long, default_value_t = query::DEFAULT_LIST_LIMIT)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
    /// Show one food with its weights and nutrients
    Show {
        /// Databank number
        ndb: i64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = logging::init_logging(cli.verbosity, cli.json_logs) {
        eprintln!("warning: {err:#}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let pool = db::open_sqlite_pool(&cli.database)
        .await
        .with_context(|| format!("open database {}", cli.database.display()))?;

    match cli.cmd {
        Cmd::Import(args) => {
            let config = ImportConfig {
                archive_path: args.filename.clone(),
                database_path: cli.database.clone(),
                selection: args.selection(),
                batch_size: args.batch_size,
                encoding: args.encoding,
                report_dir: args.report_dir.clone(),
                verbosity: cli.verbosity,
            };
            let report = run_import(&pool, config).await?;
            for entity in &report.entities {
                println!(
                    "{:<18} created {:>7}  updated {:>7}",
                    entity.entity.label(),
                    entity.summary.created,
                    entity.summary.updated
                );
            }
        }
        Cmd::Foods(FoodsCmd::List { limit, offset }) => {
            let foods = query::list_foods(&pool, limit, offset).await?;
            println!("{}", serde_json::to_string_pretty(&foods)?);
        }
        Cmd::Foods(FoodsCmd::Show { ndb }) => match query::get_food(&pool, ndb).await? {
            Some(food) => println!("{}", serde_json::to_string_pretty(&food)?),
            None => anyhow::bail!("food {ndb} has not been imported"),
        },
        Cmd::Migrate => {
            migrate::apply_migrations(&pool).await?;
            let applied = migrate::applied_versions(&pool).await?;
            println!("DB: {}", cli.database.display());
            println!(
                "Applied: {}/{}",
                applied.len(),
                migrate::embedded_versions().len()
            );
        }
    }

    pool.close().await;
    Ok(())
}
