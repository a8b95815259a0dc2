use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use tesouraria::config::{CACHE_PATH_VAR, DEFAULT_OUTPUT_DIR, OUTPUT_DIR_VAR};
use tesouraria::{
    assemble, default_ttl, parse_month, run, ApiClient, AssemblySummary, Config, ExtractSummary,
    Fetcher, HttpTransport, ResponseCache, TableStore, VERSION,
};

#[derive(Parser)]
#[command(name = "tesouraria", version, about = "Granatum ledger extraction")]
struct Cli {
    /// Directory for every table written
    #[arg(long, global = true, env = OUTPUT_DIR_VAR)]
    output_dir: Option<PathBuf>,

    /// SQLite response cache file
    #[arg(long, global = true, env = CACHE_PATH_VAR)]
    cache: Option<PathBuf>,

    /// Always hit the API
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch reference tables and monthly extracts
    Fetch(Period),
    /// Build hierarchies and the consolidated ledger from files on disk
    Assemble,
    /// Fetch, then assemble
    Run(Period),
}

#[derive(Args)]
struct Period {
    /// First month, YYYY-MM
    #[arg(long, value_parser = parse_month)]
    start: NaiveDate,

    /// Last month, YYYY-MM
    #[arg(long, value_parser = parse_month)]
    end: NaiveDate,
}

fn main() -> Result<()> {
    // .env before clap so `env = ...` flags see it
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match &cli.command {
        Command::Fetch(period) => run_fetch(&cli, period),
        Command::Assemble => {
            let dir = cli
                .output_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
            let store = TableStore::create(&dir)?;
            run_assemble(&store)
        }
        Command::Run(period) => run_all(&cli, period),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::from_env()?;
    if let Some(dir) = &cli.output_dir {
        config = config.with_output_dir(dir.clone());
    }
    if cli.no_cache {
        config = config.with_cache_path(None);
    } else if let Some(path) = &cli.cache {
        config = config.with_cache_path(Some(path.clone()));
    }
    Ok(config)
}

fn build_client(config: &Config) -> Result<ApiClient<HttpTransport>> {
    let cache = match &config.cache_path {
        Some(path) => {
            let cache = ResponseCache::open(path, default_ttl())?;
            let purged = cache.purge_expired()?;
            println!("🗃️  Response cache: {} ({} expired purged)", path.display(), purged);
            Some(cache)
        }
        None => {
            println!("🗃️  Response cache disabled");
            None
        }
    };

    Ok(ApiClient::from_config(config, HttpTransport::new(cache)?))
}

fn run_fetch(cli: &Cli, period: &Period) -> Result<()> {
    println!(
        "🏦 tesouraria {} - Fetch {} → {}",
        VERSION,
        period.start.format("%Y-%m"),
        period.end.format("%Y-%m")
    );
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = load_config(cli)?;
    let store = TableStore::create(&config.output_dir)?;
    let mut fetcher = Fetcher::new(build_client(&config)?, &store);

    println!("\n📚 Fetching reference tables...");
    let reference = fetcher.fetch_reference()?;
    for (table, rows) in &reference.tables {
        println!("✓ {}: {} rows", table, rows);
    }
    print_schema_warnings(&reference.reports);

    println!("\n📄 Fetching lancamentos for {} account(s)...", reference.contas.len());
    let extracts = fetcher.fetch_extracts(&reference.contas, period.start, period.end)?;
    print_extracts(&extracts);

    let (requests, hits) = fetcher.client().stats();
    println!("\n🌐 {} request(s), {} from cache", requests, hits);
    Ok(())
}

fn run_assemble(store: &TableStore) -> Result<()> {
    println!("🧩 tesouraria {} - Assembling ledger from {}...", VERSION, store.dir().display());
    let summary = assemble(store)?;
    print_assembly(&summary);
    Ok(())
}

fn run_all(cli: &Cli, period: &Period) -> Result<()> {
    println!(
        "🏦 tesouraria {} - Run {} → {}",
        VERSION,
        period.start.format("%Y-%m"),
        period.end.format("%Y-%m")
    );
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = load_config(cli)?;
    let store = TableStore::create(&config.output_dir)?;
    let mut fetcher = Fetcher::new(build_client(&config)?, &store);

    let summary = run(&mut fetcher, period.start, period.end)?;

    for (table, rows) in &summary.reference.tables {
        println!("✓ {}: {} rows", table, rows);
    }
    print_schema_warnings(&summary.reference.reports);
    print_extracts(&summary.extracts);
    print_assembly(&summary.assembly);
    Ok(())
}

fn print_schema_warnings(reports: &[tesouraria::SchemaReport]) {
    for report in reports.iter().filter(|r| !r.is_clean()) {
        let fields: Vec<&str> = report.unexpected.keys().map(String::as_str).collect();
        println!("⚠️  {}: unexpected fields {}", report.endpoint, fields.join(", "));
    }
}

fn print_extracts(extracts: &[ExtractSummary]) {
    let rows: usize = extracts.iter().map(|e| e.retrieved).sum();
    println!("✓ {} extract(s), {} lancamento(s)", extracts.len(), rows);

    for extract in extracts.iter().filter(|e| !e.complete) {
        println!(
            "⚠️  conta {} {}: expected {}, got {}",
            extract.account_id,
            extract.month.format("%Y-%m"),
            extract.expected,
            extract.retrieved
        );
    }
}

fn print_assembly(summary: &AssemblySummary) {
    let stats = &summary.stats;
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Ledger: {} rows from {} extract(s)", stats.rows, summary.extracts);
    println!("   {}", summary.path.display());
    println!(
        "   paths: {} categorias, {} centros de custo/lucro",
        summary.categorias_paths, summary.centros_paths
    );
    println!(
        "   unresolved: conta={} categoria={} centro={} forma={} pessoa={}",
        stats.conta_unresolved,
        stats.categoria_unresolved,
        stats.centro_custo_lucro_unresolved,
        stats.forma_pagamento_unresolved,
        stats.pessoa_unresolved
    );
}
