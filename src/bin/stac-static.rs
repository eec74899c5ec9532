use clap::{Parser, Subcommand};
use stac_static::cli as prog_cli;
use stac_static::config::SearchConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stac-static", version, about = "Item search over a static STAC catalog", long_about = None)]
struct Cli {
    /// Path to a config file (TOML)
    #[arg(long, help = "Path to a config file (TOML). If omitted, STAC_STATIC_CONFIG or ./stac-static.toml is used.")]
    config: Option<PathBuf>,
    /// Log level (off|error|warn|info|debug|trace); overrides STAC_STATIC_LOG_LEVEL
    #[arg(long)]
    log_level: Option<String>,
    /// Log4rs YAML file; takes precedence over the STAC_STATIC_LOG_* variables
    #[arg(long)]
    log_config: Option<PathBuf>,
    /// Output format: human, plain, or json
    #[arg(long, default_value = "human")]
    format: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Search the items of a catalog")]
    Search {
        #[arg(help = "Path to the root catalog.json")]
        catalog: PathBuf,
        #[arg(long, help = "Comma-separated item ids")]
        ids: Option<String>,
        #[arg(long, help = "Comma-separated collection ids")]
        collections: Option<String>,
        #[arg(long, allow_hyphen_values = true, help = "minx,miny,maxx,maxy (or 6 values with z)")]
        bbox: Option<String>,
        #[arg(long, help = "GeoJSON geometry")]
        intersects: Option<String>,
        #[arg(long, help = "Single datetime or start/end range; '..' leaves a side open")]
        datetime: Option<String>,
        #[arg(long, help = "Filter expression (CQL2 text, or CQL2 JSON)")]
        filter: Option<String>,
        #[arg(long = "filter-lang", help = "cql2-text or cql2-json; inferred when omitted")]
        filter_lang: Option<String>,
        #[arg(long, help = "Print only the number of matches")]
        count: bool,
    },
    #[command(about = "Summarize a catalog")]
    Info { catalog: PathBuf },
    #[command(about = "List supported filter languages")]
    Languages,
}

fn init_logging(cli: &Cli) {
    let res = match (&cli.log_config, &cli.log_level) {
        (Some(path), _) => stac_static::utils::logger::init_path(path),
        (None, Some(level)) => {
            let dir = std::env::var("STAC_STATIC_LOG_DIR").ok().map(PathBuf::from);
            stac_static::utils::logger::configure_logging(dir.as_deref(), Some(level), None)
        }
        (None, None) => stac_static::utils::logger::configure_from_env(),
    };
    if let Err(e) = res {
        eprintln!("warning: logging disabled: {e}");
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    let cfg = match SearchConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };
    let mode = prog_cli::parse_output_mode(Some(&cli.format));
    let cmd = match cli.command {
        Commands::Search {
            catalog,
            ids,
            collections,
            bbox,
            intersects,
            datetime,
            filter,
            filter_lang,
            count,
        } => prog_cli::Command::Search {
            catalog,
            ids,
            collections,
            bbox,
            intersects,
            datetime,
            filter,
            filter_lang,
            count,
        },
        Commands::Info { catalog } => prog_cli::Command::Info { catalog },
        Commands::Languages => prog_cli::Command::Languages,
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = prog_cli::run_with_format(&mut out, cmd, mode, &cfg) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
