//! gateway-cache: inspect the option-store cache and run the CIDR and
//! constant helpers from a shell.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::info;

use gateway_cache_core::constants::{self, BaseConstant, CacheKey};
use gateway_cache_core::logging::init_logging;
use gateway_cache_core::{CidrRange, Clock, Config, DatabaseCache, SqliteOptionStore, SystemClock};

#[derive(Parser)]
#[command(name = "gateway-cache")]
#[command(about = "Inspect the gateway option cache and related helpers")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "GATEWAY_CACHE_CONFIG", default_value = "gateway-cache.toml")]
    config: PathBuf,

    /// SQLite database (overrides config file)
    #[arg(long, env = "GATEWAY_CACHE_DB")]
    db: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a cached entry without regenerating it
    Show {
        /// Option name or cache key constant (e.g. ACCOUNT_KEY)
        key: String,
    },
    /// List stored option names
    Keys,
    /// Print the address range of a CIDR block
    Cidr {
        /// Address, or address/prefix
        address: String,
        /// Prefix length (defaults: /20 IPv4, /48 IPv6)
        #[arg(short, long)]
        prefix: Option<u8>,
    },
    /// Resolve a constant by name or value
    Constant {
        /// Constant set (payment-method, payment-type, initiated-by, capture-type, intent-status, cache-key)
        set: String,
        /// Constant name or value
        input: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Command::Show { key } => {
            let config = load_config(&cli.config, cli.db)?;
            show(&config, &key)
        }
        Command::Keys => {
            let config = load_config(&cli.config, cli.db)?;
            let store = open_store(&config)?;
            for key in store.keys()? {
                println!("{}", key);
            }
            Ok(())
        }
        Command::Cidr { address, prefix } => {
            let range = cidr(&address, prefix)?;
            println!("{}", range);
            Ok(())
        }
        Command::Constant { set, input } => {
            let (name, value) = constants::lookup(&set, &input).with_context(|| {
                format!("known sets: {}", constants::CONSTANT_SETS.join(", "))
            })?;
            println!("{} = {}", name, value);
            Ok(())
        }
    }
}

fn load_config(path: &Path, db: Option<PathBuf>) -> anyhow::Result<Config> {
    let mut config = Config::load(path)
        .with_context(|| format!("loading config {}", path.display()))?
        .apply_env();
    if let Some(db) = db {
        config.storage.database_path = db;
    }
    Ok(config)
}

fn open_store(config: &Config) -> anyhow::Result<SqliteOptionStore> {
    let path = &config.storage.database_path;
    SqliteOptionStore::open(path).with_context(|| format!("opening database at {}", path.display()))
}

fn show(config: &Config, key: &str) -> anyhow::Result<()> {
    let option_name = CacheKey::from_name(key)
        .map(|k| k.get_value().to_string())
        .unwrap_or_else(|_| key.to_string());

    let store = open_store(config)?;
    let cache = DatabaseCache::new(store, config.cache.clone());

    let entry = match cache.entry::<Value>(&option_name) {
        Some(entry) => entry,
        None => bail!("no well-formed cache entry for {}", option_name),
    };

    let now = SystemClock.now();
    let ttl_secs = config.cache.ttl_for(&option_name);
    info!(key = %option_name, "Showing cache entry");

    let report = json!({
        "key": option_name,
        "fetched": entry.fetched,
        "age_secs": entry.age_secs(now),
        "ttl_secs": ttl_secs,
        "stale": entry.is_stale(now, ttl_secs),
        "errored": entry.errored,
        "data": entry.data,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cidr(address: &str, prefix: Option<u8>) -> anyhow::Result<CidrRange> {
    if address.contains('/') {
        if prefix.is_some() {
            bail!("prefix given twice");
        }
        return Ok(CidrRange::from_cidr(address)?);
    }

    let range = match prefix {
        None => CidrRange::from_ip(address)?,
        Some(prefix) => match address.parse::<IpAddr>() {
            Ok(IpAddr::V4(_)) => CidrRange::from_ipv4(address, prefix)?,
            Ok(IpAddr::V6(_)) => CidrRange::from_ipv6(address, prefix)?,
            Err(_) => bail!("invalid IP address: {}", address),
        },
    };
    Ok(range)
}
