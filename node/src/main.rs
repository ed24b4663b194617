use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use issuance_economics::{
    parse_genesis_alloc, BalanceState, BlockContext, BlockIssuer, GenesisAccumulator,
    GenesisAlloc, InMemoryState, TracingObserver,
};
use issuance_types::{parse_amount, Amount};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Subscriber};
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

mod settings;
mod version;

use settings::NodeConfig;
use version::{git_commit_hash, ISSUANCE_NODE_VERSION};

fn build_cli() -> Command {
    Command::new("issuance-node")
        .version(ISSUANCE_NODE_VERSION)
        .about("Bounded-issuance block simulator")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("genesis")
                .short('g')
                .long("genesis")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Genesis allocation JSON ({\"0x…\": {\"balance\": \"0x…\"}})"),
        )
        .arg(
            Arg::new("blocks")
                .short('b')
                .long("blocks")
                .value_name("N")
                .value_parser(value_parser!(u64))
                .default_value("10")
                .help("Number of blocks to produce"),
        )
        .arg(
            Arg::new("fees-per-block")
                .short('f')
                .long("fees-per-block")
                .value_name("UNITS")
                .default_value("0")
                .help("Transaction fees collected per block, decimal or 0x hex"),
        )
        .arg(
            Arg::new("audit")
                .long("audit")
                .action(ArgAction::SetTrue)
                .help("Print the full audit log after the run"),
        )
}

/// Subscriber for the configured format; `json` emits one object per event.
fn build_subscriber<W>(
    config: &NodeConfig,
    filter: EnvFilter,
    writer: W,
) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'a> MakeWriter<'a> + Clone + Send + Sync + 'static,
{
    let json = config.log_format == "json";

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(writer.clone())))
        .with((!json).then(|| fmt::layer().pretty().with_writer(writer)))
}

fn init_logging(config: &NodeConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    build_subscriber(config, filter, std::io::stdout)
        .try_init()
        .context("failed to install the tracing subscriber")?;
    Ok(())
}

fn load_genesis(path: Option<&Path>) -> Result<GenesisAlloc> {
    let Some(path) = path else {
        return Ok(GenesisAlloc::new());
    };

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read genesis file {}", path.display()))?;
    let alloc = parse_genesis_alloc(&raw)
        .with_context(|| format!("invalid genesis file {}", path.display()))?;
    Ok(alloc)
}

fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let config_path = matches.get_one::<PathBuf>("config");
    let config = NodeConfig::load(config_path.map(PathBuf::as_path))?;
    init_logging(&config)?;

    info!(
        "Starting issuance-node {} (commit {})",
        ISSUANCE_NODE_VERSION,
        git_commit_hash()
    );

    let blocks = matches.get_one::<u64>("blocks").copied().unwrap_or(10);
    let fees_per_block: Amount = matches
        .get_one::<String>("fees-per-block")
        .map(|raw| parse_amount(raw))
        .transpose()
        .context("invalid --fees-per-block")?
        .unwrap_or_default();

    let genesis = load_genesis(matches.get_one::<PathBuf>("genesis").map(PathBuf::as_path))?;
    let mut state = InMemoryState::from_genesis(&genesis);
    let accumulator = GenesisAccumulator::new();
    let issuer = BlockIssuer::from_genesis(
        &genesis,
        &accumulator,
        config.policy.clone(),
        Arc::new(TracingObserver),
    )
    .context("genesis premine exceeds the configured supply cap")?;

    info!(
        "Genesis premine {} tokens across {} accounts; cap {} tokens",
        issuer.current_supply().to_token_string(),
        genesis.len(),
        config.policy.max_supply.to_token_string()
    );

    let context = BlockContext {
        owner: config.owner_address,
        producer: config.producer_address,
        total_fees: Some(fees_per_block),
    };

    for block in 1..=blocks {
        let settlement = issuer
            .process_block(&mut state, block, &context)
            .with_context(|| format!("block {block} failed to settle"))?;

        if settlement.cap_reached {
            warn!("Supply cap reached at block {}; stopping early", block);
            break;
        }
    }

    let ledger = issuer.ledger();
    ledger
        .verify_audit_chain()
        .context("audit chain verification failed")?;

    println!("{}", serde_json::to_string_pretty(&ledger.supply_info())?);
    if matches.get_flag("audit") {
        println!("{}", serde_json::to_string_pretty(&ledger.audit_log())?);
    }

    info!(
        "Owner balance {} tokens, producer balance {} tokens",
        state.balance(&config.owner_address).to_token_string(),
        state.balance(&config.producer_address).to_token_string()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::Mutex;

    /// Writer that keeps everything the subscriber prints.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(str::to_owned)
                .collect()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn log_with_format(format: &str) -> Vec<String> {
        let config = NodeConfig {
            log_format: format.to_string(),
            ..NodeConfig::default()
        };
        let captured = Captured::default();
        let subscriber = build_subscriber(&config, EnvFilter::new("info"), captured.clone());

        tracing::subscriber::with_default(subscriber, || {
            info!(target: "issuance", block = 7u64, "reward minted");
        });
        captured.lines()
    }

    #[test]
    fn test_cli_defaults() {
        let matches = build_cli().get_matches_from(["issuance-node"]);
        assert_eq!(matches.get_one::<u64>("blocks"), Some(&10));
        assert_eq!(
            matches.get_one::<String>("fees-per-block").map(String::as_str),
            Some("0")
        );
        assert!(!matches.get_flag("audit"));
    }

    #[test]
    fn test_cli_rejects_non_numeric_blocks() {
        let result = build_cli().try_get_matches_from(["issuance-node", "--blocks", "many"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_genesis_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"0x0000000000000000000000000000000000000000": {{"balance": "0x10"}},
                "0x1111111111111111111111111111111111111111": {{"balance": "0x20"}}}}"#
        )
        .unwrap();

        let alloc = load_genesis(Some(file.path())).unwrap();
        assert_eq!(alloc.len(), 2);
        assert_eq!(
            GenesisAccumulator::new().compute_total(&alloc),
            Amount::from(0x20)
        );
    }

    #[test]
    fn test_missing_genesis_means_empty() {
        assert!(load_genesis(None).unwrap().is_empty());

        let dir = tempfile::tempdir().unwrap();
        assert!(load_genesis(Some(dir.path().join("none.json").as_path())).is_err());
    }

    #[test]
    fn test_json_format_emits_json_lines() {
        let lines = log_with_format("json");
        assert_eq!(lines.len(), 1);

        let event: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(event["target"], "issuance");
        assert_eq!(event["fields"]["message"], "reward minted");
        assert_eq!(event["fields"]["block"], 7);
    }

    #[test]
    fn test_pretty_format_is_not_json() {
        let lines = log_with_format("pretty");
        assert!(lines.iter().any(|line| line.contains("reward minted")));
        assert!(lines
            .iter()
            .all(|line| serde_json::from_str::<serde_json::Value>(line).is_err()));
    }
}
