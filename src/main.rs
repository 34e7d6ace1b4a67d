use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use shard_loadgen::config::{PartitionKeyMode, RoutingMode, SizeRange};
use shard_loadgen::output::OutputWriter;
use shard_loadgen::transport::TransportBuilder;
use shard_loadgen::transport::config::{parse_connect_kv, parse_engine};
use shard_loadgen::{BatchRequest, Dispatcher, LoadConfig, logging};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Clone, Copy, ValueEnum)]
enum Routing {
    None,
    Describe,
    Static,
}

#[derive(Clone, Copy, ValueEnum)]
enum Keys {
    Uuid,
    Indexed,
}

#[derive(Parser)]
#[command(name = "shard-loadgen")]
#[command(about = "Synthetic record load generator for sharded streams")]
struct Cli {
    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// YAML config file; flags below override its values
    #[arg(long)]
    config: Option<String>,

    /// Transport engine (kinesis, mock)
    #[arg(long, default_value = "kinesis")]
    engine: String,

    /// Transport options as key=value (e.g. region=eu-west-1)
    #[arg(long = "connect")]
    connect: Vec<String>,

    /// Number of records to send
    #[arg(long, conflicts_with = "request")]
    records: Option<u64>,

    /// Batch request as JSON, e.g. '{"totalRecordCount": 120}'
    #[arg(long)]
    request: Option<String>,

    /// Stream to write to
    #[arg(long)]
    stream: Option<String>,

    /// Records per put request
    #[arg(long)]
    batch_size: Option<usize>,

    /// Smallest size unit drawn per record (inclusive)
    #[arg(long)]
    size_min: Option<u32>,

    /// Largest size unit drawn per record (exclusive)
    #[arg(long)]
    size_max: Option<u32>,

    /// Bytes per size unit
    #[arg(long)]
    size_scale: Option<u32>,

    /// Shard routing
    #[arg(long, value_enum)]
    routing: Option<Routing>,

    /// Start hash keys for static routing (comma separated)
    #[arg(long, value_delimiter = ',')]
    hash_keys: Vec<String>,

    /// Partition key style
    #[arg(long, value_enum)]
    partition_keys: Option<Keys>,

    /// RNG seed for reproducible payload sizes
    #[arg(long)]
    seed: Option<u64>,

    /// Upper bound on put requests per second
    #[arg(long)]
    max_chunks_per_second: Option<f64>,

    /// Write the run summary as CSV to this path (stdout if omitted)
    #[arg(long)]
    csv: Option<String>,

    /// Print the run summary as JSON instead of CSV
    #[arg(long, conflicts_with = "csv")]
    json: bool,
}

impl Cli {
    fn load_config(&self) -> Result<LoadConfig> {
        let mut cfg = match &self.config {
            Some(path) => LoadConfig::from_yaml_file(path)?,
            None => LoadConfig::default(),
        };
        if let Some(s) = &self.stream {
            cfg.stream_name = s.clone();
        }
        if let Some(n) = self.batch_size {
            cfg.max_batch_size = n;
        }
        cfg.size_range = SizeRange {
            min: self.size_min.unwrap_or(cfg.size_range.min),
            max: self.size_max.unwrap_or(cfg.size_range.max),
        };
        if let Some(scale) = self.size_scale {
            cfg.size_scale = scale;
        }
        match self.routing {
            Some(Routing::None) => cfg.routing = RoutingMode::None,
            Some(Routing::Describe) => cfg.routing = RoutingMode::Describe,
            Some(Routing::Static) if self.hash_keys.is_empty() => {
                // keep a static table from the config file
                if !matches!(cfg.routing, RoutingMode::Static { .. }) {
                    bail!("--routing static needs --hash-keys or a static table in --config");
                }
            }
            Some(Routing::Static) => {
                cfg.routing = RoutingMode::Static {
                    start_hash_keys: self.hash_keys.clone(),
                }
            }
            None if !self.hash_keys.is_empty() => bail!("--hash-keys requires --routing static"),
            None => {}
        }
        match self.partition_keys {
            Some(Keys::Uuid) => cfg.partition_keys = PartitionKeyMode::Uuid,
            Some(Keys::Indexed) => cfg.partition_keys = PartitionKeyMode::Indexed,
            None => {}
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        if self.max_chunks_per_second.is_some() {
            cfg.max_chunks_per_second = self.max_chunks_per_second;
        }
        Ok(cfg)
    }

    fn batch_request(&self) -> Result<BatchRequest> {
        match (&self.request, self.records) {
            (Some(json), _) => Ok(BatchRequest::from_json(json)?),
            (None, Some(n)) => Ok(BatchRequest::new(n)),
            (None, None) => bail!("one of --records or --request is required"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level)?;

    let config = cli.load_config()?;
    let request = cli.batch_request()?;
    let engine = parse_engine(&cli.engine).with_context(|| format!("unknown engine: {}", cli.engine))?;

    let transport = TransportBuilder::connect(engine, parse_connect_kv(&cli.connect))
        .await
        .context("transport connect")?;
    let transport: Arc<dyn shard_loadgen::transport::StreamTransport> = Arc::from(transport);
    let dispatcher = Dispatcher::new(transport.clone(), config)?;

    let mut output = if let Some(path) = &cli.csv {
        OutputWriter::new_csv(path)?
    } else if cli.json {
        OutputWriter::new_json()
    } else {
        OutputWriter::new_stdout()
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl+C received, stopping after the current chunk");
                cancel.cancel();
            }
        });
    }

    let summary = dispatcher.run_until(&request, cancel).await?;
    output.write_summary(&summary)?;

    transport.shutdown().await.context("transport shutdown")?;
    Ok(())
}
