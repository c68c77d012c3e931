use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ilm_client::{ClientError, MockClient, Reply, RollupAction, RollupActionConfig};
use ilm_core::{ClusterState, StepKey, ILM_CUSTOM_METADATA_KEY};
use ilm_steps::{run_async_step, RollupStep, StepTransition};
use ilm_store::{applier_queue_cap, spawn_applier_from, ClusterStateObserver, MetadataUpdate};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "ilmctl", version, about = "ILM rollup step CLI")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Cluster state JSON file
    #[arg(long = "state", global = true, env = "ILM_STATE_FILE")]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// List indices with their policy, lifecycle position and rollup target
    Show,
    /// Run the rollup step for one index against a simulated cluster client
    Rollup {
        /// Index to roll up
        #[arg(long = "index")]
        index: String,
        /// Phase the rollup action runs in
        #[arg(long = "phase", default_value = "warm")]
        phase: String,
        /// Rollup config JSON file (default: 1h fixed date histogram on @timestamp)
        #[arg(long = "config")]
        config: Option<PathBuf>,
        /// Make the simulated client reject the request with this reason
        #[arg(long = "fail")]
        fail: Option<String>,
        /// Make the simulated client answer without acknowledging
        #[arg(long = "unacknowledged")]
        unacknowledged: bool,
        /// Simulated remote latency in milliseconds
        #[arg(long = "delay-ms", default_value_t = 0)]
        delay_ms: u64,
        /// Write the resulting cluster state here
        #[arg(long = "save")]
        save: Option<PathBuf>,
    },
}

fn init_tracing() {
    let env = std::env::var("ILM_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("ILM_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            warn!(addr = %addr, "invalid ILM_METRICS_ADDR; expected host:port");
        }
    }
}

fn load_state(path: &Path) -> Result<ClusterState> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading cluster state {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing cluster state {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<RollupActionConfig> {
    let Some(path) = path else { return Ok(RollupActionConfig::fixed("@timestamp", "1h")) };
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading rollup config {}", path.display()))?;
    let cfg: RollupActionConfig = serde_json::from_str(&raw).with_context(|| format!("parsing rollup config {}", path.display()))?;
    cfg.validate().map_err(|e| anyhow!("invalid rollup config {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn show(state: &ClusterState, output: Output) -> Result<()> {
    let mut rows: Vec<_> = state
        .metadata()
        .indices()
        .map(|im| {
            let exec = im.lifecycle_execution_state();
            let stream = state.metadata().data_stream_for_write_index(im.index()).map(|d| d.name().to_string());
            (
                im.name().to_string(),
                im.lifecycle_policy_name().to_string(),
                exec.current_step_key().map(|k| format!("{}/{}/{}", k.phase(), k.action(), k.name())),
                exec.rollup_index_name().map(str::to_string),
                stream,
            )
        })
        .collect();
    rows.sort();
    match output {
        Output::Human => {
            println!("{:<28} {:<16} {:<28} {:<24} DATA STREAM", "INDEX", "POLICY", "STEP", "ROLLUP INDEX");
            for (name, policy, step, target, stream) in rows {
                println!(
                    "{:<28} {:<16} {:<28} {:<24} {}",
                    name,
                    if policy.is_empty() { "-" } else { policy.as_str() },
                    step.as_deref().unwrap_or("-"),
                    target.as_deref().unwrap_or("-"),
                    stream.as_deref().unwrap_or("-"),
                );
            }
        }
        Output::Json => {
            let items: Vec<_> = rows
                .into_iter()
                .map(|(name, policy, step, target, stream)| {
                    serde_json::json!({ "index": name, "policy": policy, "step": step, "rollup_index": target, "data_stream": stream })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn rollup(
    state: ClusterState,
    output: Output,
    index: &str,
    phase: &str,
    config: RollupActionConfig,
    reply: Reply,
    delay: Duration,
    save: Option<&Path>,
) -> Result<()> {
    let im = state.metadata().index(index).cloned().ok_or_else(|| anyhow!("index [{}] not found in cluster state", index))?;

    let (updates, handle) = spawn_applier_from(state, applier_queue_cap());
    let mut observer = ClusterStateObserver::with_default_timeout(&handle);

    let client = Arc::new(MockClient::replying(reply).with_delay(delay));
    let key = StepKey::new(phase, RollupStep::NAME, RollupStep::NAME)?;
    let next_key = key.with_name("complete")?;
    let step = RollupStep::new(key.clone(), next_key, client.clone(), config);

    let snapshot = handle.current();
    info!(index = %index, step = %key, version = snapshot.version, "running rollup step");
    let outcome = run_async_step(&step, &im, &snapshot, Some(&observer)).await;

    let transition = match outcome {
        Ok(t) => t,
        Err(e) => {
            error!(index = %index, error = %e, "rollup step failed");
            if output == Output::Json {
                println!("{}", serde_json::json!({ "index": index, "error": e.to_string() }));
            }
            return Err(anyhow::Error::new(e).context(format!("rollup step failed for index [{}]", index)));
        }
    };

    // Record the new position the way the driver would, then wait for it to publish.
    let final_state = match &transition {
        StepTransition::Advance(next) => {
            let exec = im.lifecycle_execution_state().moved_to(next);
            let updated = im.to_builder().put_custom(ILM_CUSTOM_METADATA_KEY, exec.to_custom_map()).build()?;
            updates.send(MetadataUpdate::PutIndex(updated)).await.map_err(|_| anyhow!("state applier stopped"))?;
            observer.wait_for_next_change().await?
        }
        StepTransition::Stay(_) => handle.current(),
    };

    let request = client.requests().into_iter().next();
    match output {
        Output::Human => {
            if let Some(ilm_client::ActionRequest::Rollup(r)) = &request {
                println!("dispatched {} {} -> {}", RollupAction::NAME, r.source_index(), r.rollup_index());
            }
            match &transition {
                StepTransition::Advance(k) => println!("advanced to {}", k),
                StepTransition::Stay(k) => println!("stayed on {}", k),
            }
            println!("cluster state version {}", final_state.version);
        }
        Output::Json => {
            let body = serde_json::json!({
                "index": index,
                "request": request,
                "advanced": matches!(transition, StepTransition::Advance(_)),
                "step": match &transition { StepTransition::Advance(k) | StepTransition::Stay(k) => k },
                "version": final_state.version,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    if let Some(path) = save {
        let json = serde_json::to_string_pretty(final_state.as_ref())?;
        std::fs::write(path, json).with_context(|| format!("writing cluster state {}", path.display()))?;
        info!(path = %path.display(), "cluster state saved");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    let state_path = cli.state.as_deref().ok_or_else(|| anyhow!("--state <file> is required"))?;
    let state = load_state(state_path)?;

    match cli.command {
        Commands::Show => show(&state, cli.output)?,
        Commands::Rollup { index, phase, config, fail, unacknowledged, delay_ms, save } => {
            let config = load_config(config.as_deref())?;
            let reply = match fail {
                Some(reason) => Reply::Fail(ClientError::Rejected { action: RollupAction::NAME.to_string(), reason }),
                None => Reply::Ack(!unacknowledged),
            };
            rollup(state, cli.output, &index, &phase, config, reply, Duration::from_millis(delay_ms), save.as_deref()).await?;
        }
    }
    Ok(())
}
