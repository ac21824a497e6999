use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use relay::{
    AgentConfig, GatewayConfig, IdempotencyKey, ProviderId, SessionRecord, TenantId, TurnRequest,
    TurnResult, TurnStore, TurnStoreConfig, build_gateway,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Drive simulated turns through the relay gateway.
#[derive(Debug, Parser)]
#[command(name = "relay-sim", version, about)]
struct Args {
    /// Number of distinct turns to run.
    #[arg(long, default_value_t = 10)]
    turns: u32,

    /// Seed for the simulated vendors.
    #[arg(long)]
    seed: Option<u64>,

    /// JSON gateway config; `RELAY_*` variables are applied on top.
    #[arg(long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file to write through.
    #[arg(long, conflicts_with = "in_memory")]
    database: Option<PathBuf>,

    /// Keep everything in memory.
    #[arg(long)]
    in_memory: bool,

    #[arg(long, default_value = "vendorA")]
    primary: ProviderId,

    #[arg(long, default_value = "vendorB")]
    fallback: ProviderId,

    /// Run without a fallback provider.
    #[arg(long)]
    no_fallback: bool,

    /// Resubmit every key after the run and check the answers match.
    #[arg(long)]
    replay: bool,

    #[arg(long, default_value = "tenant-sim")]
    tenant: String,
}

#[derive(Debug, Default)]
struct Summary {
    succeeded: u32,
    rejected: u32,
    by_provider: BTreeMap<ProviderId, u32>,
    total_cost: f64,
    replay_matches: u32,
    replay_mismatches: u32,
}

impl Summary {
    fn record(&mut self, result: &TurnResult) {
        self.succeeded += 1;
        self.total_cost += result.cost;
        *self.by_provider.entry(result.provider_used).or_default() += 1;
    }
}

fn load_config(args: &Args) -> Result<GatewayConfig, Box<dyn Error>> {
    let config = match &args.config {
        Some(path) => GatewayConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => GatewayConfig::default(),
    };
    let mut config = config.with_env()?;

    if let Some(seed) = args.seed {
        config.simulation.seed = Some(seed);
    }
    if args.in_memory {
        config.store = TurnStoreConfig::InMemory;
    } else if let Some(path) = &args.database {
        config.store = TurnStoreConfig::Sqlite { path: path.clone() };
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let gateway = build_gateway(&config)?;

    let tenant = TenantId::from(args.tenant.as_str());
    let mut agent = AgentConfig::new("agent-sim", tenant.clone(), args.primary, "You are a helpful assistant.")
        .with_name("Simulated agent");
    if !args.no_fallback {
        agent = agent.with_fallback(args.fallback);
    }
    let session = SessionRecord::new("session-sim", tenant.clone(), agent.id.clone());
    gateway.seed(&agent, &session)?;
    info!(
        tenant_id = %tenant,
        primary = %args.primary,
        fallback = ?agent.fallback_provider.map(ProviderId::as_str),
        turns = args.turns,
        "starting simulation"
    );

    let mut summary = Summary::default();
    let mut completed: Vec<(IdempotencyKey, TurnResult)> = Vec::new();
    for index in 1..=args.turns {
        let key = IdempotencyKey::from(format!("sim-{index}"));
        let request = TurnRequest::new(
            tenant.clone(),
            session.id.clone(),
            format!("Simulated question number {index}"),
            key.clone(),
        );

        match gateway.handle_turn(request).await {
            Ok(result) => {
                summary.record(&result);
                completed.push((key, result));
            }
            Err(error) => {
                warn!(idempotency_key = %key, error = %error, "turn rejected");
                summary.rejected += 1;
            }
        }
    }

    if args.replay {
        for (key, first) in &completed {
            let request = TurnRequest::new(tenant.clone(), session.id.clone(), "replayed", key.clone());
            match gateway.handle_turn(request).await {
                Ok(replayed) if replayed == *first => summary.replay_matches += 1,
                Ok(_) => summary.replay_mismatches += 1,
                Err(error) => {
                    warn!(idempotency_key = %key, error = %error, "replay failed");
                    summary.replay_mismatches += 1;
                }
            }
        }
    }

    let store = gateway.store();
    let usage_events = store.list_usage_events(&tenant).await?;
    let provider_events = store.list_provider_events(&tenant).await?;

    println!("turns:            {}", args.turns);
    println!("succeeded:        {}", summary.succeeded);
    println!("rejected:         {}", summary.rejected);
    for (provider, count) in &summary.by_provider {
        println!("served by {:<8}{count}", provider.as_str());
    }
    println!("total cost:       {:.6}", summary.total_cost);
    println!("usage events:     {}", usage_events.len());
    println!("provider events:  {}", provider_events.len());
    if args.replay {
        println!("replay matches:   {}", summary.replay_matches);
        println!("replay misses:    {}", summary.replay_mismatches);
    }

    Ok(())
}
