use campaign_sim::{
    derive_campaign_id, format_currency, format_float, format_number, format_percent,
    AllocationScorer, Campaign, CampaignEngine, CampaignPlan, EngineConfig, LinearRevenueModel,
    OptimizationResult, OptimizationSuggestion, SamplerKind, SimulationResult,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info};

#[derive(Parser)]
#[command(
    name = "campaign-sim",
    about = "Multi-channel campaign simulator and budget optimizer"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Project reach, conversions and ROI for an even budget split.
    Simulate(CampaignArgs),
    /// Search for the budget split with the best predicted ROI.
    Optimize(CampaignArgs),
    /// Simulate, optimize and suggest in one pass.
    Plan(CampaignArgs),
    /// Optimize over several seeds concurrently.
    Sweep(SweepArgs),
    /// Print or write the effective configuration.
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
struct CampaignArgs {
    /// Campaign JSON file; reads stdin when omitted.
    #[arg(long)]
    campaign: Option<PathBuf>,
    /// Linear revenue model coefficients as JSON.
    #[arg(long)]
    model: Option<PathBuf>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    candidates: Option<usize>,
    /// dirichlet | uniform
    #[arg(long)]
    sampler: Option<String>,
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct SweepArgs {
    #[command(flatten)]
    campaign: CampaignArgs,
    /// Number of consecutive seeds to run, starting at the configured seed.
    #[arg(long, default_value_t = 5)]
    runs: u64,
}

#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    /// Persist the effective configuration to the resolved path.
    #[arg(long)]
    write: bool,
}

#[derive(Serialize)]
struct SweepRun {
    seed: u64,
    result: OptimizationResult,
}

#[tokio::main]
async fn main() {
    load_dotenv();
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cli = Cli::parse();

    match cli.command {
        Command::Simulate(args) => run_simulate(args),
        Command::Optimize(args) => run_optimize(args),
        Command::Plan(args) => run_plan(args),
        Command::Sweep(args) => run_sweep(args).await,
        Command::Config(args) => run_config(args),
    }
}

fn run_simulate(args: CampaignArgs) -> Result<(), String> {
    let campaign = read_campaign(args.campaign.as_deref())?;
    let (engine, _) = build_engine(&args)?;
    let result = engine.simulate(&campaign).map_err(|err| err.to_string())?;

    if args.json {
        return print_json(&result);
    }
    print_simulation("Simulation", &result);
    Ok(())
}

fn run_optimize(args: CampaignArgs) -> Result<(), String> {
    let campaign = read_campaign(args.campaign.as_deref())?;
    let (engine, _) = build_engine(&args)?;
    let result = engine.optimize(&campaign).map_err(|err| err.to_string())?;

    if args.json {
        return print_json(&result);
    }
    print_optimization(&result);
    Ok(())
}

fn run_plan(args: CampaignArgs) -> Result<(), String> {
    let campaign = read_campaign(args.campaign.as_deref())?;
    let (engine, _) = build_engine(&args)?;
    let plan = engine.plan(&campaign).map_err(|err| err.to_string())?;

    if args.json {
        return print_json(&plan);
    }
    print_plan(&plan);
    Ok(())
}

async fn run_sweep(args: SweepArgs) -> Result<(), String> {
    let campaign = Arc::new(read_campaign(args.campaign.campaign.as_deref())?);
    let (engine, config) = build_engine(&args.campaign)?;
    let engine = Arc::new(engine);
    let base_seed = config.optimizer.seed;

    let mut tasks = JoinSet::new();
    for offset in 0..args.runs.max(1) {
        let seed = base_seed.wrapping_add(offset);
        let engine = Arc::clone(&engine);
        let campaign = Arc::clone(&campaign);
        tasks.spawn_blocking(move || {
            engine
                .optimize_with_seed(&campaign, seed)
                .map(|result| SweepRun { seed, result })
        });
    }

    let mut runs = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let run = joined
            .map_err(|err| format!("sweep task failed: {}", err))?
            .map_err(|err| err.to_string())?;
        debug!(seed = run.seed, roi = run.result.predicted_roi, "sweep run finished");
        runs.push(run);
    }
    runs.sort_by_key(|run| run.seed);

    if args.campaign.json {
        return print_json(&runs);
    }

    println!("Seed sweep over {} runs:", runs.len());
    for run in &runs {
        println!(
            "  seed {:>6}: ROI {} | revenue {} | confidence {}",
            run.seed,
            format_percent(run.result.predicted_roi),
            format_currency(run.result.predicted_revenue),
            format_float(run.result.confidence_score, 2)
        );
    }
    let best = runs.iter().max_by(|a, b| {
        a.result
            .predicted_roi
            .partial_cmp(&b.result.predicted_roi)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    if let Some(best) = best {
        println!("\nBest seed {}:", best.seed);
        print_split(&best.result);
    }
    Ok(())
}

fn run_config(args: ConfigArgs) -> Result<(), String> {
    let (config, path) = EngineConfig::load(args.config).map_err(|err| err.to_string())?;

    if args.write {
        let path = path.ok_or_else(|| "no config path resolved".to_string())?;
        config.write(&path).map_err(|err| err.to_string())?;
        println!("Wrote config to {}", path.display());
        return Ok(());
    }

    if let Some(path) = path {
        println!("# resolved path: {}", path.display());
    }
    print!("{}", config.to_toml().map_err(|err| err.to_string())?);
    Ok(())
}

fn build_engine(args: &CampaignArgs) -> Result<(CampaignEngine, EngineConfig), String> {
    let (mut config, path) = EngineConfig::load(args.config.clone()).map_err(|err| err.to_string())?;
    if let Some(path) = path.filter(|path| path.exists()) {
        debug!(path = %path.display(), "loaded config");
    }

    if let Some(seed) = args.seed {
        config.optimizer.seed = seed;
    }
    if let Some(count) = args.candidates {
        config.optimizer.candidate_count = count;
    }
    if let Some(sampler) = args.sampler.as_deref() {
        config.optimizer.sampler = SamplerKind::from_str(sampler)
            .ok_or_else(|| format!("invalid sampler: {}", sampler))?;
    }

    let scorer = match args.model.as_deref() {
        Some(path) => {
            let payload = std::fs::read_to_string(path)
                .map_err(|err| format!("failed to read model {}: {}", path.display(), err))?;
            let model = LinearRevenueModel::from_json(&payload).map_err(|err| err.to_string())?;
            AllocationScorer::model_backed(model)
        }
        None => AllocationScorer::Heuristic,
    };
    info!(scorer = %scorer.label(), sampler = config.optimizer.sampler.label(), "engine ready");

    Ok((CampaignEngine::new(&config, scorer), config))
}

fn read_campaign(path: Option<&Path>) -> Result<Campaign, String> {
    let payload = match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|err| format!("failed to read campaign {}: {}", path.display(), err))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|err| format!("failed reading stdin: {}", err))?;
            buffer
        }
    };
    if payload.trim().is_empty() {
        return Err("missing campaign: pass --campaign or pipe JSON on stdin".to_string());
    }

    let mut campaign: Campaign =
        serde_json::from_str(&payload).map_err(|err| format!("invalid campaign JSON: {}", err))?;
    if campaign.id.trim().is_empty() {
        campaign.id = derive_campaign_id(&campaign.name);
    }
    Ok(campaign)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let payload = serde_json::to_string_pretty(value)
        .map_err(|err| format!("failed to serialize output: {}", err))?;
    println!("{}", payload);
    Ok(())
}

fn print_simulation(heading: &str, result: &SimulationResult) {
    let metrics = &result.metrics;
    println!("{} for {}", heading, result.campaign_id);
    println!(
        "Estimated reach: {} | engagement: {} | conversions: {}",
        format_number(metrics.estimated_reach as f64),
        format_number(metrics.estimated_engagement as f64),
        format_number(metrics.estimated_conversions as f64)
    );
    println!(
        "ROI: {}% | cost per conversion: {}",
        format_float(metrics.estimated_roi, 2),
        format_currency(metrics.cost_per_conversion)
    );

    if result.is_empty() {
        println!("No active channels.");
        return;
    }
    println!("Channels:");
    for (channel, metrics) in &result.channel_breakdown {
        println!(
            "  {:<12} spend {} | reach {} | conversions {} | ROI {}%",
            channel,
            format_currency(metrics.spend),
            format_number(metrics.reach as f64),
            format_number(metrics.conversions as f64),
            format_float(metrics.roi, 1)
        );
    }
}

fn print_split(result: &OptimizationResult) {
    for (channel, amount) in &result.recommended_split {
        println!("  {:<12} {}", channel, format_currency(*amount));
    }
}

fn print_optimization(result: &OptimizationResult) {
    println!("Recommended split ({}):", result.source.label());
    print_split(result);
    println!(
        "Predicted revenue: {} | ROI: {} | confidence: {}",
        format_currency(result.predicted_revenue),
        format_percent(result.display_roi()),
        format_float(result.confidence_score, 2)
    );
    if let Some(warning) = &result.warning {
        println!("Warning: {}", warning);
    }
}

fn print_suggestions(suggestions: &[OptimizationSuggestion]) {
    if suggestions.is_empty() {
        return;
    }
    println!("\nSuggestions:");
    for suggestion in suggestions {
        println!(
            "- [{}] {}: {}",
            suggestion.kind.label(),
            suggestion.title,
            suggestion.description
        );
        println!(
            "    impact: ROI +{} | reach +{} | conversions +{}",
            format_float(suggestion.impact.roi_increase, 1),
            format_float(suggestion.impact.reach_increase, 1),
            format_float(suggestion.impact.conversion_increase, 1)
        );
    }
}

fn print_plan(plan: &CampaignPlan) {
    print_simulation("Baseline", &plan.baseline);
    println!();
    print_optimization(&plan.optimization);
    println!();
    print_simulation("Projected", &plan.projected);
    print_suggestions(&plan.suggestions);
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campaign_sim=warn".into()),
        )
        .with_writer(io::stderr)
        .init();
}

fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let manifest_path = Path::new(manifest_dir).join(".env");
    let _ = dotenvy::from_path(manifest_path);
}
