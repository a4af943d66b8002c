//! edaflow - automated exploratory data analysis
//!
//! Profiles a CSV dataset, retrieves matching EDA techniques from a local
//! knowledge base, renders charts and captions each one with an LLM.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (bad input, unreachable backend, failed step, ...)

use anyhow::{Context, Result};
use chrono::Utc;
use edaflow::cli::{Args, OutputFormat};
use edaflow::config::{Config, DEFAULT_CONFIG_FILE};
use edaflow::error::EdaError;
use edaflow::models::{Report, ReportMetadata};
use edaflow::workflow::WorkflowEngine;
use edaflow::{dataset, profiler, report};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config comes first so `general.verbose` can set the log level
    let (config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(config.log_level(args.quiet))?;

    info!("edaflow v{}", env!("CARGO_PKG_VERSION"));
    info!("{}", config_source);
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_analysis(args, config).await {
        error!("Analysis failed: {:#}", e);
        match e.downcast_ref::<EdaError>() {
            Some(eda) => eprintln!("\n❌ Error ({}): {}", eda.kind(), eda),
            None => eprintln!("\n❌ Error: {:#}", e),
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .edaflow.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to choose backends, models, the knowledge base and output paths.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` wins over the verbosity settings when set.
fn init_logging(level: Level) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Run the complete analysis and write the report.
async fn run_analysis(args: Args, config: Config) -> Result<()> {
    let start_time = Instant::now();

    let data = args
        .data
        .clone()
        .context("--data is required unless --init-config is given")?;

    if args.dry_run {
        return handle_dry_run(&data);
    }

    println!("🤖 Connecting to backends...");
    println!(
        "   Model: {}/{}",
        config.model.backend,
        config.model.effective_name()
    );
    if config.retrieval.enabled {
        println!(
            "   Embeddings: {} ({})",
            config.embedding.model, config.embedding.backend
        );
        println!("   Knowledge base: {}", config.retrieval.knowledge_base);
    } else {
        println!("   Retrieval: disabled");
    }

    let engine = WorkflowEngine::connect(&config)
        .await?
        .rebuild_index(args.rebuild_index)
        .show_progress(!args.quiet);

    println!("\n🔬 Analyzing {}...", data.display());
    let result = engine.run(&data, args.target.as_deref()).await?;

    println!("\n📝 Generating report...");
    let duration = start_time.elapsed().as_secs_f64();

    let metadata = ReportMetadata {
        dataset: data.display().to_string(),
        analysis_date: Utc::now(),
        model_used: engine.model_label(),
        embedding_model: engine.embedding_model().map(String::from),
        duration_seconds: duration,
    };
    let report = Report { metadata, result };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    let report_path = report_path(&config, &args);
    if let Some(parent) = report_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&report_path, &output)
        .with_context(|| format!("Failed to write report to {}", report_path.display()))?;

    let summary = &report.result.summary;
    println!("\n📊 Analysis Summary:");
    println!(
        "   Rows: {} | Columns: {} | Memory: {}",
        summary.row_count,
        summary.column_count,
        summary.memory_footprint()
    );
    println!("   Insights: {}", report.result.insights.len());
    println!(
        "   Visualizations: {} (in {})",
        report.result.visualizations.len(),
        engine.output_dir().display()
    );
    println!("   Duration: {:.1}s", duration);
    println!(
        "\n✅ Analysis complete! Report saved to: {}",
        report_path.display()
    );

    Ok(())
}

/// Where to write the report. JSON output gets a `.json` extension unless
/// `--output` names the file explicitly.
fn report_path(config: &Config, args: &Args) -> PathBuf {
    let path = PathBuf::from(&config.general.report);
    if args.format == OutputFormat::Json && args.output.is_none() {
        path.with_extension("json")
    } else {
        path
    }
}

/// Handle --dry-run: load and profile the dataset, print the result, exit.
fn handle_dry_run(data: &Path) -> Result<()> {
    println!("\n🔍 Dry run: profiling {} (no model calls)...\n", data.display());

    let dataset = dataset::load(data)?;
    let summary = dataset.summary();
    let profile = profiler::profile(&dataset);

    println!(
        "   Rows: {} | Columns: {} | Memory: {}",
        summary.row_count,
        summary.column_count,
        summary.memory_footprint()
    );
    println!("   📈 Numerical:   {}", join_or_none(&profile.numerical));
    println!("   🏷️  Categorical: {}", join_or_none(&profile.categorical));
    println!("   📅 Datetime:    {}", join_or_none(&profile.datetime));

    let heatmap = if profile.numerical.len() >= 2 { 1 } else { 0 };
    println!(
        "\n   A full run would render {} plots.",
        profile.numerical.len() + profile.categorical.len() + heatmap
    );

    println!("\n✅ Dry run complete. No model calls were made.");
    Ok(())
}

fn join_or_none(columns: &[String]) -> String {
    if columns.is_empty() {
        "(none)".to_string()
    } else {
        columns.join(", ")
    }
}

/// Load configuration from file or use defaults, then apply the flags.
/// Runs before logging is set up, so it returns a line describing where the
/// configuration came from.
fn load_config(args: &Args) -> Result<(Config, String)> {
    let (mut config, source) = if let Some(ref config_path) = args.config {
        // Explicit path must load
        (
            Config::load(config_path)?,
            format!("Loaded config from {}", config_path.display()),
        )
    } else {
        match Config::load_default() {
            Ok(Some(config)) => (
                config,
                format!("Loaded default config from {}", DEFAULT_CONFIG_FILE),
            ),
            Ok(None) => (
                Config::default(),
                "No config file found, using defaults".to_string(),
            ),
            Err(e) => {
                eprintln!("⚠️  Failed to load {}: {:#}", DEFAULT_CONFIG_FILE, e);
                (
                    Config::default(),
                    "Using default configuration".to_string(),
                )
            }
        }
    };

    config.merge_with_args(args);
    Ok((config, source))
}
