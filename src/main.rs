use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use wo_audit::config::{load_config, EngineConfig};
use wo_audit::filter::OrderFilter;
use wo_audit::loader::{load_orders, LoadReport};
use wo_audit::methods::Thresholds;
use wo_audit::output;
use wo_audit::reports::{self, RunSummary};
use wo_audit::util::{format_int, format_number};
use wo_audit::{Dataset, RiskEngine, ScoringRun};

const EXIT_INPUT: i32 = 2;
const EXIT_OUTPUT: i32 = 3;
const EXIT_CONFIG: i32 = 4;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score a work-order export and write the reports
    Score {
        /// CSV export (legacy or status-history layout)
        file: PathBuf,

        /// Threshold override as method=value, repeatable
        #[arg(short, long = "threshold", value_name = "METHOD=VALUE")]
        thresholds: Vec<String>,

        /// Rows in the top-priority table
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Directory for the CSV and JSON outputs
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Print the method catalog with effective weights and thresholds
    Methods,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Keep only these work types
    #[arg(long = "work-type")]
    work_types: Vec<String>,

    /// Keep only these planner groups
    #[arg(long = "planner-group")]
    planner_groups: Vec<String>,

    /// Keep only these statuses
    #[arg(long = "status")]
    statuses: Vec<String>,

    /// Keep only these workplaces
    #[arg(long = "workplace")]
    workplaces: Vec<String>,

    /// Keep only these ABC indicators
    #[arg(long)]
    abc: Vec<String>,

    /// Earliest planned start (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Latest planned start (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Substring search over id, description, location and equipment
    #[arg(long)]
    search: Option<String>,
}

impl From<FilterArgs> for OrderFilter {
    fn from(a: FilterArgs) -> Self {
        OrderFilter {
            work_types: a.work_types,
            planner_groups: a.planner_groups,
            statuses: a.statuses,
            workplaces: a.workplaces,
            abc: a.abc,
            date_from: a.from,
            date_to: a.to,
            search: a.search,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "wo-audit")]
#[command(about = "Risk scoring for maintenance work orders", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a TOML engine config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

fn parse_thresholds(args: &[String], engine: &RiskEngine) -> Result<Thresholds> {
    let mut thresholds = Thresholds::new();
    for arg in args {
        let (method, value) = Thresholds::parse_override(arg)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("invalid --threshold '{}'", arg))?;
        let def = engine.catalog().get(method);
        if !def.adjustable {
            bail!("method '{}' has no adjustable threshold", method);
        }
        if value <= 0.0 {
            bail!("threshold for '{}' must be positive, got {}", method, value);
        }
        let (lo, hi) = def.threshold_range;
        if value < lo || value > hi {
            warn!(method = method.id(), value, lo, hi, "threshold outside the usual range");
        }
        thresholds.set(method, value);
    }
    Ok(thresholds)
}

fn print_methods(engine: &RiskEngine) {
    println!("Risk methods\n");
    for def in engine.catalog().iter() {
        let threshold = if def.adjustable {
            format!(
                "{} {} (range {}-{})",
                format_number(def.default_threshold, 2),
                def.unit,
                def.threshold_range.0,
                def.threshold_range.1
            )
        } else {
            "fixed".to_string()
        };
        println!("{} {} [{}]", def.icon, def.title, def.method);
        println!("    {}", def.description);
        println!("    threshold: {}, weight: {}\n", threshold, format_number(def.weight, 2));
    }
}

fn write_outputs(
    out_dir: &Path,
    engine: &RiskEngine,
    data: &Dataset,
    run: &ScoringRun,
    top: usize,
) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("cannot create output directory {}", out_dir.display()))?;

    let scored = reports::scored_rows(run, data);
    let scored_path = out_dir.join("scored_orders.csv");
    output::write_csv(&scored_path, &scored)
        .with_context(|| format!("writing {}", scored_path.display()))?;

    let methods = reports::method_summary(run, data, engine.catalog());
    let methods_path = out_dir.join("method_summary.csv");
    output::write_csv(&methods_path, &methods)
        .with_context(|| format!("writing {}", methods_path.display()))?;

    let categories = reports::category_counts(run);
    let agg = engine.aggregates(data);
    let summary = RunSummary {
        kpi: reports::kpi_summary(run),
        methods: methods.clone(),
        categories: categories.clone(),
        quality: reports::quality_report(data),
        equipment: reports::equipment_report(data, &agg, engine.classifier(), top),
    };
    let summary_path = out_dir.join("summary.json");
    output::write_json(&summary_path, &summary)
        .with_context(|| format!("writing {}", summary_path.display()))?;

    let kpi = &summary.kpi;
    println!(
        "Orders: {}  at risk: {} ({}%)  priority sum: {}  avg: {}\n",
        format_int(kpi.total_orders as u64),
        format_int(kpi.risk_orders as u64),
        format_number(kpi.risk_pct, 2),
        format_number(kpi.priority_sum, 2),
        format_number(kpi.priority_avg, 2)
    );

    output::preview_table("Risk methods", None, &methods, methods.len());
    output::preview_table("Risk categories", None, &categories, categories.len());
    let top_rows = reports::top_priority(run, data, top);
    output::preview_table(
        "Top orders by priority",
        Some(&format!("top {}", top)),
        &top_rows,
        top,
    );

    let quality = &summary.quality;
    output::preview_table(
        "Data quality",
        Some(&format!(
            "fill rate {}%, {} of {} fields over {}% empty",
            format_number(quality.fill_rate, 1),
            quality.problem_fields,
            quality.total_fields,
            reports::PROBLEM_EMPTY_PCT
        )),
        &quality.fields,
        quality.fields.len(),
    );

    let equipment = &summary.equipment;
    if !equipment.top.is_empty() {
        output::preview_table(
            "Orders by equipment",
            Some(&format!(
                "{} units, {} orders without equipment",
                format_int(equipment.distinct_equipment as u64),
                format_int(equipment.orders_without_equipment as u64)
            )),
            &equipment.top,
            5,
        );
    }

    for (title, counts) in [
        ("Orders by planner group", &agg.count_by_planner_group),
        ("Orders by author", &agg.count_by_author),
        ("Orders by workplace", &agg.count_by_workplace),
    ] {
        if !counts.is_empty() {
            output::preview_table(title, None, &reports::group_counts(counts, 5), 5);
        }
    }

    println!("(Full tables exported to {})", out_dir.display());
    Ok(())
}

fn log_load(report: &LoadReport) {
    info!(
        rows = report.total_rows,
        orders = report.loaded_orders,
        "loaded {} orders from {} rows",
        format_int(report.loaded_orders as u64),
        format_int(report.total_rows as u64)
    );
    if report.parse_errors > 0 || report.skipped_without_id > 0 {
        warn!(
            parse_errors = report.parse_errors,
            without_id = report.skipped_without_id,
            "rows skipped while loading"
        );
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config: EngineConfig = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };
    let engine = RiskEngine::new(&config);

    match cli.command {
        Commands::Methods => print_methods(&engine),
        Commands::Score {
            file,
            thresholds,
            top,
            out_dir,
            filter,
        } => {
            let thresholds = match parse_thresholds(&thresholds, &engine) {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("Config error: {:#}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            };

            let (data, load_report) = match load_orders(&file) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("Failed to load {}: {}", file.display(), e);
                    std::process::exit(EXIT_INPUT);
                }
            };
            log_load(&load_report);

            let filter = OrderFilter::from(filter);
            let view = if filter.is_empty() {
                data
            } else {
                let view = filter.apply(&data);
                info!(kept = view.len(), of = data.len(), "filter applied");
                view
            };

            let run = engine.score_view(&view, &thresholds);
            if let Err(e) = write_outputs(&out_dir, &engine, &view, &run, top) {
                eprintln!("Output error: {:#}", e);
                std::process::exit(EXIT_OUTPUT);
            }
        }
    }
}
