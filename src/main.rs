//! Keyword Miner - autosuggest keyword expansion and opportunity scoring
//!
//! Command line front end over [`KeywordService`].

use std::env;
use std::io::IsTerminal;
use std::process;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::MultiSelect;
use keyword_miner::{
    analysis::VariantTypeInfo,
    insights::Tier,
    scoring::summarize,
    KeywordMinerError, KeywordService, OpportunityMetrics, Settings, VariantType,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize the library
    if let Err(e) = keyword_miner::init() {
        eprintln!("❌ Failed to initialize: {}", e);
        process::exit(1);
    }
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();

    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        print_help();
        return Ok(());
    }

    if let Err(e) = run_command(args).await {
        match e.downcast_ref::<KeywordMinerError>() {
            Some(err) => eprintln!("{}", err.user_message()),
            None => eprintln!("❌ Error: {:#}", e),
        }
        process::exit(1);
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("keyword_miner=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Remove `--name value` from `args` and return the value
fn take_option(args: &mut Vec<String>, name: &str) -> anyhow::Result<Option<String>> {
    match args.iter().position(|a| a == name) {
        Some(i) => {
            if i + 1 >= args.len() {
                return Err(KeywordMinerError::cli(format!("{} needs a value", name)).into());
            }
            let value = args.remove(i + 1);
            args.remove(i);
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

fn take_limit(args: &mut Vec<String>, default: usize) -> anyhow::Result<usize> {
    match take_option(args, "--limit")? {
        Some(raw) => raw
            .parse()
            .map_err(|_| KeywordMinerError::cli(format!("Invalid --limit: {}", raw)).into()),
        None => Ok(default),
    }
}

fn require_arg(args: &[String], what: &str) -> anyhow::Result<String> {
    let value = args.join(" ");
    if value.trim().is_empty() {
        return Err(KeywordMinerError::cli(format!("Missing {}", what)).into());
    }
    Ok(value)
}

async fn run_command(mut args: Vec<String>) -> anyhow::Result<()> {
    let command = args.remove(0);

    if command == "types" {
        let settings = Settings::default();
        let service = KeywordService::from_settings(settings)?;
        print_types(&service.variant_types());
        return Ok(());
    }

    let settings = Settings::from_env()?;
    let service = KeywordService::from_settings(settings)?;

    match command.as_str() {
        "analyze" => {
            let types = take_option(&mut args, "--types")?;
            let keyword = require_arg(&args, "keyword")?;
            run_analyze(&service, &keyword, types).await
        }
        "score" => {
            let keyword = require_arg(&args, "keyword")?;
            let metrics = service.score_keyword(&keyword).await;
            println!("📊 Opportunity report for \"{}\"", keyword.trim());
            println!("═══════════════════════════════════");
            print_metrics(&metrics);
            Ok(())
        }
        "blue-ocean" => {
            let default_limit = service.settings().scoring.blue_ocean_limit;
            let limit = take_limit(&mut args, default_limit)?;
            let keyword = require_arg(&args, "keyword")?;
            run_blue_ocean(&service, &keyword, limit).await
        }
        "insights" => {
            let session_id = require_arg(&args, "session id")?;
            run_insights(&service, session_id.trim()).await
        }
        "results" => {
            let session_id = require_arg(&args, "session id")?;
            let results = service.get_results(session_id.trim()).await?;
            let json = serde_json::to_string_pretty(&results).context("Failed to serialize results")?;
            println!("{}", json);
            Ok(())
        }
        "history" => {
            let limit = take_limit(&mut args, 20)?;
            run_history(&service, limit).await
        }
        other => Err(KeywordMinerError::cli(format!("Unknown command: {}", other)).into()),
    }
}

struct TypeChoice(VariantTypeInfo);

impl std::fmt::Display for TypeChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:<15} {} ({})", self.0.variant_type.tag(), self.0.label, self.0.count)
    }
}

/// Variant types from `--types`, an interactive prompt, or all of them
fn select_types(service: &KeywordService, raw: Option<String>) -> anyhow::Result<Vec<VariantType>> {
    if let Some(raw) = raw {
        let tags: Vec<&str> = raw.split(',').map(str::trim).filter(|t| !t.is_empty()).collect();
        return Ok(KeywordService::parse_types(&tags)?);
    }

    if !std::io::stdin().is_terminal() {
        return Ok(VariantType::all().to_vec());
    }

    let choices: Vec<TypeChoice> = service.variant_types().into_iter().map(TypeChoice).collect();
    let defaults: Vec<usize> = (0..choices.len()).collect();
    let selected = MultiSelect::new("Select variant types to expand:", choices)
        .with_default(&defaults)
        .prompt()
        .map_err(|e| KeywordMinerError::cli(format!("Selection cancelled: {}", e)))?;

    Ok(selected.into_iter().map(|c| c.0.variant_type).collect())
}

async fn run_analyze(service: &KeywordService, keyword: &str, raw_types: Option<String>) -> anyhow::Result<()> {
    let types = select_types(service, raw_types)?;

    println!("⛏️  Keyword Miner - expanding \"{}\"", keyword.trim());
    println!("═══════════════════════════════════");
    println!();

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} variants ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let progress = bar.clone();
    let run = service
        .analyze(keyword, &types, move |processed, total| {
            progress.set_length(total as u64);
            progress.set_position(processed as u64);
        })
        .await;
    bar.finish_and_clear();
    let run = run?;

    let summary = run.summary;
    println!("✅ Analysis completed");
    println!("   🆔 Session: {}", run.session_id);
    println!("   🔤 Variants: {} ({} answered, {} empty)", summary.total_variants, summary.successful_variants, summary.failed_variants);
    println!("   💬 Suggestions: {}", summary.total_suggestions);
    println!("   ✨ Unique: {} ({} duplicates removed)", summary.unique_suggestions, summary.duplicate_removed);
    println!();

    let (unique, _) = keyword_miner::analysis::dedupe_global(&run.flattened());
    let overview = summarize(&unique);
    if !overview.top_opportunities.is_empty() {
        println!("🏆 Top opportunities (estimated):");
        for (i, item) in overview.top_opportunities.iter().enumerate() {
            println!(
                "   {}. {:<24} opportunity {:>5.1}  commercial {:>5.1}  {}",
                i + 1,
                item.keyword,
                item.metrics.opportunity_score,
                item.metrics.commercial_score,
                item.metrics.intent
            );
        }
        println!("   📈 Average commercial score: {:.1}", overview.average_commercial_score);
        println!();
    }

    println!("💡 Next: keyword-miner insights {}", run.session_id);
    Ok(())
}

async fn run_blue_ocean(service: &KeywordService, keyword: &str, limit: usize) -> anyhow::Result<()> {
    if !service.scorer().has_market_data() {
        println!("⚠️  Blue-ocean search needs market data. Set MARKET_API_KEY to enable it.");
        return Ok(());
    }

    let found = service.find_blue_ocean(keyword, limit).await;
    if found.is_empty() {
        println!("😔 No blue-ocean keywords found for \"{}\"", keyword.trim());
        return Ok(());
    }

    println!("🌊 Blue-ocean keywords ({}):", found.len());
    println!("─────────────────────────");
    for (i, item) in found.iter().enumerate() {
        println!(
            "{:2}. {:<24} opportunity {:>5.1}  bidders {:>3}  long-tail {:>6}",
            i + 1,
            item.keyword,
            item.opportunity_score,
            item.record.bid_company_count,
            item.record.long_tail_count
        );
    }
    Ok(())
}

async fn run_insights(service: &KeywordService, session_id: &str) -> anyhow::Result<()> {
    let insights = service.get_insights(session_id).await;
    let stats = &insights.summary_stats;

    println!("🔍 Insights for session {}", session_id);
    println!("═══════════════════════════════════");
    println!("   📊 Keywords ranked: {}", stats.total_opportunities);
    for tier in Tier::all() {
        let keywords = insights.tier(*tier);
        if !keywords.is_empty() {
            println!("   • {:<11} {}", tier.label(), keywords.len());
        }
    }
    if stats.total_opportunities > 0 {
        println!("   📈 Average commercial score: {:.1}", stats.average_commercial_score);
        println!("   🔁 Cross-variant duplicates: {}", stats.cross_variant_duplicates);
    }
    println!();

    if !insights.recommendations.is_empty() {
        println!("🏆 Recommendations:");
        for (i, item) in insights.recommendations.iter().enumerate() {
            println!(
                "{:2}. {:<24} [{}] composite {:>6.1}  volume {:>6}",
                i + 1,
                item.keyword,
                item.tier,
                item.composite_score,
                item.metrics.search_volume
            );
        }
        println!();
    }

    for message in &insights.messages {
        println!("💡 {}", message);
    }
    Ok(())
}

async fn run_history(service: &KeywordService, limit: usize) -> anyhow::Result<()> {
    let runs = service.history(limit).await?;
    if runs.is_empty() {
        println!("📭 No analysis runs yet");
        return Ok(());
    }

    println!("🕘 Recent runs:");
    for run in runs {
        let types: Vec<&str> = run.variant_types.iter().map(|t| t.tag()).collect();
        println!(
            "   {}  {:<10} {:<16} {:>5} suggestions  {}  [{}]",
            run.created_at.format("%Y-%m-%d %H:%M"),
            run.status.to_string(),
            run.original_keyword,
            run.total_suggestions,
            run.session_id,
            types.join(",")
        );
    }
    Ok(())
}

fn print_metrics(metrics: &OpportunityMetrics) {
    println!("   💰 Commercial score: {:.1}", metrics.commercial_score);
    println!("   🎯 Intent: {}", metrics.intent);
    println!("   ⚔️  Competition: {}", metrics.competition);
    println!("   🔎 Search volume: {}", metrics.search_volume);
    println!("   🧗 Difficulty: {:.1}", metrics.difficulty_score);
    println!("   🚀 Opportunity: {:.1}", metrics.opportunity_score);
    if metrics.blue_ocean {
        println!("   🌊 Blue-ocean keyword");
    }
    println!(
        "   📡 Source: {}",
        if metrics.real_data { "market data" } else { "estimate" }
    );
}

fn print_types(types: &[VariantTypeInfo]) {
    println!("🔤 Variant types:");
    for info in types {
        println!("   {:<15} {:<40} {:>3} queries", info.variant_type.tag(), info.label, info.count);
    }
}

/// Print help information
fn print_help() {
    println!("⛏️  Keyword Miner - autosuggest keyword expansion and opportunity scoring");
    println!("═══════════════════════════════════════════════════");
    println!();
    println!("USAGE:");
    println!("    keyword-miner <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    analyze <keyword> [--types a,b]   Expand and fetch suggestions");
    println!("    score <keyword>                   Score a single keyword");
    println!("    blue-ocean <keyword> [--limit N]  Find low-competition keywords (needs market data)");
    println!("    insights <session>                Ranked opportunities of a finished run");
    println!("    results <session>                 Stored suggestions of a run as JSON");
    println!("    history [--limit N]               Recent runs");
    println!("    types                             List variant types");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("    SUGGEST_URL             Autosuggest endpoint");
    println!("    REQUEST_TIMEOUT_SECS    Per request timeout (default: 10)");
    println!("    REQUEST_DELAY_MIN_SECS  Minimum retry delay (default: 1)");
    println!("    REQUEST_DELAY_MAX_SECS  Maximum retry delay (default: 3)");
    println!("    MAX_RETRIES             Attempts per query (default: 3)");
    println!("    FETCH_CONCURRENCY       Queries in flight (default: 2)");
    println!("    CHECKPOINT_INTERVAL     Variants per store commit (default: 10)");
    println!("    STORE_PATH              Suggestion log (default: output/keywords.jsonl)");
    println!("    MARKET_API_KEY          Market data API key (enables real metrics)");
    println!("    MARKET_BASE_URL         Market data endpoint");
    println!("    USE_MARKET_DATA         Toggle market data (default: true)");
    println!("    SESSION_TTL_SECS        Progress retention for finished runs (default: 3600)");
    println!("    RUST_LOG                Log filter (default: keyword_miner=info)");
    println!();
    println!("EXAMPLES:");
    println!("    keyword-miner analyze 减肥 --types alpha,numeric");
    println!("    keyword-miner score 减肥药哪个牌子好多少钱");
    println!("    keyword-miner blue-ocean 护眼台灯 --limit 10");
}
