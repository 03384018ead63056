use clap::Parser;
use financial_document_analyzer::{analysis::DEFAULT_QUERY, config::AppConfig, FinancialAnalyzer};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Analyze a local financial PDF from the command line
#[derive(Parser, Debug)]
#[command(name = "analyzer", version, about)]
struct Cli {
    /// Path to the PDF document
    document: String,

    /// Question to answer about the document
    #[arg(short, long, default_value = DEFAULT_QUERY)]
    query: String,

    /// Print every stage's output, not just the final one
    #[arg(long)]
    trace: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    info!(
        provider = ?config.llm.provider,
        model = %config.llm.model,
        "Financial Document Analyzer starting"
    );

    let analyzer = FinancialAnalyzer::from_config(&config)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling analysis");
            on_signal.cancel();
        }
    });

    match analyzer.run_analysis_report(&cli.document, &cli.query, &cancel).await {
        Ok(report) => {
            if cli.trace {
                println!("\n=== STAGE TRACE ===");
                for (i, entry) in report.context.entries().iter().enumerate() {
                    println!(
                        "\n[{}] {} ({}) iterations={}{}",
                        i + 1,
                        entry.task,
                        entry.role,
                        entry.iterations,
                        if entry.forced_finish { " forced" } else { "" }
                    );
                    println!("{}", entry.output);
                }
            }

            println!("\n=== ANALYSIS RESULT ===");
            println!("Run ID: {}", report.run_id);
            println!("Elapsed: {} ms", report.execution_time_ms);
            println!("\n{}", report.final_output);
            Ok(())
        }
        Err(e) => {
            eprintln!("Analysis failed: {}", e);
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}
