use financial_document_analyzer::{api::start_server, config::AppConfig, FinancialAnalyzer};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    info!("Financial Document Analyzer - API Server");
    info!("Port: {}", config.port);
    info!("Model: {} ({:?})", config.llm.model, config.llm.provider);
    info!("Data dir: {}", config.data_dir.display());

    let analyzer = Arc::new(FinancialAnalyzer::from_config(&config)?);

    info!("Analyzer initialized");

    start_server(analyzer, config.port, config.data_dir.clone()).await?;

    Ok(())
}
