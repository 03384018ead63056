//! Financial document analysis
//!
//! Wires the four financial roles and tasks into a [`TaskPipeline`] and
//! exposes the single inbound operation used by the CLI and HTTP service.

pub mod roles;
pub mod tasks;

pub use roles::{create_roles, AnalysisRoles};
pub use tasks::create_tasks;

use crate::config::AppConfig;
use crate::llm::{build_client, LlmClient};
use crate::models::{PipelineReport, RunInputs};
use crate::pipeline::TaskPipeline;
use crate::tools::{PageSource, PdfPageSource};
use crate::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub const DEFAULT_QUERY: &str = "Analyze this financial document for investment insights";

pub struct FinancialAnalyzer {
    llm: Arc<dyn LlmClient>,
    page_source: Arc<dyn PageSource>,
    max_rpm_override: Option<u32>,
}

impl FinancialAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>, page_source: Arc<dyn PageSource>) -> Self {
        Self {
            llm,
            page_source,
            max_rpm_override: None,
        }
    }

    pub fn with_max_rpm(mut self, max_rpm: Option<u32>) -> Self {
        self.max_rpm_override = max_rpm;
        self
    }

    /// Provider client from configuration, PDFs read from disk
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let llm = build_client(&config.llm)?;
        Ok(Self::new(llm, Arc::new(PdfPageSource)).with_max_rpm(config.max_rpm_override))
    }

    /// Fresh pipeline per run; roles carry no state between runs
    pub fn pipeline(&self) -> Result<TaskPipeline> {
        let roles = create_roles(self.llm.clone(), self.page_source.clone(), self.max_rpm_override);
        TaskPipeline::new(create_tasks(&roles))
    }

    /// Run all four stages and return the risk assessment text
    pub async fn run_analysis(
        &self,
        document_path: &str,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let report = self.run_analysis_report(document_path, query, cancel).await?;
        Ok(report.final_output)
    }

    pub async fn run_analysis_report(
        &self,
        document_path: &str,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<PipelineReport> {
        let inputs = RunInputs {
            document_path: document_path.to_string(),
            query: effective_query(query),
        };

        info!(
            document = %inputs.document_path,
            query = %inputs.query,
            model = self.llm.model(),
            "Starting document analysis"
        );

        self.pipeline()?.run(&inputs, cancel).await
    }
}

/// Blank queries fall back to the default
pub fn effective_query(query: &str) -> String {
    let query = query.trim();
    if query.is_empty() {
        DEFAULT_QUERY.to_string()
    } else {
        query.to_string()
    }
}
