//! Financial Document Analyzer
//!
//! Runs an uploaded financial report through four LLM-driven stages:
//! - verification that the document is a financial report
//! - extraction of key financial metrics
//! - investment insights
//! - risk assessment
//!
//! Each stage is a bounded reasoning loop (iteration cap, per-role call
//! rate, parse-failure threshold) and sees the outputs of every stage
//! before it.
//!
//! PIPELINE:
//! VERIFY → ANALYZE → ADVISE → ASSESS RISK

pub mod agent;
pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use analysis::FinancialAnalyzer;
pub use error::AnalysisError;
pub use models::*;
