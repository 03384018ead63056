//! The four financial personas

use crate::llm::LlmClient;
use crate::models::{Role, RoleLimits};
use crate::tools::{PageSource, ReadDocumentTool, SummaryTool, Tool, ToolRegistry};
use std::sync::Arc;

pub const VERIFIER: &str = "Financial Document Verifier";
pub const FINANCIAL_ANALYST: &str = "Senior Financial Analyst";
pub const INVESTMENT_ADVISOR: &str = "Investment Advisor";
pub const RISK_ASSESSOR: &str = "Financial Risk Analyst";

const CALLS_PER_MINUTE: u32 = 1;
const MAX_PARSE_FAILURES: u32 = 2;

#[derive(Debug, Clone)]
pub struct AnalysisRoles {
    pub verifier: Arc<Role>,
    pub financial_analyst: Arc<Role>,
    pub investment_advisor: Arc<Role>,
    pub risk_assessor: Arc<Role>,
}

/// Build every role against one shared LLM client
pub fn create_roles(
    llm: Arc<dyn LlmClient>,
    page_source: Arc<dyn PageSource>,
    max_rpm_override: Option<u32>,
) -> AnalysisRoles {
    let reader: Arc<dyn Tool> = Arc::new(ReadDocumentTool::new(page_source));
    let investment: Arc<dyn Tool> = Arc::new(SummaryTool::investment());
    let risk: Arc<dyn Tool> = Arc::new(SummaryTool::risk());
    let calls_per_minute = max_rpm_override.unwrap_or(CALLS_PER_MINUTE);

    let role = |name: &str, goal: &str, backstory: &str, tool: Arc<dyn Tool>, max_iterations: u32| {
        Arc::new(Role {
            name: name.to_string(),
            goal_template: goal.to_string(),
            backstory: backstory.to_string(),
            tools: ToolRegistry::new().with(tool),
            llm: llm.clone(),
            limits: RoleLimits {
                max_iterations,
                max_calls_per_minute: calls_per_minute,
                max_parse_failures: MAX_PARSE_FAILURES,
            },
            allow_delegation: false,
        })
    };

    AnalysisRoles {
        verifier: role(
            VERIFIER,
            "Check whether the uploaded document is a legitimate financial report. Look for balance sheets, income statements, or earnings data.",
            "You spent 10 years in financial compliance reviewing thousands of documents.",
            reader.clone(),
            2,
        ),
        financial_analyst: role(
            FINANCIAL_ANALYST,
            "Read the financial document and answer the user's query: {query}. Extract key metrics like revenue, net income, EPS, margins, and cash flow.",
            "You have 15 years of experience analyzing corporate financial reports. You only work with facts from the document.",
            reader,
            3,
        ),
        investment_advisor: role(
            INVESTMENT_ADVISOR,
            "Based on the financial analysis, provide clear investment insights for the query: {query}. Highlight strengths, weaknesses, and trends.",
            "You have worked as a buy-side analyst for over a decade. You translate financial data into plain language.",
            investment,
            3,
        ),
        risk_assessor: role(
            RISK_ASSESSOR,
            "Identify key risk factors in the financial document. Look at debt levels, cash burn, revenue concentration, and risk disclosures.",
            "You come from a risk management background at a commercial bank. You are systematic and thorough.",
            risk,
            3,
        ),
    }
}
