//! Summarizing tools for the investment and risk roles
//!
//! Both normalize whitespace and cap the text handed back to the model.

use super::{collapse_whitespace, extract_argument, truncate_chars, Tool};

pub const INVESTMENT_TOOL_NAME: &str = "Investment Analyzer";
pub const RISK_TOOL_NAME: &str = "Risk Assessment Tool";
pub const MAX_SUMMARY_CHARS: usize = 2000;

pub struct SummaryTool {
    tool_name: &'static str,
    tool_description: &'static str,
    header: &'static str,
    empty_input_error: &'static str,
}

impl SummaryTool {
    pub fn investment() -> Self {
        Self {
            tool_name: INVESTMENT_TOOL_NAME,
            tool_description: "Takes extracted financial document text and returns a structured \
                               summary of key investment indicators like revenue growth, margins, \
                               and EPS trends. Input: the financial text to analyze.",
            header: "Investment data received for analysis:",
            empty_input_error: "Error: No financial data provided to analyze.",
        }
    }

    pub fn risk() -> Self {
        Self {
            tool_name: RISK_TOOL_NAME,
            tool_description: "Takes extracted financial document text and identifies key risk \
                               factors like debt levels, cash burn, and market exposure mentioned \
                               in the document. Input: the financial text to assess.",
            header: "Risk assessment data received:",
            empty_input_error: "Error: No financial data provided for risk assessment.",
        }
    }

    pub fn summarize(&self, financial_data: &str) -> String {
        if financial_data.trim().is_empty() {
            return self.empty_input_error.to_string();
        }

        let cleaned = collapse_whitespace(financial_data);
        format!("{}\n{}", self.header, truncate_chars(&cleaned, MAX_SUMMARY_CHARS))
    }
}

#[async_trait::async_trait]
impl Tool for SummaryTool {
    fn name(&self) -> &str {
        self.tool_name
    }

    fn description(&self) -> &str {
        self.tool_description
    }

    async fn invoke(&self, input: &str) -> String {
        let financial_data = extract_argument(input, "financial_data");
        self.summarize(&financial_data)
    }
}
