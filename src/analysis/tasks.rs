//! The four analysis stages, in pipeline order

use super::roles::AnalysisRoles;
use crate::models::Task;

pub const VERIFICATION: &str = "verification";
pub const FINANCIAL_ANALYSIS: &str = "financial_analysis";
pub const INVESTMENT_ANALYSIS: &str = "investment_analysis";
pub const RISK_ASSESSMENT: &str = "risk_assessment";

pub fn create_tasks(roles: &AnalysisRoles) -> Vec<Task> {
    vec![
        Task {
            name: VERIFICATION.to_string(),
            description_template: "Read the PDF financial document located at this exact path: {file_path}
Use the Financial Document Reader tool with path='{file_path}'.
Verify it is a legitimate financial report by looking for income statements,
balance sheets, cash flow data, or earnings figures."
                .to_string(),
            expected_output: "A clear verdict: either 'This is a valid financial document' with a brief summary of what financial data it contains, or 'This is NOT a financial document' with an explanation."
                .to_string(),
            role: roles.verifier.clone(),
        },
        Task {
            name: FINANCIAL_ANALYSIS.to_string(),
            description_template: "Read the PDF financial document at this exact path: {file_path}
Use the Financial Document Reader tool with path='{file_path}'.
Answer the user's query: {query}
Extract and explain key financial metrics: revenue, net income, EPS, margins, cash flow.
Be specific and cite figures from the document."
                .to_string(),
            expected_output: "A structured financial analysis with key metrics clearly listed, directly addressing the user's query. All figures must come from the document."
                .to_string(),
            role: roles.financial_analyst.clone(),
        },
        Task {
            name: INVESTMENT_ANALYSIS.to_string(),
            description_template: "Based on the financial analysis from the previous task, provide investment insights.
The document is at: {file_path}
User query: {query}
Highlight financial strengths, weaknesses, and trends visible in the data.
Do not make specific buy/sell recommendations."
                .to_string(),
            expected_output: "A clear investment insight report with 3-5 key observations grounded in the document's financial data."
                .to_string(),
            role: roles.investment_advisor.clone(),
        },
        Task {
            name: RISK_ASSESSMENT.to_string(),
            description_template: "Based on the financial analysis from the previous tasks, identify key financial risks.
The document is at: {file_path}
Check debt-to-equity ratio, cash burn rate, revenue concentration, and any stated risk factors.
Reference actual numbers from the document where possible."
                .to_string(),
            expected_output: "A structured risk assessment with 3-5 specific risks, each backed by figures or disclosures from the document."
                .to_string(),
            role: roles.risk_assessor.clone(),
        },
    ]
}
