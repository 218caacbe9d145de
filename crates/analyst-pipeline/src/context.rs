//! Per-run analysis context
//!
//! The context starts as a projection of the financial-data document and
//! grows by one stage output at a time. Outputs are append-only: recording a
//! stage twice is an error, and nothing is ever removed.

use crate::{AnalysisRequest, FinancialReport, PipelineError, Result, Stage};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisContext {
    pub code: String,
    pub name: String,
    pub industry: String,
    pub market_cap: f64,
    pub pe_ttm: f64,
    pub pb: f64,
    pub latest_price: f64,
    pub roe: f64,
    pub debt_ratio: f64,
    pub revenue_growth: f64,
    pub profit_growth: f64,
    pub risks: Vec<String>,
    #[serde(skip)]
    outputs: [Option<String>; Stage::ALL.len()],
}

impl AnalysisContext {
    /// Build the initial context for a run
    ///
    /// The display name falls back from the document to the request and
    /// finally to the code itself.
    pub fn from_report(request: &AnalysisRequest, report: &FinancialReport) -> Self {
        let code = if report.code.trim().is_empty() {
            request.code.clone()
        } else {
            report.code.trim().to_string()
        };

        let name = [Some(report.name.as_str()), request.name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|n| !n.is_empty())
            .map_or_else(|| code.clone(), str::to_string);

        Self {
            code,
            name,
            industry: report.basic_info.industry.clone(),
            market_cap: report.basic_info.market_cap,
            pe_ttm: report.basic_info.pe_ttm,
            pb: report.basic_info.pb,
            latest_price: report.price.latest_price,
            roe: report.financial_metrics.roe,
            debt_ratio: report.financial_metrics.debt_ratio,
            revenue_growth: report.financial_metrics.revenue_growth,
            profit_growth: report.financial_metrics.profit_growth,
            risks: report.risks.clone(),
            outputs: Default::default(),
        }
    }

    /// Record the complete text of `stage`
    pub fn with_output(mut self, stage: Stage, text: impl Into<String>) -> Result<Self> {
        let slot = &mut self.outputs[stage.index()];
        if slot.is_some() {
            return Err(PipelineError::DuplicateOutput(stage));
        }
        *slot = Some(text.into());
        Ok(self)
    }

    /// Text of `stage`, if it has completed
    pub fn output(&self, stage: Stage) -> Option<&str> {
        self.outputs[stage.index()].as_deref()
    }

    /// Text of `missing`, which `stage` depends on
    pub fn require(&self, stage: Stage, missing: Stage) -> Result<&str> {
        self.output(missing)
            .ok_or(PipelineError::MissingDependency { stage, missing })
    }

    /// Completed stages with their text, in execution order
    pub fn completed(&self) -> impl Iterator<Item = (Stage, &str)> + '_ {
        Stage::ALL
            .into_iter()
            .filter_map(|stage| self.output(stage).map(|text| (stage, text)))
    }

    /// Aggregate result of a finished run
    pub fn into_outcome(self) -> Result<AnalysisOutcome> {
        let [comprehensive, bull, bear, trader, final_decision] = self.outputs;
        let take = |slot: Option<String>, missing: Stage| {
            slot.ok_or(PipelineError::MissingDependency {
                stage: Stage::Final,
                missing,
            })
        };

        Ok(AnalysisOutcome {
            comprehensive_analysis: take(comprehensive, Stage::Comprehensive)?,
            bull_case: take(bull, Stage::DebateBull)?,
            bear_case: take(bear, Stage::DebateBear)?,
            trader_decision: take(trader, Stage::Trader)?,
            final_decision: take(final_decision, Stage::Final)?,
            code: self.code,
            name: self.name,
        })
    }
}

/// Every stage's text from a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisOutcome {
    pub code: String,
    pub name: String,
    pub comprehensive_analysis: String,
    pub bull_case: String,
    pub bear_case: String,
    pub trader_decision: String,
    pub final_decision: String,
}

impl AnalysisOutcome {
    /// Text of one stage
    pub fn text(&self, stage: Stage) -> &str {
        match stage {
            Stage::Comprehensive => &self.comprehensive_analysis,
            Stage::DebateBull => &self.bull_case,
            Stage::DebateBear => &self.bear_case,
            Stage::Trader => &self.trader_decision,
            Stage::Final => &self.final_decision,
        }
    }
}
