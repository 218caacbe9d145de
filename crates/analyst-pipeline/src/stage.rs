//! Analysis stages and run lifecycle

use crate::Language;
use serde::Serialize;
use std::fmt;

/// One LLM generation step of an analysis
///
/// Stages are totally ordered and run strictly one after another, in the
/// order of [`Stage::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Neutral overview of the fundamentals
    Comprehensive,
    /// Bullish case built on the overview
    DebateBull,
    /// Bearish case built on the overview
    DebateBear,
    /// Concrete trading plan
    Trader,
    /// Risk officer's final decision
    Final,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Stage; 5] = [
        Stage::Comprehensive,
        Stage::DebateBull,
        Stage::DebateBear,
        Stage::Trader,
        Stage::Final,
    ];

    /// Wire identifier, used as the `step` field of events
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Comprehensive => "comprehensive",
            Stage::DebateBull => "debate_bull",
            Stage::DebateBear => "debate_bear",
            Stage::Trader => "trader",
            Stage::Final => "final",
        }
    }

    /// Position in [`Stage::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Human-readable role label
    pub fn label(&self, lang: Language) -> &'static str {
        match (self, lang) {
            (Stage::Comprehensive, Language::Chinese) => "综合分析",
            (Stage::DebateBull, Language::Chinese) => "多头观点",
            (Stage::DebateBear, Language::Chinese) => "空头观点",
            (Stage::Trader, Language::Chinese) => "交易员决策",
            (Stage::Final, Language::Chinese) => "最终决策",
            (Stage::Comprehensive, Language::English) => "Comprehensive Analysis",
            (Stage::DebateBull, Language::English) => "Bull Case",
            (Stage::DebateBear, Language::English) => "Bear Case",
            (Stage::Trader, Language::English) => "Trader Decision",
            (Stage::Final, Language::English) => "Final Decision",
        }
    }

    /// Fixed progress percentage reported while this stage streams
    pub fn progress(&self) -> u8 {
        match self {
            Stage::Comprehensive => 20,
            Stage::DebateBull => 40,
            Stage::DebateBear => 60,
            Stage::Trader => 80,
            Stage::Final => 100,
        }
    }

    /// Stages whose output must exist before this stage's prompt is built
    pub fn dependencies(&self) -> &'static [Stage] {
        match self {
            Stage::Comprehensive => &[],
            Stage::DebateBull | Stage::DebateBear => &[Stage::Comprehensive],
            Stage::Trader => &[Stage::Comprehensive, Stage::DebateBull, Stage::DebateBear],
            Stage::Final => &[
                Stage::Comprehensive,
                Stage::DebateBull,
                Stage::DebateBear,
                Stage::Trader,
            ],
        }
    }

    /// Key under which the stage's text is exposed to prompts and results
    pub fn result_key(&self) -> &'static str {
        match self {
            Stage::Comprehensive => "comprehensive_analysis",
            Stage::DebateBull => "bull_case",
            Stage::DebateBear => "bear_case",
            Stage::Trader => "trader_decision",
            Stage::Final => "final_decision",
        }
    }

    /// The stage after this one, if any
    pub fn next(&self) -> Option<Stage> {
        Stage::ALL.get(self.index() + 1).copied()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of one analysis run
///
/// `NotStarted → Fetching → Running(comprehensive) → … → Running(final) → Done`,
/// with `Failed` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    NotStarted,
    Fetching,
    Running(Stage),
    Done,
    Failed,
}

impl RunState {
    /// Successor on the success path; terminal states stay put
    pub fn advance(self) -> RunState {
        match self {
            RunState::NotStarted => RunState::Fetching,
            RunState::Fetching => RunState::Running(Stage::Comprehensive),
            RunState::Running(stage) => stage.next().map_or(RunState::Done, RunState::Running),
            RunState::Done => RunState::Done,
            RunState::Failed => RunState::Failed,
        }
    }

    /// Whether the run has stopped
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::NotStarted => f.write_str("not_started"),
            RunState::Fetching => f.write_str("fetching"),
            RunState::Running(stage) => write!(f, "running:{stage}"),
            RunState::Done => f.write_str("done"),
            RunState::Failed => f.write_str("failed"),
        }
    }
}
