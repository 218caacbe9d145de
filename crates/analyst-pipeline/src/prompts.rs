//! Stage prompt construction
//!
//! Pure functions from (stage, context, language) to a system prompt and a
//! user prompt. System prompts are fixed per stage. User prompts are MiniJinja
//! templates rendered in strict-undefined mode, after every dependency of the
//! stage has been checked against the context, so a missing input is reported
//! as [`PipelineError::MissingDependency`] and never rendered as a blank.

use crate::{AnalysisContext, Language, PipelineError, Result, Stage};
use minijinja::{Environment, UndefinedBehavior};
use serde_json::{Map, Value};

/// Prompts for one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePrompt {
    pub system: &'static str,
    pub user: String,
}

/// Build both prompts for `stage`
pub fn build(stage: Stage, ctx: &AnalysisContext, lang: Language) -> Result<StagePrompt> {
    Ok(StagePrompt {
        system: system_prompt(stage, lang),
        user: user_prompt(stage, ctx, lang)?,
    })
}

/// Persona, structure and length target of `stage`
pub fn system_prompt(stage: Stage, lang: Language) -> &'static str {
    match (stage, lang) {
        (Stage::Comprehensive, Language::Chinese) => zh::SYSTEM_COMPREHENSIVE,
        (Stage::DebateBull, Language::Chinese) => zh::SYSTEM_BULL,
        (Stage::DebateBear, Language::Chinese) => zh::SYSTEM_BEAR,
        (Stage::Trader, Language::Chinese) => zh::SYSTEM_TRADER,
        (Stage::Final, Language::Chinese) => zh::SYSTEM_FINAL,
        (Stage::Comprehensive, Language::English) => en::SYSTEM_COMPREHENSIVE,
        (Stage::DebateBull, Language::English) => en::SYSTEM_BULL,
        (Stage::DebateBear, Language::English) => en::SYSTEM_BEAR,
        (Stage::Trader, Language::English) => en::SYSTEM_TRADER,
        (Stage::Final, Language::English) => en::SYSTEM_FINAL,
    }
}

/// Render the user prompt of `stage` from the context
pub fn user_prompt(stage: Stage, ctx: &AnalysisContext, lang: Language) -> Result<String> {
    for &missing in stage.dependencies() {
        ctx.require(stage, missing)?;
    }

    let mut vars = Map::new();
    vars.insert("code".into(), Value::from(ctx.code.as_str()));
    vars.insert("name".into(), Value::from(ctx.name.as_str()));
    vars.insert("industry".into(), Value::from(ctx.industry.as_str()));
    vars.insert("market_cap".into(), Value::from(fixed2(ctx.market_cap)));
    vars.insert("pe_ttm".into(), Value::from(fixed2(ctx.pe_ttm)));
    vars.insert("pb".into(), Value::from(fixed2(ctx.pb)));
    vars.insert("latest_price".into(), Value::from(fixed2(ctx.latest_price)));
    vars.insert("roe".into(), Value::from(fixed2(ctx.roe)));
    vars.insert("debt_ratio".into(), Value::from(fixed2(ctx.debt_ratio)));
    vars.insert("revenue_growth".into(), Value::from(fixed2(ctx.revenue_growth)));
    vars.insert("profit_growth".into(), Value::from(fixed2(ctx.profit_growth)));
    vars.insert("risks".into(), Value::from(ctx.risks.clone()));

    for (done, text) in ctx.completed() {
        vars.insert(done.result_key().into(), Value::from(text));
    }

    if let Some((direction, stance)) = debate_side(stage, lang) {
        vars.insert("direction".into(), Value::from(direction));
        vars.insert("stance".into(), Value::from(stance));
    }

    render(stage, user_template(stage, lang), &Value::Object(vars))
}

fn user_template(stage: Stage, lang: Language) -> &'static str {
    match (stage, lang) {
        (Stage::Comprehensive, Language::Chinese) => zh::USER_COMPREHENSIVE,
        (Stage::DebateBull | Stage::DebateBear, Language::Chinese) => zh::USER_DEBATE,
        (Stage::Trader, Language::Chinese) => zh::USER_TRADER,
        (Stage::Final, Language::Chinese) => zh::USER_FINAL,
        (Stage::Comprehensive, Language::English) => en::USER_COMPREHENSIVE,
        (Stage::DebateBull | Stage::DebateBear, Language::English) => en::USER_DEBATE,
        (Stage::Trader, Language::English) => en::USER_TRADER,
        (Stage::Final, Language::English) => en::USER_FINAL,
    }
}

/// Directional labels substituted into the shared debate template
fn debate_side(stage: Stage, lang: Language) -> Option<(&'static str, &'static str)> {
    match (stage, lang) {
        (Stage::DebateBull, Language::Chinese) => Some(("多", "多头")),
        (Stage::DebateBear, Language::Chinese) => Some(("空", "空头")),
        (Stage::DebateBull, Language::English) => Some(("bullish", "bull")),
        (Stage::DebateBear, Language::English) => Some(("bearish", "bear")),
        _ => None,
    }
}

fn fixed2(value: f64) -> String {
    format!("{value:.2}")
}

fn render(stage: Stage, template: &str, vars: &Value) -> Result<String> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);

    env.render_str(template, vars)
        .map_err(|e| PipelineError::Prompt {
            stage,
            detail: e.to_string(),
        })
}

mod zh {
    pub(super) const SYSTEM_COMPREHENSIVE: &str = "你是一位资深的A股投资分析师，擅长客观中立地分析上市公司。请基于提供的财务数据进行综合分析，包括：
1. 公司基本情况和行业地位
2. 财务健康度（盈利能力、偿债能力）
3. 估值水平评估
4. 主要风险点

要求：客观中立，基于数据，200-300字，结构清晰。";

    pub(super) const SYSTEM_BULL: &str = "你是一位乐观的多头投资者，擅长挖掘股票的投资价值和上涨潜力。请从多头角度分析：
1. 最吸引人的3-5个投资亮点
2. 为什么现在是好的买入时机
3. 未来的上涨驱动力

要求：积极正面但基于数据，150-200字，突出投资价值。";

    pub(super) const SYSTEM_BEAR: &str = "你是一位谨慎的空头投资者，擅长识别风险和质疑过度乐观的预期。请从空头角度分析：
1. 最大的3-5个风险点
2. 为什么当前估值可能不便宜
3. 哪些因素可能导致下跌

要求：批判谨慎但基于逻辑，150-200字，突出风险因素。";

    pub(super) const SYSTEM_TRADER: &str = "你是一位实战经验丰富的A股交易员，擅长将分析转化为具体的交易决策。基于前面的多空分析，给出：
1. 操作方向（买入/持有/卖出）
2. 建议仓位（轻仓5-10%/中仓10-20%/重仓20%+）
3. 参考买入价位区间
4. 止损位设置
5. 预期持有周期

要求：具体可执行，考虑风险收益比，150-200字。";

    pub(super) const SYSTEM_FINAL: &str = "你是投资决策委员会的风险管理官，负责综合各方意见给出最终决策。请提供：
1. 风险等级评估（高/中/低风险）
2. 综合投资建议（买入/持有/卖出）
3. 信心指数（0-100）
4. 决策理由总结

要求：平衡风险和收益，给出明确结论，200-250字。";

    pub(super) const USER_COMPREHENSIVE: &str = r#"请分析【{{ name }}({{ code }})】：

【基本信息】
- 行业: {{ industry or "未知" }}
- 市值: {{ market_cap }}亿元
- 最新价: {{ latest_price }}元
- PE: {{ pe_ttm }}, PB: {{ pb }}

【财务指标】
- ROE: {{ roe }}%
- 资产负债率: {{ debt_ratio }}%
- 营收增长: {{ revenue_growth }}%
- 净利润增长: {{ profit_growth }}%

【风险信号】
{% for risk in risks %}- {{ risk }}
{% else %}- 暂无明显风险信号
{% endfor %}
请进行综合分析。"#;

    pub(super) const USER_DEBATE: &str = "基于以下综合分析，请给出【{{ name }}】的看{{ direction }}观点：

【综合分析】
{{ comprehensive_analysis }}

【关键数据】
- ROE: {{ roe }}%
- 资产负债率: {{ debt_ratio }}%
- 营收增长: {{ revenue_growth }}%

请从{{ stance }}角度分析。";

    pub(super) const USER_TRADER: &str = "基于以下分析，给出【{{ name }}】的交易建议：

【综合分析】
{{ comprehensive_analysis }}

【多头观点】
{{ bull_case }}

【空头观点】
{{ bear_case }}

【当前价格】{{ latest_price }}元

请给出具体的交易建议。";

    pub(super) const USER_FINAL: &str = "基于完整分析链，给出【{{ name }}】的最终投资建议：

【综合分析】
{{ comprehensive_analysis }}

【多头观点】
{{ bull_case }}

【空头观点】
{{ bear_case }}

【交易员建议】
{{ trader_decision }}

请给出最终决策（包含：风险等级、投资建议、信心指数、理由）。";
}

mod en {
    pub(super) const SYSTEM_COMPREHENSIVE: &str = "You are a senior equity analyst covering China A-shares, known for objective and neutral company analysis. Based on the financial data provided, write a comprehensive analysis covering:
1. Company profile and industry position
2. Financial health (profitability, solvency)
3. Valuation assessment
4. Key risks

Requirements: objective, data-driven, 150-250 words, clearly structured.";

    pub(super) const SYSTEM_BULL: &str = "You are an optimistic bull-side investor who excels at finding a stock's investment value and upside. Argue the bull case:
1. The 3-5 most attractive investment highlights
2. Why now is a good time to buy
3. Future drivers of upside

Requirements: positive but grounded in data, 120-180 words, emphasise investment value.";

    pub(super) const SYSTEM_BEAR: &str = "You are a cautious bear-side investor who excels at spotting risks and challenging over-optimistic expectations. Argue the bear case:
1. The 3-5 biggest risks
2. Why the current valuation may not be cheap
3. Which factors could drive the price down

Requirements: critical but logical, 120-180 words, emphasise risk factors.";

    pub(super) const SYSTEM_TRADER: &str = "You are a seasoned A-share trader who turns analysis into concrete trading decisions. Based on the bull and bear arguments, give:
1. Direction (buy / hold / sell)
2. Position size (light 5-10% / medium 10-20% / heavy 20%+)
3. Reference entry price range
4. Stop-loss level
5. Expected holding period

Requirements: concrete and actionable, weigh risk against reward, 120-180 words.";

    pub(super) const SYSTEM_FINAL: &str = "You are the risk officer of the investment committee, responsible for weighing all opinions and making the final decision. Provide:
1. Risk level (high / medium / low)
2. Overall recommendation (buy / hold / sell)
3. Confidence score (0-100)
4. Summary of the reasoning

Requirements: balance risk and reward, state a clear conclusion, 150-220 words.";

    pub(super) const USER_COMPREHENSIVE: &str = r#"Analyze {{ name }} ({{ code }}):

[Basics]
- Industry: {{ industry or "unknown" }}
- Market cap: {{ market_cap }} x100M CNY
- Latest price: {{ latest_price }} CNY
- PE: {{ pe_ttm }}, PB: {{ pb }}

[Financial metrics]
- ROE: {{ roe }}%
- Debt ratio: {{ debt_ratio }}%
- Revenue growth: {{ revenue_growth }}%
- Net profit growth: {{ profit_growth }}%

[Risk signals]
{% for risk in risks %}- {{ risk }}
{% else %}- No notable risk signals
{% endfor %}
Please provide a comprehensive analysis."#;

    pub(super) const USER_DEBATE: &str = "Based on the comprehensive analysis below, give a {{ direction }} view on {{ name }}:

[Comprehensive analysis]
{{ comprehensive_analysis }}

[Key data]
- ROE: {{ roe }}%
- Debt ratio: {{ debt_ratio }}%
- Revenue growth: {{ revenue_growth }}%

Argue from the {{ stance }} perspective.";

    pub(super) const USER_TRADER: &str = "Based on the analysis below, give a trading recommendation for {{ name }}:

[Comprehensive analysis]
{{ comprehensive_analysis }}

[Bull case]
{{ bull_case }}

[Bear case]
{{ bear_case }}

[Current price] {{ latest_price }} CNY

Please give a concrete trading plan.";

    pub(super) const USER_FINAL: &str = "Based on the full analysis chain, give the final investment recommendation for {{ name }}:

[Comprehensive analysis]
{{ comprehensive_analysis }}

[Bull case]
{{ bull_case }}

[Bear case]
{{ bear_case }}

[Trader recommendation]
{{ trader_decision }}

Give the final decision (risk level, recommendation, confidence score, reasoning).";
}
