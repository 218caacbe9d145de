//! Analysis orchestrator
//!
//! Runs the fetch and the five stages of one analysis in order and turns
//! stage boundaries and provider fragments into [`StreamEvent`]s on a bounded
//! channel. The run owns the only sender: it emits exactly one terminal event
//! (`done` or `error`) and then drops the sender, which closes the channel.

use crate::prompts;
use crate::{
    AnalysisContext, AnalysisOutcome, AnalysisRequest, FinancialDataSource, Language,
    PipelineError, Result, RunState, Stage, StreamEvent,
};
use analyst_llm::{CompletionRequest, FragmentSink, LLMError, StreamingProvider};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};

/// Depth of the event channel between a run and its consumer
pub const CHANNEL_CAPACITY: usize = 10;

/// How long a cancelled run keeps trying to deliver its terminal event
const TERMINAL_SEND_GRACE: Duration = Duration::from_secs(1);

/// Sequences the data fetch and the five LLM stages of an analysis
///
/// One orchestrator is shared by all requests; every run owns its own
/// context, accumulators and event channel.
pub struct AnalysisOrchestrator {
    source: Arc<dyn FinancialDataSource>,
    provider: Arc<dyn StreamingProvider>,
    language: Language,
}

impl AnalysisOrchestrator {
    pub fn new(source: Arc<dyn FinancialDataSource>, provider: Arc<dyn StreamingProvider>) -> Self {
        Self {
            source,
            provider,
            language: Language::default(),
        }
    }

    /// Set the prompt and message language
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Name of the underlying LLM provider
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Spawn a run in the background and return its event stream
    ///
    /// The receiver yields events in emission order and returns `None` once
    /// the run has finished. Cancelling `cancel` stops the run promptly.
    pub fn start(
        self: &Arc<Self>,
        request: AnalysisRequest,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let orchestrator = Arc::clone(self);
        let span = info_span!("analysis", code = %request.code);

        tokio::spawn(
            async move {
                // outcome and failure are both reported through the channel
                let _ = orchestrator.run(request, cancel, tx).await;
            }
            .instrument(span),
        );

        rx
    }

    /// Run one analysis to completion, emitting events on `tx`
    ///
    /// `tx` is consumed and dropped after the terminal event, so the channel
    /// closes exactly when this future completes.
    #[instrument(skip_all, fields(provider = self.provider.name(), model = self.provider.model()))]
    pub async fn run(
        &self,
        request: AnalysisRequest,
        cancel: CancellationToken,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<AnalysisOutcome> {
        let mut state = RunState::NotStarted;
        let result = self.execute(request, &cancel, &tx, &mut state).await;

        let terminal = match &result {
            Ok(outcome) => {
                info!(
                    code = %outcome.code,
                    comprehensive = outcome.comprehensive_analysis.chars().count(),
                    bull = outcome.bull_case.chars().count(),
                    bear = outcome.bear_case.chars().count(),
                    trader = outcome.trader_decision.chars().count(),
                    final_decision = outcome.final_decision.chars().count(),
                    "Analysis completed"
                );
                StreamEvent::done(self.language)
            }
            Err(e) => {
                if e.is_internal() {
                    error!(state = %state, error = %e, "Analysis aborted by sequencing error");
                } else if matches!(e, PipelineError::Cancelled | PipelineError::ChannelClosed) {
                    warn!(state = %state, error = %e, "Analysis stopped");
                } else {
                    error!(state = %state, error = %e, "Analysis failed");
                }
                state = RunState::Failed;
                StreamEvent::error(e.client_message(self.language))
            }
        };

        debug_assert!(state.is_terminal());

        // a stalled consumer must not keep a cancelled run alive
        let delivered = tokio::select! {
            sent = tx.send(terminal) => sent.is_ok(),
            () = async {
                cancel.cancelled().await;
                tokio::time::sleep(TERMINAL_SEND_GRACE).await;
            } => false,
        };
        if !delivered {
            debug!(state = %state, "Terminal event not delivered");
        }
        drop(tx);
        result
    }

    async fn execute(
        &self,
        request: AnalysisRequest,
        cancel: &CancellationToken,
        tx: &mpsc::Sender<StreamEvent>,
        state: &mut RunState,
    ) -> Result<AnalysisOutcome> {
        let request = request.normalized()?;

        *state = state.advance();
        emit(tx, cancel, StreamEvent::fetching(self.language)).await?;

        let report = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(PipelineError::Cancelled),
            fetched = self.source.fetch(&request.code) => fetched?,
        };

        let mut ctx = AnalysisContext::from_report(&request, &report);
        info!(code = %ctx.code, name = %ctx.name, "Financial data fetched");

        for stage in Stage::ALL {
            *state = state.advance();
            debug_assert_eq!(*state, RunState::Running(stage));
            ctx = self.run_stage(stage, ctx, cancel, tx).await?;
        }

        *state = state.advance();
        ctx.into_outcome()
    }

    async fn run_stage(
        &self,
        stage: Stage,
        ctx: AnalysisContext,
        cancel: &CancellationToken,
        tx: &mpsc::Sender<StreamEvent>,
    ) -> Result<AnalysisContext> {
        emit(tx, cancel, StreamEvent::stage_started(stage, self.language)).await?;

        let prompt = prompts::build(stage, &ctx, self.language)?;
        let request = CompletionRequest::new(prompt.system, prompt.user);

        info!(stage = %stage, "Stage started");
        let mut sink = StageSink {
            stage,
            language: self.language,
            tx,
            cancel,
            text: String::new(),
        };

        match self.provider.stream_completion(cancel, &request, &mut sink).await {
            Ok(()) => {}
            Err(LLMError::Cancelled) => return Err(PipelineError::Cancelled),
            Err(LLMError::SinkClosed(_)) => return Err(PipelineError::ChannelClosed),
            Err(source) => return Err(PipelineError::Provider { stage, source }),
        }

        // the vendor may have finished in the same instant the run was cancelled
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        info!(stage = %stage, chars = sink.text.chars().count(), "Stage finished");
        ctx.with_output(stage, sink.text)
    }
}

async fn emit(
    tx: &mpsc::Sender<StreamEvent>,
    cancel: &CancellationToken,
    event: StreamEvent,
) -> Result<()> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(PipelineError::Cancelled),
        sent = tx.send(event) => sent.map_err(|_| PipelineError::ChannelClosed),
    }
}

/// Accumulates a stage's text and forwards each fragment as an event
struct StageSink<'a> {
    stage: Stage,
    language: Language,
    tx: &'a mpsc::Sender<StreamEvent>,
    cancel: &'a CancellationToken,
    text: String,
}

#[async_trait]
impl FragmentSink for StageSink<'_> {
    async fn on_fragment(&mut self, fragment: &str) -> analyst_llm::Result<()> {
        if fragment.is_empty() {
            return Ok(());
        }
        self.text.push_str(fragment);
        let event = StreamEvent::fragment(self.stage, self.language, fragment);

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(LLMError::Cancelled),
            sent = self.tx.send(event) => sent
                .map_err(|_| LLMError::SinkClosed("event receiver dropped".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockFinancialDataSource;
    use crate::report::{FinancialMetrics, PriceInfo};
    use crate::{FetchError, FinancialReport};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that streams a fixed script per call
    struct ScriptedProvider {
        fragments: Vec<&'static str>,
        fail_on_call: Option<usize>,
        calls: AtomicUsize,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        fn new(fragments: Vec<&'static str>) -> Self {
            Self {
                fragments,
                fail_on_call: None,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(mut self, call: usize) -> Self {
            self.fail_on_call = Some(call);
            self
        }
    }

    #[async_trait]
    impl StreamingProvider for ScriptedProvider {
        async fn stream_completion(
            &self,
            _cancel: &CancellationToken,
            request: &CompletionRequest,
            sink: &mut dyn FragmentSink,
        ) -> analyst_llm::Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());

            for fragment in &self.fragments {
                sink.on_fragment(fragment).await?;
            }
            if self.fail_on_call == Some(call) {
                return Err(LLMError::Api {
                    provider: "scripted".to_string(),
                    status: 500,
                    body: "upstream exploded".to_string(),
                });
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-1"
        }
    }

    /// Provider that keeps streaming until cancelled
    struct EndlessProvider;

    #[async_trait]
    impl StreamingProvider for EndlessProvider {
        async fn stream_completion(
            &self,
            cancel: &CancellationToken,
            _request: &CompletionRequest,
            sink: &mut dyn FragmentSink,
        ) -> analyst_llm::Result<()> {
            loop {
                sink.on_fragment("tick ").await?;
                tokio::select! {
                    () = cancel.cancelled() => return Err(LLMError::Cancelled),
                    () = tokio::time::sleep(Duration::from_millis(5)) => {}
                }
            }
        }

        fn name(&self) -> &str {
            "endless"
        }

        fn model(&self) -> &str {
            "endless-1"
        }
    }

    fn test_report() -> FinancialReport {
        FinancialReport {
            code: "000001".to_string(),
            name: "Test Co".to_string(),
            price: PriceInfo {
                latest_price: 12.5,
                ..Default::default()
            },
            financial_metrics: FinancialMetrics {
                roe: 15.2,
                debt_ratio: 45.0,
                revenue_growth: 8.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn source_returning_report() -> Arc<dyn FinancialDataSource> {
        let mut source = MockFinancialDataSource::new();
        source
            .expect_fetch()
            .withf(|code: &str| code == "000001")
            .times(1)
            .returning(|_| Ok(test_report()));
        Arc::new(source)
    }

    async fn collect(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_end_to_end_event_sequence() {
        let provider = Arc::new(ScriptedProvider::new(vec!["Hello ", "World"]));
        let orchestrator = Arc::new(AnalysisOrchestrator::new(
            source_returning_report(),
            provider.clone(),
        ));

        let rx = orchestrator.start(AnalysisRequest::new("000001"), CancellationToken::new());
        let events = tokio::time::timeout(Duration::from_secs(5), collect(rx))
            .await
            .expect("channel should close after done");

        let mut expected = vec![StreamEvent::fetching(Language::Chinese)];
        for stage in Stage::ALL {
            expected.push(StreamEvent::stage_started(stage, Language::Chinese));
            expected.push(StreamEvent::fragment(stage, Language::Chinese, "Hello "));
            expected.push(StreamEvent::fragment(stage, Language::Chinese, "World"));
        }
        expected.push(StreamEvent::done(Language::Chinese));

        assert_eq!(events, expected);
        assert!(!events.iter().any(|e| matches!(e, StreamEvent::Error { .. })));

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 5);
        assert!(requests[0].user.contains("Test Co(000001)"));
        assert!(requests[0].user.contains("ROE: 15.20%"));
        assert!(requests[0].user.contains("最新价: 12.50元"));
        // later stages see the accumulated text of earlier ones
        assert!(requests[3].user.contains("Hello World"));
        assert_eq!(requests[4].system, prompts::system_prompt(Stage::Final, Language::Chinese));
    }

    #[tokio::test]
    async fn test_run_returns_outcome() {
        let orchestrator = AnalysisOrchestrator::new(
            source_returning_report(),
            Arc::new(ScriptedProvider::new(vec!["Hello ", "World"])),
        )
        .with_language(Language::English);

        let (tx, rx) = mpsc::channel(64);
        let outcome = orchestrator
            .run(AnalysisRequest::new("000001"), CancellationToken::new(), tx)
            .await
            .unwrap();

        for stage in Stage::ALL {
            assert_eq!(outcome.text(stage), "Hello World");
        }
        assert_eq!(outcome.name, "Test Co");

        let events = collect(rx).await;
        assert_eq!(events.last(), Some(&StreamEvent::done(Language::English)));
    }

    #[tokio::test]
    async fn test_fetch_failure_emits_single_error() {
        let mut source = MockFinancialDataSource::new();
        source.expect_fetch().returning(|_| {
            Err(FetchError::Status {
                status: 500,
                body: "boom".to_string(),
            })
        });
        let provider = Arc::new(ScriptedProvider::new(vec!["never"]));
        let orchestrator = Arc::new(AnalysisOrchestrator::new(Arc::new(source), provider.clone()));

        let events = collect(orchestrator.start(AnalysisRequest::new("000001"), CancellationToken::new())).await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], StreamEvent::fetching(Language::Chinese));
        assert_eq!(events[1], StreamEvent::error("获取数据失败: HTTP 500"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_stops_pipeline() {
        // third call is the bear stage
        let provider = Arc::new(ScriptedProvider::new(vec!["Hello ", "World"]).failing_on(2));
        let orchestrator = AnalysisOrchestrator::new(source_returning_report(), provider.clone());

        let (tx, rx) = mpsc::channel(64);
        let err = orchestrator
            .run(AnalysisRequest::new("000001"), CancellationToken::new(), tx)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Provider { stage: Stage::DebateBear, .. }));

        let events = collect(rx).await;
        let terminal: Vec<&StreamEvent> = events.iter().filter(|e| e.is_terminal()).collect();
        assert_eq!(terminal.len(), 1);
        assert_eq!(
            events.last(),
            Some(&StreamEvent::error("空头观点失败: LLM service returned HTTP 500"))
        );
        assert!(!events.iter().any(|e| matches!(
            e,
            StreamEvent::Progress { step: "trader", .. }
        )));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_invalid_request_never_fetches() {
        let mut source = MockFinancialDataSource::new();
        source.expect_fetch().never();
        let orchestrator = AnalysisOrchestrator::new(
            Arc::new(source),
            Arc::new(ScriptedProvider::new(vec![])),
        );

        let (tx, rx) = mpsc::channel(4);
        let err = orchestrator
            .run(AnalysisRequest::new("  "), CancellationToken::new(), tx)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRequest(_)));

        let events = collect(rx).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], StreamEvent::Error { .. }));
    }

    #[tokio::test]
    async fn test_stage_events_never_interleave() {
        let provider = Arc::new(ScriptedProvider::new(vec!["a", "", "b", "c"]));
        let orchestrator = Arc::new(AnalysisOrchestrator::new(source_returning_report(), provider));

        let events = collect(orchestrator.start(AnalysisRequest::new("000001"), CancellationToken::new())).await;

        let stages: Vec<Stage> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::AnalysisStep { stage, .. } => Some(*stage),
                _ => None,
            })
            .collect();
        assert!(!events.iter().any(|e| matches!(
            e,
            StreamEvent::AnalysisStep { content, .. } if content.is_empty()
        )));
        assert_eq!(stages.len(), 3 * Stage::ALL.len());

        let mut sorted = stages.clone();
        sorted.sort();
        assert_eq!(stages, sorted, "fragments must be grouped by stage in order");

        // each stage's progress event precedes its fragments
        for stage in Stage::ALL {
            let started = events
                .iter()
                .position(|e| *e == StreamEvent::stage_started(stage, Language::Chinese))
                .unwrap();
            let first_fragment = events
                .iter()
                .position(|e| matches!(e, StreamEvent::AnalysisStep { stage: s, .. } if *s == stage))
                .unwrap();
            assert!(started < first_fragment);
        }
        assert!(events.last().is_some_and(StreamEvent::is_terminal));
    }

    #[tokio::test]
    async fn test_cancellation_stops_fragments_and_closes_channel() {
        let orchestrator = Arc::new(AnalysisOrchestrator::new(
            source_returning_report(),
            Arc::new(EndlessProvider),
        ));
        let cancel = CancellationToken::new();
        let mut rx = orchestrator.start(AnalysisRequest::new("000001"), cancel.clone());

        // wait for the first fragment, then cancel
        loop {
            let event = rx.recv().await.expect("stream ended before first fragment");
            if matches!(event, StreamEvent::AnalysisStep { .. }) {
                break;
            }
        }
        cancel.cancel();

        let rest = tokio::time::timeout(Duration::from_secs(2), collect(rx))
            .await
            .expect("channel should close promptly after cancellation");

        // at most what was already buffered in the channel, then one terminal event
        let fragments = rest
            .iter()
            .filter(|e| matches!(e, StreamEvent::AnalysisStep { .. }))
            .count();
        assert!(fragments <= CHANNEL_CAPACITY);
        assert_eq!(rest.iter().filter(|e| e.is_terminal()).count(), 1);
        assert_eq!(rest.last(), Some(&StreamEvent::error("分析已取消")));
    }

    #[tokio::test]
    async fn test_stalled_consumer_does_not_outlive_cancellation() {
        let orchestrator = AnalysisOrchestrator::new(
            source_returning_report(),
            Arc::new(ScriptedProvider::new(vec!["Hello "])),
        );
        // the receiver stays open but is never read
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            orchestrator.run(AnalysisRequest::new("000001"), cancel, tx),
        )
        .await
        .expect("run should end once cancelled even if nobody reads");
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }

    #[tokio::test]
    async fn test_dropped_receiver_ends_run() {
        let mut source = MockFinancialDataSource::new();
        source.expect_fetch().returning(|_| Ok(test_report()));
        let orchestrator = AnalysisOrchestrator::new(Arc::new(source), Arc::new(EndlessProvider));
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        drop(rx);

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            orchestrator.run(AnalysisRequest::new("000001"), CancellationToken::new(), tx),
        )
        .await
        .expect("run should notice the closed channel");
        assert!(matches!(result, Err(PipelineError::ChannelClosed)));
    }
}
