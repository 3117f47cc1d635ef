use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::llm::{ChatModel, GatewayError};
use crate::store::{ArticleQuery, ArticleStatus, ContentStore};
use crate::telemetry::{self};
use crate::telemetry::ops::process::Phase as ProcessPhase;

use super::article::process_article;
use super::tally::{DrainError, DrainReport, ProgressFn, Tally};

pub const DEFAULT_WIDTH: usize = 3;

/// Drains pending articles through the model with a fixed number of concurrent workers.
#[derive(Clone)]
pub struct Processor {
    store: Arc<dyn ContentStore>,
    model: Arc<dyn ChatModel>,
    width: usize,
    observer: ProgressFn,
}

impl Processor {
    pub fn new(store: Arc<dyn ContentStore>, model: Arc<dyn ChatModel>) -> Self {
        let log = telemetry::process();
        Self {
            store,
            model,
            width: DEFAULT_WIDTH,
            observer: Arc::new(move |p| log.progress(p.done, p.total, p.succeeded, p.failed)),
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(1);
        self
    }

    pub fn with_observer(mut self, observer: ProgressFn) -> Self {
        self.observer = observer;
        self
    }

    /// Process pending articles batch by batch until none are left or `cancel` fires.
    ///
    /// A batch is fully joined before the next one is fetched. Articles that fail stay
    /// Pending and are not retried within the same drain.
    pub async fn drain(&self, cancel: &CancellationToken, batch_size: i64) -> Result<DrainReport, DrainError> {
        let log = telemetry::process();
        let batch_size = batch_size.max(1);

        let total = self
            .store
            .count_articles(Some(ArticleStatus::Pending))
            .instrument(log.span(&ProcessPhase::CountPending))
            .await
            .map_err(DrainError::Store)?;
        if total == 0 {
            log.info("ℹ️  No pending articles");
            return Ok(DrainReport::default());
        }
        log.info(format!("🚀 Processing {} pending article(s) — width={} batch={}", total, self.width, batch_size));

        let tally = Arc::new(Tally::new(total, self.observer.clone()));
        let limiter = Arc::new(Semaphore::new(self.width));
        let mut failed_ids: HashSet<i64> = HashSet::new();
        let mut batches = 0usize;

        loop {
            // over-fetch by the known failures so they cannot crowd out untried rows
            let query = ArticleQuery::pending(batch_size + failed_ids.len() as i64);
            let rows = self
                .store
                .query_articles(&query)
                .instrument(log.span(&ProcessPhase::FetchBatch))
                .await
                .map_err(DrainError::Store)?;
            if rows.is_empty() { break; }

            let batch: Vec<_> = rows
                .into_iter()
                .filter(|a| !failed_ids.contains(&a.article_id))
                .take(batch_size as usize)
                .collect();
            if batch.is_empty() {
                log.warn(format!("⚠️ {} article(s) failed and remain pending", failed_ids.len()));
                break;
            }
            batches += 1;

            let mut tasks = JoinSet::new();
            let mut dispatched: HashSet<i64> = HashSet::new();
            let mut cancelled = false;
            for article in batch {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break;
                }
                let permit = tokio::select! {
                    p = limiter.clone().acquire_owned() => match p {
                        Ok(p) => p,
                        Err(_) => { cancelled = true; break; }
                    },
                    _ = cancel.cancelled() => { cancelled = true; break; }
                };

                let id = article.article_id;
                dispatched.insert(id);
                let store = self.store.clone();
                let model = self.model.clone();
                let tally = tally.clone();
                let work = async move {
                    let _permit = permit;
                    let res = process_article(store.as_ref(), model.as_ref(), article).await;
                    tally.record(res.is_ok());
                    (id, res)
                };
                tasks.spawn(work.instrument(log.span(&ProcessPhase::Dispatch)));
            }

            while let Some(joined) = tasks.join_next().instrument(log.span(&ProcessPhase::Join)).await {
                match joined {
                    Ok((id, Ok(_))) => { dispatched.remove(&id); }
                    Ok((id, Err(e))) => {
                        dispatched.remove(&id);
                        failed_ids.insert(id);
                        let transient = e.downcast_ref::<GatewayError>().is_some_and(GatewayError::is_retryable);
                        log.warn(format!("⚠️ Article {} failed (transient={}): {e:#}", id, transient));
                    }
                    Err(e) => log.error(format!("❌ worker aborted: {e}")),
                }
            }
            // workers that panicked never reported back
            for id in dispatched {
                tally.record(false);
                failed_ids.insert(id);
            }

            if cancelled {
                let report = tally.report(batches);
                log.warn(format!(
                    "⏹️ Processing cancelled — done={} succeeded={} failed={}",
                    report.completed(), report.succeeded, report.failed
                ));
                return Err(DrainError::Cancelled(report));
            }
        }

        let report = tally.finish(batches);
        log.info(format!(
            "🏁 Processing finished — total={} succeeded={} failed={}",
            report.total_at_start, report.succeeded, report.failed
        ));
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::settings::{self, PROMPT_FILTER, PROMPT_SUMMARY};
    use crate::store::memory::MemoryStore;
    use crate::store::NewArticle;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    const FILTER: &str = "FILTER";
    const SUMMARY: &str = "SUMMARY";

    type Script = dyn Fn(usize, &str) -> Result<String, GatewayError> + Send + Sync;

    /// Answers filter calls with `on_filter(nth_call, input)` and summary calls with `summary of <input>`.
    struct ScriptedModel {
        on_filter: Box<Script>,
        fail_summary_for: Option<String>,
        delay: Duration,
        filter_calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ScriptedModel {
        fn new(on_filter: impl Fn(usize, &str) -> Result<String, GatewayError> + Send + Sync + 'static) -> Self {
            Self {
                on_filter: Box::new(on_filter),
                fail_summary_for: None,
                delay: Duration::from_millis(5),
                filter_calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }

        fn worth_all() -> Self { Self::new(|_, _| Ok(r#"{"worth": true, "reason": ""}"#.into())) }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn chat(&self, system: &str, user: &str) -> Result<String, GatewayError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if system == FILTER {
                let n = self.filter_calls.fetch_add(1, Ordering::SeqCst) + 1;
                return (self.on_filter)(n, user);
            }
            if self.fail_summary_for.as_deref().is_some_and(|t| user.starts_with(t)) {
                return Err(GatewayError::Timeout);
            }
            Ok(format!("summary of {}", user.lines().next().unwrap_or_default()))
        }
    }

    async fn seeded_store(n: usize) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::with_settings([
            (PROMPT_FILTER, FILTER),
            (PROMPT_SUMMARY, SUMMARY),
            (settings::FILTER_REJECT_MARKER, settings::DEFAULT_REJECT_MARKER),
        ]));
        let base = Utc::now();
        for i in 0..n {
            store
                .find_or_create_article(&NewArticle {
                    source_id: 1,
                    title: format!("title-{i}"),
                    link: format!("https://example.com/{i}"),
                    content: format!("content-{i}"),
                    pub_date: base - ChronoDuration::minutes(i as i64),
                })
                .await
                .unwrap();
        }
        store
    }

    fn processor(store: &Arc<MemoryStore>, model: &Arc<ScriptedModel>) -> Processor {
        Processor::new(store.clone(), model.clone())
    }

    fn assert_consistent(store: &MemoryStore) {
        for a in store.articles() {
            assert_eq!(a.status == ArticleStatus::Pending, a.processed_at.is_none(), "article {}", a.article_id);
        }
    }

    #[tokio::test]
    async fn empty_store_is_a_noop() {
        let store = seeded_store(0).await;
        let model = Arc::new(ScriptedModel::worth_all());
        let report = processor(&store, &model).drain(&CancellationToken::new(), 10).await.unwrap();
        assert_eq!(report, DrainReport::default());
        assert_eq!(model.filter_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn peak_concurrency_never_exceeds_width() {
        let store = seeded_store(25).await;
        let mut model = ScriptedModel::worth_all();
        model.delay = Duration::from_millis(20);
        let model = Arc::new(model);

        let report = processor(&store, &model).drain(&CancellationToken::new(), 10).await.unwrap();
        assert_eq!(report.succeeded, 25);
        assert_eq!(report.batches, 3);
        let peak = model.peak.load(Ordering::SeqCst);
        assert!(peak <= DEFAULT_WIDTH, "peak={peak}");
        assert!(peak >= 2, "workers should overlap, peak={peak}");
    }

    #[tokio::test]
    async fn drain_leaves_nothing_pending() {
        let store = seeded_store(12).await;
        let model = Arc::new(ScriptedModel::new(|n, _| {
            Ok(if n % 3 == 0 { r#"{"worth": false, "reason": "filler"}"#.into() } else { r#"{"worth": true}"#.into() })
        }));

        let report = processor(&store, &model).drain(&CancellationToken::new(), 5).await.unwrap();
        assert_eq!(report.total_at_start, 12);
        assert_eq!(report.succeeded, 12);
        assert_eq!(store.count_articles(Some(ArticleStatus::Pending)).await.unwrap(), 0);
        assert_eq!(store.count_articles(Some(ArticleStatus::Filtered)).await.unwrap(), 4);
        for a in store.articles() {
            match a.status {
                ArticleStatus::Filtered => assert_eq!(a.summary, "filler"),
                ArticleStatus::Processed => assert_eq!(a.summary, format!("summary of {}", a.title)),
                ArticleStatus::Pending => unreachable!(),
            }
        }
        assert_consistent(&store);
    }

    #[tokio::test]
    async fn prose_replies_fall_back_to_heuristic() {
        let store = seeded_store(2).await;
        let model = Arc::new(ScriptedModel::new(|_, input| {
            Ok(if input.starts_with("title-0") { "No, skip it.".into() } else { "Yes, read it".into() })
        }));

        processor(&store, &model).drain(&CancellationToken::new(), 10).await.unwrap();
        let rows = store.articles();
        assert_eq!(rows[0].status, ArticleStatus::Filtered);
        assert_eq!(rows[0].summary, "");
        assert_eq!(rows[1].status, ArticleStatus::Processed);
    }

    #[tokio::test]
    async fn summary_failure_keeps_item_pending_and_drain_terminates() {
        let store = seeded_store(6).await;
        let mut model = ScriptedModel::worth_all();
        model.fail_summary_for = Some("title-2\n".into());
        let model = Arc::new(model);

        let report = processor(&store, &model).drain(&CancellationToken::new(), 2).await.unwrap();
        assert_eq!(report.succeeded, 5);
        assert_eq!(report.failed, 1);
        let pending = store.query_articles(&ArticleQuery::pending(10)).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].title, "title-2");
        assert!(pending[0].summary.is_empty());
        assert_consistent(&store);
    }

    #[tokio::test]
    async fn persistent_failures_do_not_loop_forever() {
        let store = seeded_store(4).await;
        let model = Arc::new(ScriptedModel::new(|_, _| Err(GatewayError::MissingConfig("api url"))));

        let report = tokio::time::timeout(
            Duration::from_secs(5),
            processor(&store, &model).drain(&CancellationToken::new(), 3),
        )
        .await
        .expect("drain should terminate")
        .unwrap();
        assert_eq!(report.failed, 4);
        assert_eq!(model.filter_calls.load(Ordering::SeqCst), 4);
        assert_eq!(store.count_articles(Some(ArticleStatus::Pending)).await.unwrap(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn cancellation_mid_drain_returns_partial_counts() {
        let store = seeded_store(20).await;
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let model = Arc::new(ScriptedModel::new(move |n, _| {
            if n == 4 { trigger.cancel(); }
            Ok(r#"{"worth": true}"#.into())
        }));

        let err = processor(&store, &model).drain(&cancel, 3).await.unwrap_err();
        let DrainError::Cancelled(report) = err else { panic!("expected cancellation, got {err}") };
        assert!(report.completed() < 20, "{report:?}");
        assert!(report.completed() >= 4, "{report:?}");
        let terminal = store.articles().iter().filter(|a| a.status.is_terminal()).count();
        assert_eq!(terminal, report.succeeded);
        assert_consistent(&store);
    }

    #[tokio::test]
    async fn terminal_articles_are_never_reopened() {
        let store = seeded_store(3).await;
        let model = Arc::new(ScriptedModel::worth_all());
        processor(&store, &model).drain(&CancellationToken::new(), 10).await.unwrap();
        let before = store.articles();

        let again = processor(&store, &model).drain(&CancellationToken::new(), 10).await.unwrap();
        assert_eq!(again.total_at_start, 0);
        let after = store.articles();
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.status, b.status);
            assert_eq!(a.processed_at, b.processed_at);
        }

        let mut reopened = after[0].clone();
        reopened.status = ArticleStatus::Pending;
        reopened.processed_at = None;
        assert!(store.save_article(&reopened).await.is_err());
    }

    #[tokio::test]
    async fn rows_inserted_mid_drain_are_picked_up() {
        let store = seeded_store(3).await;
        let late = store.clone();
        let model = Arc::new(ScriptedModel::new(move |n, _| {
            if n == 1 {
                let late = late.clone();
                tokio::spawn(async move {
                    late.find_or_create_article(&NewArticle {
                        source_id: 1,
                        title: "late".into(),
                        link: "https://example.com/late".into(),
                        content: "late body".into(),
                        pub_date: Utc::now() + ChronoDuration::hours(1),
                    })
                    .await
                    .unwrap();
                });
            }
            Ok(r#"{"worth": true}"#.into())
        }));

        let report = processor(&store, &model).drain(&CancellationToken::new(), 3).await.unwrap();
        assert_eq!(report.total_at_start, 3);
        assert_eq!(report.succeeded, 4);
        assert_eq!(store.count_articles(Some(ArticleStatus::Pending)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn observer_sees_final_progress() {
        let store = seeded_store(4).await;
        let model = Arc::new(ScriptedModel::worth_all());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let p = processor(&store, &model).with_observer(Arc::new(move |p| sink.lock().unwrap().push(p)));

        p.drain(&CancellationToken::new(), 2).await.unwrap();
        let seen = seen.lock().unwrap();
        let last = seen.last().unwrap();
        assert_eq!((last.done, last.total, last.succeeded, last.failed), (4, 4, 4, 0));
    }
}
