//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop, which runs in two states:
//! - Seeding: the seed URL is extracted directly, once per run
//! - Draining: unvisited URLs are claimed in batches, each batch is marked
//!   visited and then processed by a bounded pool of concurrent workers, and
//!   the next batch starts only after every worker of the current one is done

use crate::config::{Config, CrawlerConfig};
use crate::crawler::extractor::Extractor;
use crate::crawler::parser::ParsedPage;
use crate::state::FailureDisposition;
use crate::storage::{
    open_stores, ArticleStore, FrontierStore, SqliteArticles, SqliteFrontier, StorageError,
    StorageResult,
};
use crate::HarvestError;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Step of a URL's processing at which it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStage {
    Extract,
    StoreArticle,
    MarkScraped,
    InsertLinks,
    /// The worker ended without reporting an outcome
    Worker,
}

impl fmt::Display for TaskStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Self::Extract => "extract",
            Self::StoreArticle => "store article",
            Self::MarkScraped => "mark scraped",
            Self::InsertLinks => "insert links",
            Self::Worker => "worker",
        };
        write!(f, "{}", stage)
    }
}

/// Result of processing one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Article stored and URL marked scraped
    Scraped { url: String, links_inserted: usize },

    /// Processing stopped early; the failure policy decided the URL's fate
    Failed {
        url: String,
        stage: TaskStage,
        disposition: FailureDisposition,
    },
}

impl TaskOutcome {
    pub fn url(&self) -> &str {
        match self {
            Self::Scraped { url, .. } | Self::Failed { url, .. } => url,
        }
    }
}

struct TaskFailure {
    stage: TaskStage,
    error: HarvestError,
}

impl TaskFailure {
    fn at(stage: TaskStage) -> impl FnOnce(HarvestError) -> Self {
        move |error| Self { stage, error }
    }
}

/// Totals for a crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// The seed page was extracted and stored during Seeding
    pub seeded: bool,
    /// Batches claimed during Draining
    pub batches: u64,
    pub scraped: u64,
    pub failed: u64,
    /// Failures that were returned to the frontier
    pub requeued: u64,
    /// New frontier rows created from discovered links
    pub links_inserted: u64,
    /// Draining stopped because no unvisited URL was left
    pub exhausted: bool,
}

impl CrawlReport {
    fn record(&mut self, outcome: &TaskOutcome) {
        match outcome {
            TaskOutcome::Scraped { links_inserted, .. } => {
                self.scraped += 1;
                self.links_inserted += *links_inserted as u64;
            }
            TaskOutcome::Failed { disposition, .. } => {
                self.failed += 1;
                if *disposition == FailureDisposition::Requeued {
                    self.requeued += 1;
                }
            }
        }
    }
}

/// Main crawler coordinator structure
///
/// Both stores are owned here and shared with workers; each store call locks
/// its mutex for the duration of that call only.
pub struct Crawler<F = SqliteFrontier, A = SqliteArticles> {
    config: Arc<CrawlerConfig>,
    frontier: Arc<Mutex<F>>,
    articles: Arc<Mutex<A>>,
    extractor: Arc<Extractor>,
    workers: Arc<Semaphore>,
}

impl<F, A> Clone for Crawler<F, A> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            frontier: Arc::clone(&self.frontier),
            articles: Arc::clone(&self.articles),
            extractor: Arc::clone(&self.extractor),
            workers: Arc::clone(&self.workers),
        }
    }
}

impl Crawler<SqliteFrontier, SqliteArticles> {
    /// Opens the configured databases and builds a crawler over them
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Stores opened and HTTP client built
    /// * `Err(HarvestError)` - A store could not be opened (fatal)
    pub fn open(config: &Config) -> Result<Self, HarvestError> {
        let (frontier, articles) = open_stores(&config.output)?;
        Self::new(config, frontier, articles)
    }
}

impl<F, A> Crawler<F, A>
where
    F: FrontierStore + Send + 'static,
    A: ArticleStore + Send + 'static,
{
    /// Creates a crawler over already-opened stores
    pub fn new(config: &Config, frontier: F, articles: A) -> Result<Self, HarvestError> {
        let extractor = Extractor::new(config)?;
        Ok(Self::with_extractor(config, frontier, articles, extractor))
    }

    /// Creates a crawler with a caller-built extractor
    pub fn with_extractor(config: &Config, frontier: F, articles: A, extractor: Extractor) -> Self {
        Self {
            config: Arc::new(config.crawler.clone()),
            frontier: Arc::new(Mutex::new(frontier)),
            articles: Arc::new(Mutex::new(articles)),
            extractor: Arc::new(extractor),
            workers: Arc::new(Semaphore::new(config.crawler.worker_count)),
        }
    }

    /// Shared handle to the frontier store
    pub fn frontier(&self) -> &Arc<Mutex<F>> {
        &self.frontier
    }

    /// Shared handle to the article store
    pub fn articles(&self) -> &Arc<Mutex<A>> {
        &self.articles
    }

    /// Runs a full crawl: Seeding, then Draining until the frontier is exhausted
    ///
    /// Only a failure to seed the frontier is returned as an error. Every other
    /// failure is logged and the crawl carries on.
    pub async fn run(&self) -> Result<CrawlReport, HarvestError> {
        let start_time = Instant::now();
        let mut report = CrawlReport::default();

        let seed_url = self.config.seed_url.clone();
        if self.with_frontier(move |f| f.seed(&seed_url)).await? {
            tracing::info!("Seeded empty frontier with {}", self.config.seed_url);
        }

        let policy = self.config.failure_policy;
        match self
            .with_frontier(move |f| f.reclaim_unfinished(policy))
            .await
        {
            Ok(0) => {}
            Ok(reclaimed) => {
                tracing::info!("Returned {} unfinished URLs to the frontier", reclaimed)
            }
            Err(e) => tracing::error!("Error reclaiming unfinished URLs: {}", e),
        }

        if let Some(links_inserted) = self.crawl_seed().await {
            report.seeded = true;
            report.scraped += 1;
            report.links_inserted += links_inserted as u64;
        }

        self.drain(&mut report).await;

        tracing::info!(
            "Crawl finished in {:?}: {} batches, {} scraped, {} failed ({} requeued), {} new URLs",
            start_time.elapsed(),
            report.batches,
            report.scraped,
            report.failed,
            report.requeued,
            report.links_inserted
        );

        Ok(report)
    }

    /// Seeding state: extracts the seed URL directly, with no batching
    ///
    /// On success the seed is marked scraped, so no batch fetches it again. On
    /// failure it is left as it was and Draining picks it up if still unvisited.
    ///
    /// Returns the number of new frontier URLs, or None if seeding failed.
    pub async fn crawl_seed(&self) -> Option<usize> {
        let seed_url = self.config.seed_url.as_str();

        match self.scrape(seed_url).await {
            Ok(links_inserted) => {
                tracing::info!(
                    "Seed {} processed, {} new URLs discovered",
                    seed_url,
                    links_inserted
                );
                Some(links_inserted)
            }
            Err(failure) => {
                tracing::warn!(
                    "Seeding failed at {} for {}: {}",
                    failure.stage,
                    seed_url,
                    failure.error
                );
                None
            }
        }
    }

    /// Draining state: processes batches until the frontier yields nothing
    ///
    /// A store error while claiming a batch skips the pass; the same frontier
    /// state is retried after one poll interval.
    pub async fn drain(&self, report: &mut CrawlReport) {
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let limit = self.config.batch_size;

        loop {
            if let Some(max_batches) = self.config.max_batches {
                if report.batches >= max_batches {
                    tracing::info!("Reached batch limit of {}, stopping", max_batches);
                    return;
                }
            }

            let batch = match self.with_frontier(move |f| f.next_batch(limit)).await {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::error!("Error getting next URLs: {}", e);
                    tokio::time::sleep(poll_interval).await;
                    continue;
                }
            };

            if batch.is_empty() {
                tracing::info!("No more URLs to process");
                report.exhausted = true;
                return;
            }

            // Claim the whole batch before any worker starts
            let claimed = batch.clone();
            if let Err(e) = self
                .with_frontier(move |f| f.mark_visited(&claimed))
                .await
            {
                tracing::error!("Error marking {} URLs as visited: {}", batch.len(), e);
                tokio::time::sleep(poll_interval).await;
                continue;
            }

            report.batches += 1;
            let batch_len = batch.len();
            let outcomes = self.run_batch(batch).await;

            let failed = outcomes
                .iter()
                .filter(|o| matches!(o, TaskOutcome::Failed { .. }))
                .count();
            for outcome in &outcomes {
                report.record(outcome);
            }

            tracing::info!(
                "Batch {} done: {} URLs, {} failed, {} scraped so far",
                report.batches,
                batch_len,
                failed,
                report.scraped
            );

            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Processes every URL of a claimed batch and waits for all of them
    async fn run_batch(&self, urls: Vec<String>) -> Vec<TaskOutcome> {
        let mut tasks = JoinSet::new();

        for url in urls.iter().cloned() {
            let worker = self.clone();
            let permits = Arc::clone(&self.workers);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                worker.process_url(url).await
            });
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!("Worker task did not complete: {}", e),
            }
        }

        self.settle_unfinished(&urls, &mut outcomes).await;
        outcomes
    }

    /// Records a failure for every claimed URL whose worker ended without an outcome
    async fn settle_unfinished(&self, claimed: &[String], outcomes: &mut Vec<TaskOutcome>) {
        let finished: HashSet<&str> = outcomes.iter().map(TaskOutcome::url).collect();
        let unfinished: Vec<String> = claimed
            .iter()
            .filter(|url| !finished.contains(url.as_str()))
            .cloned()
            .collect();

        for url in unfinished {
            outcomes.push(self.fail(url, TaskStage::Worker).await);
        }
    }

    /// Processes one claimed URL; every path ends in exactly one outcome
    async fn process_url(self, url: String) -> TaskOutcome {
        tracing::debug!("Processing URL: {}", url);

        match self.scrape(&url).await {
            Ok(links_inserted) => TaskOutcome::Scraped {
                url,
                links_inserted,
            },
            Err(failure) => {
                if failure.error.is_page_error() {
                    tracing::warn!("Error while requesting {}: {}", url, failure.error);
                } else {
                    tracing::error!(
                        "Error at {} for {}: {}",
                        failure.stage,
                        url,
                        failure.error
                    );
                }

                self.fail(url, failure.stage).await
            }
        }
    }

    /// Applies the failure policy to a claimed URL
    async fn fail(&self, url: String, stage: TaskStage) -> TaskOutcome {
        let policy = self.config.failure_policy;
        let failed_url = url.clone();
        let disposition = match self
            .with_frontier(move |f| f.record_failure(&failed_url, policy))
            .await
        {
            Ok(disposition) => disposition,
            Err(e) => {
                tracing::error!("Error recording failure for {}: {}", url, e);
                FailureDisposition::Abandoned
            }
        };

        if disposition == FailureDisposition::Requeued {
            tracing::debug!("Returned {} to the frontier", url);
        }

        TaskOutcome::Failed {
            url,
            stage,
            disposition,
        }
    }

    /// Extracts a page, stores its article, marks it scraped and records its links
    async fn scrape(&self, url: &str) -> Result<usize, TaskFailure> {
        let ParsedPage { article, links } = self
            .extractor
            .extract(url)
            .await
            .map_err(TaskFailure::at(TaskStage::Extract))?;

        let stored = self
            .with_articles(move |a| a.insert_if_absent(&article))
            .await
            .map_err(TaskFailure::at(TaskStage::StoreArticle))?;
        if !stored {
            tracing::debug!("Article for {} already stored", url);
        }

        let scraped_url = url.to_string();
        self.with_frontier(move |f| f.mark_scraped(&scraped_url))
            .await
            .map_err(TaskFailure::at(TaskStage::MarkScraped))?;

        if links.is_empty() {
            return Ok(0);
        }

        self.with_frontier(move |f| f.insert_if_absent(&links))
            .await
            .map_err(TaskFailure::at(TaskStage::InsertLinks))
    }

    /// Runs one frontier call on the blocking pool
    async fn with_frontier<T, Op>(&self, op: Op) -> Result<T, HarvestError>
    where
        T: Send + 'static,
        Op: FnOnce(&mut F) -> StorageResult<T> + Send + 'static,
    {
        let frontier = Arc::clone(&self.frontier);
        run_blocking(move || {
            let mut frontier = frontier
                .lock()
                .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
            op(&mut *frontier)
        })
        .await
    }

    /// Runs one article store call on the blocking pool
    async fn with_articles<T, Op>(&self, op: Op) -> Result<T, HarvestError>
    where
        T: Send + 'static,
        Op: FnOnce(&mut A) -> StorageResult<T> + Send + 'static,
    {
        let articles = Arc::clone(&self.articles);
        run_blocking(move || {
            let mut articles = articles
                .lock()
                .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
            op(&mut *articles)
        })
        .await
    }
}

/// SQLite calls block, so they stay off the async worker threads
async fn run_blocking<T, Op>(op: Op) -> Result<T, HarvestError>
where
    T: Send + 'static,
    Op: FnOnce() -> StorageResult<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(op).await {
        Ok(result) => Ok(result?),
        Err(e) => Err(StorageError::Interrupted(e.to_string()).into()),
    }
}
