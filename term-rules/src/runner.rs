//! Assessment passes over a dataset.
//!
//! [`RuleAssessmentRunner`] assesses many rules with a single scan: one
//! reader thread broadcasts every record over bounded channels to a set of
//! worker threads, each owning the assessors of a contiguous slice of the
//! rules. Full channels block the reader. Every thread is dedicated to the
//! pass and reports back over a oneshot channel, so a pass never waits on
//! the runtime's blocking pool.
//!
//! [`RuleAssessmentSession`] is the synchronous, re-entrant form: the caller
//! pushes records one at a time and finalizes whenever it likes.
//!
//! Both stop at the first error. A pass can be cancelled through a
//! `watch::Receiver<bool>`; workers check it between records and the pass
//! then fails with [`MiningError::Cancelled`].

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, instrument, warn};

use crate::aggregator::AggregatorSpec;
use crate::assessment::Assessment;
use crate::assessor::{RuleAssessment, RuleAssessor};
use crate::dataset::Dataset;
use crate::error::{MiningError, Result};
use crate::goal::Goal;
use crate::rule::Rule;
use crate::value::Record;

/// Default capacity of each worker's record channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Upper bound on worker threads per pass.
pub const MAX_WORKERS: usize = 256;

/// Configuration for [`RuleAssessmentRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Maximum number of worker threads, capped at [`MAX_WORKERS`].
    pub num_workers: usize,
    /// Records buffered per worker before the reader blocks.
    pub channel_capacity: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl RunnerConfig {
    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

/// Runs assessment passes on dedicated worker threads.
#[derive(Debug, Clone, Default)]
pub struct RuleAssessmentRunner {
    config: RunnerConfig,
}

impl RuleAssessmentRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Assesses `rules` against every record of `dataset`.
    ///
    /// The rule assessments keep the order of `rules`. The assessment is
    /// neither sorted nor refined.
    #[instrument(skip_all, fields(num_rules = rules.len(), num_workers = tracing::field::Empty))]
    pub async fn assess(
        &self,
        dataset: Arc<dyn Dataset>,
        rules: Vec<Rule>,
        specs: &[Arc<AggregatorSpec>],
        goals: Arc<[Goal]>,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<Assessment> {
        let num_workers = self
            .config
            .num_workers
            .clamp(1, rules.len().clamp(1, MAX_WORKERS));
        tracing::Span::current().record("num_workers", num_workers);
        let chunk_size = ((rules.len() + num_workers - 1) / num_workers).max(1);
        let capacity = self.config.channel_capacity.max(1);

        let mut senders = Vec::with_capacity(num_workers);
        let mut workers = Vec::with_capacity(num_workers);
        let mut rules = rules.into_iter().peekable();
        let mut worker_id = 0usize;
        while rules.peek().is_some() {
            let chunk: Vec<Rule> = rules.by_ref().take(chunk_size).collect();
            let assessors: Vec<RuleAssessor> = chunk
                .into_iter()
                .map(|r| RuleAssessor::new(r, specs, goals.clone()))
                .collect();
            let (tx, rx) = mpsc::channel::<Arc<Record>>(capacity);
            senders.push(tx);
            let cancel = cancel.clone();
            let id = worker_id;
            workers.push(spawn_thread(format!("term-rules-worker-{id}"), move || {
                run_worker(id, assessors, rx, cancel)
            })?);
            worker_id += 1;
        }

        let reader = {
            let cancel = cancel.clone();
            spawn_thread("term-rules-reader".to_string(), move || {
                read_records(dataset.as_ref(), senders, cancel)
            })?
        };

        let mut first_error: Option<MiningError> = None;
        let mut rule_assessments: Vec<RuleAssessment> = Vec::new();
        for worker in workers {
            match join_thread(worker).await? {
                Ok(mut ras) => rule_assessments.append(&mut ras),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        let read = join_thread(reader).await?;

        // A failing worker makes the reader stop early, so its error wins.
        if let Some(e) = first_error {
            warn!(error = %e, "assessment pass failed");
            return Err(e);
        }
        let num_records = read?;
        info!(
            num_records,
            num_rule_assessments = rule_assessments.len(),
            "assessment pass complete"
        );
        Ok(Assessment::with_rule_assessments(
            num_records,
            rule_assessments,
        ))
    }
}

type ThreadHandle<T> = (String, oneshot::Receiver<T>);

fn spawn_thread<T, F>(name: String, f: F) -> Result<ThreadHandle<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    std::thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            // The receiver is gone only if the pass was dropped.
            let _ = tx.send(f());
        })
        .map_err(|e| MiningError::Internal(format!("failed to spawn {name}: {e}")))?;
    Ok((name, rx))
}

async fn join_thread<T>((name, rx): ThreadHandle<T>) -> Result<T> {
    rx.await
        .map_err(|_| MiningError::Internal(format!("{name} terminated without a result")))
}

fn is_cancelled(cancel: &Option<watch::Receiver<bool>>) -> bool {
    cancel.as_ref().is_some_and(|c| *c.borrow())
}

/// Streams the dataset to every worker. Returns the number of records read.
fn read_records(
    dataset: &dyn Dataset,
    senders: Vec<mpsc::Sender<Arc<Record>>>,
    cancel: Option<watch::Receiver<bool>>,
) -> Result<u64> {
    let mut conn = dataset.open()?;
    let mut num_records = 0u64;
    for record in conn.by_ref() {
        if is_cancelled(&cancel) {
            return Err(MiningError::Cancelled);
        }
        let record = Arc::new(record?);
        for tx in &senders {
            if tx.blocking_send(record.clone()).is_err() {
                debug!("worker stopped, ending scan");
                return Ok(num_records);
            }
        }
        num_records += 1;
    }
    conn.close()?;
    Ok(num_records)
}

fn run_worker(
    id: usize,
    mut assessors: Vec<RuleAssessor>,
    mut rx: mpsc::Receiver<Arc<Record>>,
    cancel: Option<watch::Receiver<bool>>,
) -> Result<Vec<RuleAssessment>> {
    let mut num_records = 0u64;
    while let Some(record) = rx.blocking_recv() {
        if is_cancelled(&cancel) {
            return Err(MiningError::Cancelled);
        }
        for assessor in &mut assessors {
            assessor.next_record(&record)?;
        }
        num_records += 1;
    }
    debug!(worker = id, num_records, num_rules = assessors.len(), "worker finished");
    assessors.iter().map(|a| a.finalize(num_records)).collect()
}

/// Assesses a fixed set of rules record by record.
///
/// Rules can only be added before the first record. [`update`] finalizes
/// the current state into an [`Assessment`], which is then served by
/// [`assessment`] until more records arrive.
///
/// [`update`]: RuleAssessmentSession::update
/// [`assessment`]: RuleAssessmentSession::assessment
#[derive(Debug, Clone)]
pub struct RuleAssessmentSession {
    specs: Vec<Arc<AggregatorSpec>>,
    goals: Arc<[Goal]>,
    assessors: Vec<RuleAssessor>,
    num_records: u64,
    assessment: Option<Assessment>,
}

impl RuleAssessmentSession {
    pub fn new(specs: Vec<Arc<AggregatorSpec>>, goals: Arc<[Goal]>) -> Self {
        Self {
            specs,
            goals,
            assessors: Vec::new(),
            num_records: 0,
            assessment: None,
        }
    }

    pub fn add_rules(&mut self, rules: impl IntoIterator<Item = Rule>) -> Result<()> {
        if self.num_records > 0 {
            return Err(MiningError::InvalidState(
                "can't add rules after records have been processed".to_string(),
            ));
        }
        let (specs, goals) = (&self.specs, &self.goals);
        self.assessors
            .extend(rules.into_iter().map(|r| RuleAssessor::new(r, specs, goals.clone())));
        self.assessment = None;
        Ok(())
    }

    pub fn process_record(&mut self, record: &Record) -> Result<()> {
        for assessor in &mut self.assessors {
            assessor.next_record(record)?;
        }
        self.num_records += 1;
        self.assessment = None;
        Ok(())
    }

    /// Finalizes every rule over the records processed so far.
    pub fn update(&mut self) -> Result<&Assessment> {
        let rule_assessments = self
            .assessors
            .iter()
            .map(|a| a.finalize(self.num_records))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.assessment.insert(Assessment::with_rule_assessments(
            self.num_records,
            rule_assessments,
        )))
    }

    /// The assessment from the last [`update`](Self::update), if no records
    /// have been processed since.
    pub fn assessment(&self) -> Option<&Assessment> {
        self.assessment.as_ref()
    }

    pub fn num_records(&self) -> u64 {
        self.num_records
    }

    pub fn num_rules(&self) -> usize {
        self.assessors.len()
    }
}
