use crate::error::{PackError, Result};
use simlog_indexer::{timeline_level, LoadLimiter};
use simlog_protocol::{
    Level, LoadFailureKind, LoadWarning, LogbookCategory, Run, RunId, SimDataPack,
    TabularDataset,
};
use simlog_tabular::{ResourceLocation, TabularError, TabularLoader};
use std::collections::BTreeMap;
use std::time::Instant;
use tokio::task::JoinSet;

/// Where a loaded dataset lands in the pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LoadSlot {
    Lift,
    Passenger,
    Timeline(Level),
}

impl LoadSlot {
    pub fn category(&self) -> LogbookCategory {
        match self {
            Self::Lift => LogbookCategory::Lift,
            Self::Passenger => LogbookCategory::Passenger,
            Self::Timeline(_) => LogbookCategory::Timeline,
        }
    }

    pub fn level(&self) -> Option<&str> {
        match self {
            Self::Timeline(level) => Some(level),
            Self::Lift | Self::Passenger => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoadJob {
    pub run_id: RunId,
    pub slot: LoadSlot,
    pub file: String,
}

/// Lift and passenger logbooks use the first listed file only; every timeline
/// file is loaded and keyed by its level.
pub(crate) fn plan_loads(runs: &BTreeMap<RunId, Run>) -> Vec<LoadJob> {
    let mut jobs = Vec::new();
    for (run_id, run) in runs {
        for (slot, files) in [
            (LoadSlot::Lift, &run.lift_logbooks),
            (LoadSlot::Passenger, &run.passenger_logbooks),
        ] {
            if let Some(file) = files.first() {
                jobs.push(LoadJob {
                    run_id: run_id.clone(),
                    slot,
                    file: file.clone(),
                });
            }
        }
        for file in &run.timeline_logbooks {
            jobs.push(LoadJob {
                run_id: run_id.clone(),
                slot: LoadSlot::Timeline(timeline_level(file)),
                file: file.clone(),
            });
        }
    }
    jobs
}

/// Assembles a [`SimDataPack`] from many independent file loads.
///
/// A failed load never fails the pack: the slot stays absent and a
/// [`LoadWarning`] describes what went wrong.
#[derive(Clone)]
pub struct PackAggregator {
    loader: TabularLoader,
    limiter: LoadLimiter,
}

impl PackAggregator {
    pub fn new(loader: TabularLoader, limiter: LoadLimiter) -> Self {
        Self { loader, limiter }
    }

    pub async fn aggregate(
        &self,
        runs: &BTreeMap<RunId, Run>,
        base: &ResourceLocation,
    ) -> Result<SimDataPack> {
        let started = Instant::now();
        let jobs = plan_loads(runs);

        let mut join = JoinSet::new();
        for (idx, job) in jobs.iter().enumerate() {
            let location = base.join(&job.run_id).join(&job.file);
            let loader = self.loader.clone();
            let limiter = self.limiter.clone();
            join.spawn(async move {
                let outcome = match limiter.acquire().await {
                    Ok(_permit) => loader.load(&location).await,
                    Err(err) => Err(TabularError::Task(err.to_string())),
                };
                (idx, outcome)
            });
        }

        let mut outcomes: Vec<Option<std::result::Result<TabularDataset, TabularError>>> =
            (0..jobs.len()).map(|_| None).collect();
        while let Some(joined) = join.join_next().await {
            let (idx, outcome) = joined.map_err(|err| PackError::Internal(err.to_string()))?;
            outcomes[idx] = Some(outcome);
        }

        let mut pack = SimDataPack::default();
        for (job, outcome) in jobs.into_iter().zip(outcomes) {
            match outcome {
                Some(Ok(dataset)) => insert_dataset(&mut pack, job, dataset),
                Some(Err(err)) => {
                    log::warn!(
                        "Skipping {} logbook {} for run {}: {err}",
                        job.slot.category(),
                        job.file,
                        job.run_id
                    );
                    pack.warnings.push(warning(job, err.failure_kind(), err.to_string()));
                }
                None => {
                    return Err(PackError::Internal(format!(
                        "no result for {} of run {}",
                        job.file, job.run_id
                    )))
                }
            }
        }

        log::info!(
            "Aggregated {} datasets for {} runs in {} ms ({} warnings)",
            pack.dataset_count(),
            runs.len(),
            started.elapsed().as_millis(),
            pack.warnings.len()
        );
        Ok(pack)
    }
}

fn insert_dataset(pack: &mut SimDataPack, job: LoadJob, dataset: TabularDataset) {
    match &job.slot {
        LoadSlot::Timeline(level) => {
            let replaced = pack
                .timeline_logbooks
                .entry(job.run_id.clone())
                .or_default()
                .insert(level.clone(), dataset);
            if replaced.is_some() {
                let message = format!(
                    "level `{level}` is provided by several files; using {}",
                    job.file
                );
                pack.warnings.push(warning(job, LoadFailureKind::DuplicateLevel, message));
            }
        }
        LoadSlot::Lift => {
            pack.lift_logbooks.insert(job.run_id, dataset);
        }
        LoadSlot::Passenger => {
            pack.passenger_logbooks.insert(job.run_id, dataset);
        }
    }
}

fn warning(job: LoadJob, kind: LoadFailureKind, message: String) -> LoadWarning {
    LoadWarning {
        category: job.slot.category(),
        level: job.slot.level().map(str::to_string),
        run_id: job.run_id,
        file: job.file,
        kind,
        message,
    }
}
