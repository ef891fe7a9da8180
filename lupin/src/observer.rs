//! Progress and diagnostics sink injected into each stage

use crate::feature_block::BlockKind;
use crate::report::ReportRecord;

/// Receives what each stage wants the analyst to see. Stages never
/// print directly; they tell the observer.
pub trait StageObserver {
    /// Total dispersion of a feature block, before weighting
    fn dispersion(&mut self, _block: BlockKind, _value: f64) {}

    /// Sizes of the flat clusters, indexed by `label - 1`
    fn clusters(&mut self, _sizes: &[usize]) {}

    /// One ranked feature of the diagnostic report
    fn report(&mut self, _record: &ReportRecord) {}

    /// Free-form progress message
    fn message(&mut self, _msg: &str) {}
}

/// Forwards everything to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl StageObserver for LogObserver {
    fn dispersion(&mut self, block: BlockKind, value: f64) {
        log::info!("total dispersion of {}: {}", block, value);
    }

    fn clusters(&mut self, sizes: &[usize]) {
        let min_size = sizes.iter().copied().min().unwrap_or(0);
        let max_size = sizes.iter().copied().max().unwrap_or(0);
        log::info!(
            "{} clusters, cluster sizes min={} max={}",
            sizes.len(),
            min_size,
            max_size
        );
    }

    fn report(&mut self, r: &ReportRecord) {
        log::info!(
            "cluster #{} - target #{} {} mean synapse count: {:.2}",
            r.cluster,
            r.rank,
            r.feature,
            r.mean
        );
    }

    fn message(&mut self, msg: &str) {
        log::info!("{}", msg);
    }
}

/// Keeps every event in memory
#[derive(Debug, Default, Clone)]
pub struct CollectObserver {
    pub dispersions: Vec<(BlockKind, f64)>,
    pub cluster_sizes: Vec<Vec<usize>>,
    pub records: Vec<ReportRecord>,
    pub messages: Vec<String>,
}

impl StageObserver for CollectObserver {
    fn dispersion(&mut self, block: BlockKind, value: f64) {
        self.dispersions.push((block, value));
    }

    fn clusters(&mut self, sizes: &[usize]) {
        self.cluster_sizes.push(sizes.to_vec());
    }

    fn report(&mut self, record: &ReportRecord) {
        self.records.push(record.clone());
    }

    fn message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }
}
