//! The whole analysis: normalize, fuse, cluster, aggregate,
//! re-cluster the targets and report, then write everything out

use crate::aggregate::{aggregate_by_cluster, ClusterTargetTable};
use crate::common::*;
use crate::feature_block::{BlockKind, FeatureTables};
use crate::fusion::fuse_blocks;
use crate::hclust::{hierarchical_clustering, Dendrogram, FlatClusters};
use crate::normalize::{normalize_block, TrustWeights};
use crate::recluster::{recluster_targets, TargetOrdering};
use crate::report::{cluster_means, report_top_targets, top_indices, ReportRecord};
use crate::table_source::SAMPLE_ID_COLUMN;
use matrix_util::membership::order_by_membership;
use std::path::Path;

/// Analysis settings fixed for one run
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub weights: TrustWeights,
    pub num_clusters: usize,
    pub targets: Vec<Box<str>>,
    pub top_n: usize,
    pub n_show: usize,
    pub provenance_marker: Box<str>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            weights: TrustWeights::default(),
            num_clusters: DEFAULT_NUM_CLUSTERS,
            targets: DEFAULT_TARGET_TYPES.iter().map(|&x| x.into()).collect(),
            top_n: DEFAULT_TOP_N,
            n_show: DEFAULT_N_SHOW,
            provenance_marker: DEFAULT_PROVENANCE_MARKER.into(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json(file: &str) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(file)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", file, e))?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Cluster × column means of one block
#[derive(Debug, Clone)]
pub struct ClusterMeans {
    pub kind: BlockKind,
    pub clusters: Vec<usize>,
    pub means: Mat,
}

/// Everything a successful run produces, still in memory
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub clusters: FlatClusters,
    pub sample_tree: Dendrogram,
    pub aggregate: ClusterTargetTable,
    pub target_order: TargetOrdering,
    pub report: Vec<ReportRecord>,
    /// Connectivity columns with the largest totals, descending
    pub top_connectivity: Vec<usize>,
    pub depth_means: ClusterMeans,
    pub spread_means: ClusterMeans,
}

/// Run every stage on aligned tables. Nothing touches the disk here.
pub fn run_pipeline(
    tables: &FeatureTables,
    config: &PipelineConfig,
    observer: &mut dyn StageObserver,
) -> Result<PipelineOutput> {
    info!(
        "{} samples, weights (connectivity, depth, spread) = ({}, {}, {}), k = {}",
        tables.samples().len(),
        config.weights.connectivity,
        config.weights.depth,
        config.weights.spread,
        config.num_clusters
    );

    let normalized = BlockKind::ALL
        .iter()
        .map(|&kind| normalize_block(tables.block(kind), config.weights.of(kind), &mut *observer))
        .collect::<Result<Vec<_>>>()?;

    let fused = fuse_blocks(&normalized.iter().collect::<Vec<_>>())?;

    let (clusters, sample_tree) =
        hierarchical_clustering(&fused.mat, config.num_clusters, observer)?;
    let labels = &clusters.labels;

    let aggregate = aggregate_by_cluster(&tables.connectivity, labels, &config.targets)?;
    let target_order = recluster_targets(&aggregate)?;

    let report = report_top_targets(&tables.connectivity, labels, config.top_n, observer)?;

    let totals = tables.connectivity.mat().column_sums();
    let top_connectivity = top_indices(totals.as_slice(), config.n_show);

    let block_means = |kind: BlockKind| -> Result<ClusterMeans> {
        let (clusters, means) = cluster_means(tables.block(kind).mat(), labels)?;
        Ok(ClusterMeans {
            kind,
            clusters,
            means,
        })
    };
    let depth_means = block_means(BlockKind::Depth)?;
    let spread_means = block_means(BlockKind::Spread)?;

    Ok(PipelineOutput {
        clusters,
        sample_tree,
        aggregate,
        target_order,
        report,
        top_connectivity,
        depth_means,
        spread_means,
    })
}

/// `cluster_N{k}{suffix}` next to the output prefix, where the suffix
/// is the depth table name without its `depth` prefix
pub fn label_file_name(out: &str, num_clusters: usize, depth_origin: &str) -> Box<str> {
    let name = match depth_origin.strip_prefix(BlockKind::Depth.name()) {
        Some(suffix) => format!("cluster_N{}{}", num_clusters, suffix),
        None => format!("cluster_N{}_{}", num_clusters, depth_origin),
    };
    match Path::new(out).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            dir.join(name).to_string_lossy().into_owned().into_boxed_str()
        }
        _ => name.into_boxed_str(),
    }
}

fn delim_for(file: &str) -> &'static str {
    if file.ends_with(".csv") || file.ends_with(".csv.gz") {
        ","
    } else {
        "\t"
    }
}

fn names_of(clusters: &[usize]) -> Vec<Box<str>> {
    clusters
        .iter()
        .map(|c| c.to_string().into_boxed_str())
        .collect()
}

impl PipelineOutput {
    /// Write all outputs; returns the files written.
    ///
    /// * `{out}.target_by_cluster.tsv` - fractions, targets in leaf order
    /// * `{out}.linkage.tsv`, `{out}.target_linkage.tsv` - merge tables
    /// * `{out}.report.json` - ranked features per cluster
    /// * `{out}.connectivity_top.tsv` - top columns, rows grouped by cluster
    /// * `{out}.depth_mean.tsv`, `{out}.spread_mean.tsv`
    /// * `{out}.config.json` - effective settings
    /// * `cluster_N{k}...` - sample labels, written last
    pub fn write_all(
        &self,
        tables: &FeatureTables,
        config: &PipelineConfig,
        out: &str,
    ) -> anyhow::Result<Vec<Box<str>>> {
        io::mkdir(out)?;
        let mut written: Vec<Box<str>> = vec![];

        let file = format!("{}.target_by_cluster.tsv", out);
        self.target_order
            .ordered_fractions(&self.aggregate)
            .write_data_delim(
                &file,
                &self.aggregate.cluster_names(),
                &self.target_order.ordered_targets(&self.aggregate),
                "cluster",
                "\t",
            )?;
        written.push(file.into());

        let file = format!("{}.linkage.tsv", out);
        io::write_lines(&self.sample_tree.to_lines("\t"), &file)?;
        written.push(file.into());

        let file = format!("{}.target_linkage.tsv", out);
        io::write_lines(&self.target_order.tree.to_lines("\t"), &file)?;
        written.push(file.into());

        let file = format!("{}.report.json", out);
        std::fs::write(&file, serde_json::to_string_pretty(&self.report)?)?;
        written.push(file.into());

        let file = format!("{}.connectivity_top.tsv", out);
        self.write_top_connectivity(tables, &file)?;
        written.push(file.into());

        for m in [&self.depth_means, &self.spread_means] {
            let file = format!("{}.{}_mean.tsv", out, m.kind);
            m.means.write_data_delim(
                &file,
                &names_of(&m.clusters),
                tables.block(m.kind).columns(),
                "cluster",
                "\t",
            )?;
            written.push(file.into());
        }

        let file = format!("{}.config.json", out);
        std::fs::write(&file, serde_json::to_string_pretty(config)?)?;
        written.push(file.into());

        // labels last: present only if every other output was written
        let label_file = label_file_name(out, self.clusters.num_clusters, &tables.depth_origin);
        let delim = delim_for(&label_file);
        let lines: Vec<Box<str>> = std::iter::once(
            format!("{}{}cluster", SAMPLE_ID_COLUMN, delim).into_boxed_str(),
        )
        .chain(
            tables
                .samples()
                .iter()
                .zip(self.clusters.labels.iter())
                .map(|(s, l)| format!("{}{}{}", s, delim, l).into_boxed_str()),
        )
        .collect();
        io::write_lines(&lines, &label_file)?;
        written.push(label_file);

        for f in written.iter() {
            debug!("wrote {}", f);
        }
        info!("wrote {} files", written.len());
        Ok(written)
    }

    /// Cluster label followed by the top connectivity columns, one
    /// row per sample, samples grouped by cluster
    fn write_top_connectivity(&self, tables: &FeatureTables, file: &str) -> anyhow::Result<()> {
        let labels = &self.clusters.labels;
        let order = order_by_membership(labels);
        let con = tables.connectivity.mat();

        let mut mat = Mat::zeros(order.len(), self.top_connectivity.len() + 1);
        for (r, &i) in order.iter().enumerate() {
            mat[(r, 0)] = labels[i] as f64;
            for (c, &j) in self.top_connectivity.iter().enumerate() {
                mat[(r, c + 1)] = con[(i, j)];
            }
        }

        let samples = tables.samples();
        let rows: Vec<Box<str>> = order.iter().map(|&i| samples[i].clone()).collect();
        let cols: Vec<Box<str>> = std::iter::once(Box::<str>::from("cluster"))
            .chain(
                self.top_connectivity
                    .iter()
                    .map(|&j| tables.connectivity.columns()[j].clone()),
            )
            .collect();

        mat.write_data_delim(file, &rows, &cols, SAMPLE_ID_COLUMN, "\t")
    }
}
