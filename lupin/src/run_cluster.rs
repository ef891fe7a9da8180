//! `lupin cluster`: cluster neurons on fused connectivity and
//! morphology features

use crate::common::*;
use crate::feature_block::{BlockKind, FeatureTables};
use crate::normalize::TrustWeights;
use crate::observer::LogObserver;
use crate::pipeline::{run_pipeline, PipelineConfig};
use crate::table_source::{CacheDir, FileTables, TableKey, TableSource};

#[derive(Args, Debug)]
pub struct ClusterArgs {
    #[arg(
        long,
        requires_all = ["depth", "spread"],
        conflicts_with = "cache_dir",
        help = "Connectivity table (samples × downstream cell types)",
        long_help = "Connectivity table: one row per neuron, one column per\n\
		     downstream cell type (synapse counts).\n\n\
		     Expected format:\n\
		     - comma or tab separated, header line\n\
		     - a `bodyId` column holding the sample identifier\n\
		     - the file name carries the provenance marker"
    )]
    connectivity: Option<Box<str>>,

    #[arg(
        long,
        requires_all = ["connectivity", "spread"],
        help = "Depth table (samples × depth bins)"
    )]
    depth: Option<Box<str>>,

    #[arg(
        long,
        requires_all = ["connectivity", "depth"],
        help = "Spread table (samples × 3 principal-axis SDs)"
    )]
    spread: Option<Box<str>>,

    #[arg(
        long,
        requires = "filter",
        help = "Cache directory of precomputed tables",
        long_help = "Cache directory laid out as\n\
		     {dir}/connectivity/connectivity_*.csv\n\
		     {dir}/depth/depth_*.csv\n\
		     {dir}/spread/spread_*.csv\n\n\
		     Tables are picked by --filter; exactly one table of each\n\
		     kind must match. The spread table is the one named after\n\
		     the chosen depth table."
    )]
    cache_dir: Option<Box<str>>,

    #[arg(long, help = "Substring selecting the cached tables")]
    filter: Option<Box<str>>,

    #[arg(
        long,
        default_value = "5,3,1",
        help = "Trust weights of connectivity, depth, spread",
        long_help = "Trust weights for connectivity, depth and spread.\n\
		     Each block is divided by its total dispersion and then\n\
		     multiplied by its weight before the blocks are fused."
    )]
    weights: TrustWeights,

    #[arg(
        long,
        short = 'k',
        default_value_t = DEFAULT_NUM_CLUSTERS,
        help = "Number of clusters"
    )]
    num_clusters: usize,

    #[arg(
        long,
        value_delimiter = ',',
        conflicts_with = "targets_file",
        help = "Target cell types (comma separated)",
        long_help = "Downstream cell types whose input is aggregated by cluster.\n\
		     Defaults to the lobula columnar (LC) and LPLC types."
    )]
    targets: Option<Vec<Box<str>>>,

    #[arg(long, help = "File listing target cell types, one per line")]
    targets_file: Option<Box<str>>,

    #[arg(
        long,
        default_value_t = DEFAULT_TOP_N,
        help = "Number of top features reported per cluster"
    )]
    top_n: usize,

    #[arg(
        long,
        default_value_t = DEFAULT_N_SHOW,
        help = "Number of high-total connectivity columns to export"
    )]
    n_show: usize,

    #[arg(
        long,
        default_value = DEFAULT_PROVENANCE_MARKER,
        help = "Marker where the provenance tag starts in table names"
    )]
    provenance_marker: Box<str>,

    #[arg(
        long,
        help = "JSON file with analysis settings",
        long_help = "JSON file with analysis settings (weights, num_clusters,\n\
		     targets, top_n, n_show, provenance_marker).\n\
		     Missing fields take their defaults; the file replaces\n\
		     the corresponding command line options."
    )]
    config: Option<Box<str>>,

    #[arg(
        long,
        short = 'o',
        required = true,
        help = "Output file prefix",
        long_help = "Output file prefix.\n\n\
		     Generates:\n\
		     - cluster_N{k}{depth suffix}: sample labels (next to the prefix)\n\
		     - {out}.target_by_cluster.tsv: cluster × target fractions\n\
		     - {out}.linkage.tsv, {out}.target_linkage.tsv: merge trees\n\
		     - {out}.report.json: top features per cluster\n\
		     - {out}.connectivity_top.tsv: high-total columns by cluster\n\
		     - {out}.depth_mean.tsv, {out}.spread_mean.tsv\n\
		     - {out}.config.json: effective settings"
    )]
    out: Box<str>,

    #[arg(long, short = 'v', help = "Verbose output with cluster statistics")]
    verbose: bool,
}

impl ClusterArgs {
    fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        if let Some(file) = self.config.as_deref() {
            info!("Reading settings from {}", file);
            return PipelineConfig::from_json(file);
        }

        let targets = match (&self.targets, self.targets_file.as_deref()) {
            (Some(targets), _) => targets.clone(),
            (None, Some(file)) => read_target_names(file)?,
            (None, None) => PipelineConfig::default().targets,
        };

        Ok(PipelineConfig {
            weights: self.weights,
            num_clusters: self.num_clusters,
            targets,
            top_n: self.top_n,
            n_show: self.n_show,
            provenance_marker: self.provenance_marker.clone(),
        })
    }

    fn load_tables(&self, marker: &str) -> anyhow::Result<FeatureTables> {
        let [connectivity, depth, spread] = match (&self.cache_dir, &self.filter) {
            (Some(dir), Some(filter)) => CacheDir::new(&**dir).resolve_all(filter)?,
            _ => {
                let files = match (&self.connectivity, &self.depth, &self.spread) {
                    (Some(c), Some(d), Some(s)) => FileTables {
                        connectivity: c.clone(),
                        depth: d.clone(),
                        spread: s.clone(),
                    },
                    _ => anyhow::bail!(
                        "either --cache-dir with --filter, or all of \
                         --connectivity, --depth and --spread"
                    ),
                };
                let [c, d, s] = BlockKind::ALL.map(|kind| {
                    files.resolve(&TableKey {
                        kind,
                        filter: "".into(),
                    })
                });
                [c?, d?, s?]
            }
        };
        Ok(FeatureTables::aligned(connectivity, depth, spread, marker)?)
    }
}

/// One name per line; blank and `#` lines are skipped
fn read_target_names(file: &str) -> anyhow::Result<Vec<Box<str>>> {
    let names: Vec<Box<str>> = io::read_lines(file)?
        .iter()
        .map(|x| x.trim())
        .filter(|x| !x.is_empty() && !x.starts_with('#'))
        .map(Box::from)
        .collect();
    if names.is_empty() {
        anyhow::bail!("no target cell types in {}", file);
    }
    Ok(names)
}

pub fn run_cluster(args: &ClusterArgs) -> anyhow::Result<()> {
    let config = args.pipeline_config()?;
    let tables = args.load_tables(&config.provenance_marker)?;

    info!("Running the clustering pipeline with k={}", config.num_clusters);
    let output = run_pipeline(&tables, &config, &mut LogObserver)?;

    if args.verbose {
        eprintln!();
        eprintln!("{}", output.clusters.histogram_ascii(50, config.num_clusters));
        eprintln!();
    }

    let written = output.write_all(&tables, &config, &args.out)?;
    info!("Wrote {} output files with prefix {}", written.len(), args.out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        args: ClusterArgs,
    }

    #[test]
    fn parses_weights_and_targets() -> anyhow::Result<()> {
        let cli = TestCli::try_parse_from([
            "lupin",
            "--cache-dir",
            "cache",
            "--filter",
            "bodyidlist_ub1000",
            "--weights",
            "1,2,3",
            "--targets",
            "LC4,LPLC2",
            "-k",
            "8",
            "-o",
            "out/run",
        ])?;
        let config = cli.args.pipeline_config()?;
        assert_eq!(config.weights.depth, 2.0);
        assert_eq!(config.num_clusters, 8);
        assert_eq!(config.targets, vec![Box::<str>::from("LC4"), "LPLC2".into()]);
        assert_eq!(&*config.provenance_marker, DEFAULT_PROVENANCE_MARKER);
        Ok(())
    }

    #[test]
    fn cache_dir_conflicts_with_files() {
        let r = TestCli::try_parse_from([
            "lupin",
            "--cache-dir",
            "cache",
            "--filter",
            "x",
            "--connectivity",
            "c.csv",
            "--depth",
            "d.csv",
            "--spread",
            "s.csv",
            "-o",
            "out",
        ]);
        assert!(r.is_err());
    }

    #[test]
    fn default_targets_are_the_lc_types() -> anyhow::Result<()> {
        let cli = TestCli::try_parse_from(["lupin", "-o", "out"])?;
        let config = cli.args.pipeline_config()?;
        assert_eq!(config.targets.len(), DEFAULT_TARGET_TYPES.len());
        assert_eq!(config.weights, TrustWeights::default());
        Ok(())
    }
}
