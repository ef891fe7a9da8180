use lupin::common::*;
use lupin::run_cluster::*;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "LUPIN",
    long_about = "Lobula neuron clustering by fused connectivity and morphology.\n\
		  Connectivity, depth and spread tables are normalized by their\n\
		  total dispersion, weighted, concatenated and clustered by Ward\n\
		  linkage; the clusters are then summarized against a set of\n\
		  downstream target cell types."
)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Cluster neurons on fused feature blocks",
        long_about = "Cluster neurons in four stages: \n\
		      (1) Normalize each feature block by its total dispersion\n\
		      (2) Fuse the weighted blocks and cut a Ward tree into k clusters\n\
		      (3) Aggregate connectivity to the target types by cluster\n\
		      (4) Re-cluster the targets and report top features per cluster.\n"
    )]
    Cluster(ClusterArgs),
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match &cli.commands {
        Commands::Cluster(args) => {
            run_cluster(args)?;
        }
    }

    info!("Done");
    Ok(())
}
