use crate::cli::EnumerateArgs;
use crate::config::PartialAppConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use alloysite::{
    engine::{progress::ProgressReporter, regression::WeightVector},
    workflows,
};
use tracing::info;

pub async fn run(args: EnumerateArgs) -> Result<()> {
    let settings = PartialAppConfig::load(&args.model)?;
    let model = settings.merge_model(&args.model)?;
    let config = settings.merge_enumeration(args.chunk_threshold);

    info!("Loading weights from {:?}", &args.weights);
    let weights = WeightVector::load(&args.weights)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Enumerating {} metal(s) over zones {:?}...",
        model.metals.len(),
        model.zones.sizes()
    );
    let summary = tokio::task::block_in_place(|| {
        workflows::enumerate::run(&model, &weights, &args.output, &config, &reporter)
    })?;

    if summary.chunked {
        println!(
            "✓ {} fingerprints written to {} per-ensemble file(s) next to: {}",
            summary.rows,
            summary.files.len(),
            args.output.display()
        );
    } else {
        println!(
            "✓ {} fingerprints written to: {}",
            summary.rows,
            args.output.display()
        );
    }
    Ok(())
}
