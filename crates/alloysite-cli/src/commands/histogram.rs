use crate::cli::HistogramArgs;
use crate::config::PartialAppConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use alloysite::{
    engine::{error::EngineError, progress::ProgressReporter},
    workflows,
};
use tracing::info;

pub async fn run(args: HistogramArgs) -> Result<()> {
    let settings = PartialAppConfig::load(&args.model)?;
    let model = settings.merge_model(&args.model)?;
    let bins = settings.merge_bins(args.start, args.stop, args.width)?;
    info!(
        "Binning energies from {} to {} in steps of {} eV.",
        bins.start, bins.stop, bins.width
    );

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let histogram = tokio::task::block_in_place(|| {
        workflows::enumerate::aggregate_histogram(&model, &args.input, &bins, &reporter)
    })?;

    histogram.write_csv(&args.output).map_err(EngineError::from)?;
    println!(
        "✓ Histogram of {} bins over {} ensemble(s) written to: {}",
        histogram.edges().len() - 1,
        histogram.labels().len(),
        args.output.display()
    );
    Ok(())
}
