use crate::cli::FeaturizeArgs;
use crate::config::PartialAppConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use alloysite::{
    core::io::manifest::load_manifest, engine::progress::ProgressReporter, workflows,
};
use tracing::{info, warn};

pub async fn run(args: FeaturizeArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let settings = PartialAppConfig::load(&args.model)?;
    let model = settings.merge_model(&args.model)?;
    let config = settings.merge_featurization(&model, &args)?;

    info!("Loading sample manifest from {:?}", &args.input);
    let samples = load_manifest(&args.input)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Featurizing {} sample(s) into {}-column fingerprints...",
        samples.len(),
        model.fingerprint_len()
    );
    let result = tokio::task::block_in_place(|| {
        workflows::featurize::run(&samples, &model, &config, &reporter)
    })?;

    if !result.rejections.is_empty() {
        warn!(
            "{} sample(s) were rejected and left out of the dataset.",
            result.rejections.len()
        );
        println!("Rejected {} sample(s):", result.rejections.len());
        for rejection in &result.rejections {
            println!(
                "  #{} ('{}'): {}",
                rejection.index, rejection.id, rejection.reason
            );
        }
    }

    result.dataset.write_csv(&args.output)?;
    println!(
        "✓ Dataset of {} sample(s) written to: {}",
        result.dataset.len(),
        args.output.display()
    );
    Ok(())
}
