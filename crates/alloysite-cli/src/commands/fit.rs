use crate::cli::FitArgs;
use crate::config::PartialAppConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use alloysite::{
    core::io::dataset::{Dataset, write_predictions},
    engine::progress::ProgressReporter,
    workflows,
};
use tracing::info;

pub async fn run(args: FitArgs) -> Result<()> {
    let settings = PartialAppConfig::load(&args.model)?;
    let model = settings.merge_model(&args.model)?;

    info!("Loading training set from {:?}", &args.train);
    let train = Dataset::read_csv(&args.train)?;
    let test = match &args.test {
        Some(path) => {
            info!("Loading test set from {:?}", path);
            Some(Dataset::read_csv(path)?)
        }
        None => None,
    };

    for (name, dataset) in [("training", Some(&train)), ("test", test.as_ref())] {
        if let Some(columns) = dataset.and_then(Dataset::n_columns) {
            if columns != model.fingerprint_len() {
                return Err(CliError::Config(format!(
                    "The {} set has {} fingerprint columns, but the model defines {}.",
                    name,
                    columns,
                    model.fingerprint_len()
                )));
            }
        }
    }

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Fitting {} weights on {} sample(s)...", model.fingerprint_len(), train.len());
    let report = tokio::task::block_in_place(|| {
        workflows::regression::run(&model, &train, test.as_ref(), &reporter)
    })?;

    report.weights.save(&args.output)?;
    println!("✓ Weights written to: {}", args.output.display());
    println!(
        "  Training: RMSD {:.4} eV, MAE {:.4} eV ({} samples)",
        report.train.metrics.rmsd, report.train.metrics.mae, report.train.metrics.samples
    );
    if let Some(test_eval) = &report.test {
        println!(
            "  Test:     RMSD {:.4} eV, MAE {:.4} eV ({} samples)",
            test_eval.metrics.rmsd, test_eval.metrics.mae, test_eval.metrics.samples
        );
    }

    if let Some(path) = &args.train_predictions {
        write_predictions(path, &report.train.predictions)?;
        info!("Training predictions written to {:?}", path);
    }
    if let (Some(path), Some(test_eval)) = (&args.test_predictions, &report.test) {
        write_predictions(path, &test_eval.predictions)?;
        info!("Test predictions written to {:?}", path);
    }
    Ok(())
}
