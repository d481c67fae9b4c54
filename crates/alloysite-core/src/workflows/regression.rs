use crate::core::io::dataset::Dataset;
use crate::engine::config::ModelConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::regression::{ErrorMetrics, SymmetricLeastSquares, WeightVector};
use tracing::{info, instrument};

/// Predictions for one dataset and their deviation from its targets.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub predictions: Vec<f64>,
    pub metrics: ErrorMetrics,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub weights: WeightVector,
    pub train: Evaluation,
    pub test: Option<Evaluation>,
}

pub fn evaluate(weights: &WeightVector, dataset: &Dataset) -> Result<Evaluation, EngineError> {
    let predictions = weights.predict(dataset.fingerprints())?;
    let metrics = ErrorMetrics::compute(&predictions, dataset.energies())?;
    Ok(Evaluation {
        predictions,
        metrics,
    })
}

/// Fits the model on `train` and evaluates it on `train` and, if given, `test`.
#[instrument(skip_all, name = "regression_workflow")]
pub fn run(
    model: &ModelConfig,
    train: &Dataset,
    test: Option<&Dataset>,
    reporter: &ProgressReporter,
) -> Result<FitReport, EngineError> {
    let weights = reporter.phase("Fitting", || {
        SymmetricLeastSquares::from_config(model).fit(train.fingerprints(), train.energies())
    })?;

    reporter.report(Progress::PhaseStart { name: "Evaluation" });
    let train_eval = evaluate(&weights, train)?;
    info!(
        rmsd = train_eval.metrics.rmsd,
        mae = train_eval.metrics.mae,
        samples = train.len(),
        "Training set evaluated."
    );

    let test_eval = match test {
        Some(dataset) => {
            let evaluation = evaluate(&weights, dataset)?;
            info!(
                rmsd = evaluation.metrics.rmsd,
                mae = evaluation.metrics.mae,
                samples = dataset.len(),
                "Test set evaluated."
            );
            Some(evaluation)
        }
        None => None,
    };
    reporter.report(Progress::PhaseFinish);

    Ok(FitReport {
        weights,
        train: train_eval,
        test: test_eval,
    })
}
