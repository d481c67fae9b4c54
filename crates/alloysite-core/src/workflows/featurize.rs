use crate::core::geometry::slab::{SiteClassification, Slab};
use crate::core::geometry::zones::SiteGeometry;
use crate::core::io::dataset::Dataset;
use crate::core::io::manifest::SampleRecord;
use crate::engine::config::{FeaturizationConfig, HollowSite, ModelConfig};
use crate::engine::energetics::adsorption_energy;
use crate::engine::error::EngineError;
use crate::engine::fingerprint::FingerprintBuilder;
use crate::engine::progress::{Progress, ProgressReporter};
use std::fmt;
use tracing::{info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Why a sample was left out of the dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// The slab expanded beyond the distortion threshold while relaxing.
    Distorted,
    /// The adsorbate moved away from its on-top position.
    NotOnTop,
    /// The adsorbate sits in the other type of hollow site.
    SiteMismatch { found: HollowSite },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::Distorted => write!(f, "slab is distorted"),
            RejectionReason::NotOnTop => write!(f, "adsorbate is not on top"),
            RejectionReason::SiteMismatch { found } => {
                write!(f, "adsorbate occupies an {:?} hollow site", found)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub index: usize,
    pub id: String,
    pub reason: RejectionReason,
}

#[derive(Debug, Clone)]
pub struct FeaturizeResult {
    pub dataset: Dataset,
    /// Ids of the accepted samples, in dataset row order.
    pub sample_ids: Vec<String>,
    pub rejections: Vec<Rejection>,
}

enum Outcome {
    Accepted { fingerprint: Vec<u32>, energy: f64 },
    Rejected(RejectionReason),
}

#[instrument(skip_all, name = "featurize_workflow")]
pub fn run(
    samples: &[SampleRecord],
    model: &ModelConfig,
    config: &FeaturizationConfig,
    reporter: &ProgressReporter,
) -> Result<FeaturizeResult, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Featurization",
    });
    info!(
        samples = samples.len(),
        columns = model.fingerprint_len(),
        "Featurizing samples."
    );

    let builder = FingerprintBuilder::from_config(model);
    reporter.report(Progress::TaskStart {
        total_steps: samples.len() as u64,
    });

    #[cfg(not(feature = "parallel"))]
    let iterator = samples.iter().enumerate();

    #[cfg(feature = "parallel")]
    let iterator = samples.par_iter().enumerate();

    let outcomes: Vec<Result<Outcome, EngineError>> = iterator
        .map(|(index, sample)| {
            let outcome = featurize_sample(sample, model, config, &builder).map_err(|e| {
                EngineError::Sample {
                    index,
                    id: sample.id.clone(),
                    source: Box::new(e),
                }
            });
            reporter.report(Progress::TaskIncrement);
            outcome
        })
        .collect();

    reporter.report(Progress::TaskFinish);

    let mut dataset = Dataset::new();
    let mut sample_ids = Vec::new();
    let mut rejections = Vec::new();
    for (index, outcome) in outcomes.into_iter().enumerate() {
        let sample = &samples[index];
        match outcome? {
            Outcome::Accepted {
                fingerprint,
                energy,
            } => {
                dataset.push(fingerprint, energy);
                sample_ids.push(sample.id.clone());
            }
            Outcome::Rejected(reason) => {
                warn!(index, id = %sample.id, %reason, "Rejected sample.");
                rejections.push(Rejection {
                    index,
                    id: sample.id.clone(),
                    reason,
                });
            }
        }
    }

    if dataset.is_empty() {
        reporter.report(Progress::PhaseFinish);
        return Err(EngineError::NoSamples {
            rejected: rejections.len(),
        });
    }

    info!(
        accepted = dataset.len(),
        rejected = rejections.len(),
        "Featurization complete."
    );
    reporter.report(Progress::PhaseFinish);
    Ok(FeaturizeResult {
        dataset,
        sample_ids,
        rejections,
    })
}

fn featurize_sample(
    sample: &SampleRecord,
    model: &ModelConfig,
    config: &FeaturizationConfig,
    builder: &FingerprintBuilder,
) -> Result<Outcome, EngineError> {
    let mut slab = Slab::new(sample.to_structure()?);

    if slab.is_distorted(config.distortion_threshold)? {
        return Ok(Outcome::Rejected(RejectionReason::Distorted));
    }
    if let Some(max_xy) = config.on_top_distance {
        if !slab.is_on_top(max_xy)? {
            return Ok(Outcome::Rejected(RejectionReason::NotOnTop));
        }
    }
    if let (SiteGeometry::Hollow, Some(required)) = (model.geometry, config.required_site) {
        let found = match slab.site()? {
            SiteClassification::Fcc => HollowSite::Fcc,
            SiteClassification::Hcp { .. } => HollowSite::Hcp,
        };
        if found != required {
            return Ok(Outcome::Rejected(RejectionReason::SiteMismatch { found }));
        }
    }

    let per_zone = model
        .zones
        .zones()
        .iter()
        .map(|zone| slab.zone_symbols(zone.kind, model.geometry))
        .collect::<Result<Vec<_>, _>>()?;
    let fingerprint = builder.build(&per_zone)?;
    let energy = adsorption_energy(
        config.adsorbate,
        sample.energy,
        sample.clean_energy,
        &config.references,
    );

    Ok(Outcome::Accepted {
        fingerprint,
        energy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::slab::test_support::fcc111_slab;
    use crate::core::geometry::zones::ZoneKind;
    use crate::core::io::manifest::AtomRecord;
    use crate::core::models::atom::LayerTag;
    use crate::core::models::structure::AtomicStructure;
    use crate::engine::config::{
        DEFAULT_ON_TOP_DISTANCE, FeaturizationConfigBuilder, ModelConfigBuilder, Zone,
    };
    use crate::engine::energetics::{Adsorbate, ReferenceEnergies};

    const PT9: [&str; 9] = ["Pt"; 9];
    const THIRD: f64 = 1.0 / 3.0;

    fn record(id: &str, structure: &AtomicStructure, energy: f64, clean_energy: f64) -> SampleRecord {
        let cell = structure.cell();
        SampleRecord {
            id: id.to_string(),
            energy,
            clean_energy,
            cell: [0, 1, 2].map(|r| [cell[(r, 0)], cell[(r, 1)], cell[(r, 2)]]),
            atoms: structure
                .atoms()
                .iter()
                .map(|atom| AtomRecord {
                    symbol: atom.symbol.clone(),
                    position: [atom.position.x, atom.position.y, atom.position.z],
                    tag: i64::from(atom.tag.as_tag()),
                })
                .collect(),
        }
    }

    fn on_top_model() -> ModelConfig {
        ModelConfigBuilder::new()
            .geometry(SiteGeometry::OnTop)
            .metals(["Pt", "Ru"])
            .zones(vec![
                Zone::new(ZoneKind::Ensemble, 1),
                Zone::new(ZoneKind::Surface, 6),
                Zone::new(ZoneKind::Subsurface, 3),
            ])
            .build()
            .unwrap()
    }

    fn hollow_model() -> ModelConfig {
        ModelConfigBuilder::new()
            .geometry(SiteGeometry::Hollow)
            .metals(["Pt", "Ru"])
            .zones(vec![
                Zone::new(ZoneKind::Ensemble, 3),
                Zone::new(ZoneKind::SurfaceFar, 6),
                Zone::new(ZoneKind::SubsurfaceFar, 3),
                Zone::new(ZoneKind::SurfaceNear, 3),
                Zone::new(ZoneKind::SubsurfaceNear, 3),
            ])
            .build()
            .unwrap()
    }

    #[test]
    fn on_top_samples_are_filtered_and_encoded() {
        let mut surface = PT9;
        surface[4] = "Ru";
        let on_top = fcc111_slab(surface, PT9, (1.0, 1.0), 2.0);
        let drifted = fcc111_slab(PT9, PT9, (1.0 + THIRD, 1.0 + THIRD), 1.2);
        let distorted = AtomicStructure::new(
            on_top
                .atoms()
                .iter()
                .cloned()
                .map(|mut atom| {
                    if matches!(atom.tag, LayerTag::Surface | LayerTag::Adsorbate) {
                        atom.position.z += 3.0;
                    }
                    atom
                })
                .collect(),
            *on_top.cell(),
        );
        let samples = vec![
            record("ok", &on_top, -110.0, -100.0),
            record("drifted", &drifted, -110.0, -100.0),
            record("distorted", &distorted, -110.0, -100.0),
        ];
        let config = FeaturizationConfigBuilder::new()
            .adsorbate(Adsorbate::Oh)
            .on_top_distance(DEFAULT_ON_TOP_DISTANCE)
            .build()
            .unwrap();

        let result = run(&samples, &on_top_model(), &config, &ProgressReporter::new()).unwrap();

        assert_eq!(result.sample_ids, vec!["ok".to_string()]);
        assert_eq!(result.dataset.fingerprints()[0], vec![0, 1, 6, 0, 3, 0]);
        let refs = ReferenceEnergies::default();
        let expected = -110.0 + 0.5 * refs.hydrogen + 100.0 - refs.water;
        assert!((result.dataset.energies()[0] - expected).abs() < 1e-9);

        let reasons: Vec<_> = result.rejections.iter().map(|r| (r.id.as_str(), r.reason.clone())).collect();
        assert_eq!(
            reasons,
            vec![
                ("drifted", RejectionReason::NotOnTop),
                ("distorted", RejectionReason::Distorted),
            ]
        );
    }

    #[test]
    fn hollow_samples_of_the_wrong_site_type_are_rejected() {
        let fcc = fcc111_slab(PT9, PT9, (1.0 + THIRD, 1.0 + THIRD), 1.2);
        let hcp = fcc111_slab(PT9, PT9, (1.0 + 2.0 * THIRD, 1.0 + 2.0 * THIRD), 1.2);
        let samples = vec![
            record("fcc", &fcc, -105.0, -100.0),
            record("hcp", &hcp, -105.0, -100.0),
        ];
        let config = FeaturizationConfigBuilder::new()
            .adsorbate(Adsorbate::O)
            .required_site(HollowSite::Fcc)
            .build()
            .unwrap();

        let result = run(&samples, &hollow_model(), &config, &ProgressReporter::new()).unwrap();

        assert_eq!(result.dataset.len(), 1);
        assert_eq!(
            result.dataset.fingerprints()[0],
            vec![1, 0, 0, 0, 6, 0, 3, 0, 3, 0, 3, 0]
        );
        assert_eq!(
            result.rejections[0].reason,
            RejectionReason::SiteMismatch {
                found: HollowSite::Hcp
            }
        );
    }

    #[test]
    fn geometry_errors_carry_the_sample_index() {
        let mut sample = record("bad", &fcc111_slab(PT9, PT9, (1.0, 1.0), 2.0), 0.0, 0.0);
        sample.atoms[0].tag = 9;
        let config = FeaturizationConfigBuilder::new()
            .adsorbate(Adsorbate::Oh)
            .build()
            .unwrap();

        let err = run(&[sample], &on_top_model(), &config, &ProgressReporter::new()).unwrap_err();
        assert!(matches!(err, EngineError::Sample { index: 0, .. }));
    }

    #[test]
    fn all_rejected_samples_are_an_error() {
        let drifted = fcc111_slab(PT9, PT9, (1.0 + THIRD, 1.0 + THIRD), 1.2);
        let config = FeaturizationConfigBuilder::new()
            .adsorbate(Adsorbate::Oh)
            .on_top_distance(DEFAULT_ON_TOP_DISTANCE)
            .build()
            .unwrap();
        let err = run(
            &[record("drifted", &drifted, 0.0, 0.0)],
            &on_top_model(),
            &config,
            &ProgressReporter::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::NoSamples { rejected: 1 }));
    }
}
