pub mod defaults;

use crate::cli::{FeaturizeArgs, ModelArgs};
use crate::error::{CliError, Result};
use crate::utils::parser;
use alloysite::core::geometry::zones::SiteGeometry;
use alloysite::engine::config::{
    DEFAULT_ON_TOP_DISTANCE, EnumerationConfig, FeaturizationConfig, FeaturizationConfigBuilder,
    HollowSite, ModelConfig, ModelConfigBuilder, Zone,
};
use alloysite::engine::energetics::{Adsorbate, ReferenceEnergies};
use alloysite::engine::histogram::BinSpec;
use defaults::{DefaultsConfig, Preset};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialModelConfig {
    geometry: Option<SiteGeometry>,
    metals: Option<Vec<String>>,
    zones: Option<Vec<Zone>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialReferenceEnergies {
    water: Option<f64>,
    hydrogen: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialFeaturizationConfig {
    adsorbate: Option<Adsorbate>,
    distortion_threshold: Option<f64>,
    on_top_distance: Option<f64>,
    required_site: Option<HollowSite>,
    references: Option<PartialReferenceEnergies>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialEnumerationConfig {
    chunk_threshold: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialHistogramConfig {
    start: Option<f64>,
    stop: Option<f64>,
    width: Option<f64>,
}

/// Settings read from the configuration file, before presets and command-line
/// overrides are applied.
///
/// Precedence, highest first: dedicated command-line flags, `--set` values, the
/// configuration file, the selected preset.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialAppConfig {
    preset: Option<Preset>,
    model: Option<PartialModelConfig>,
    featurization: Option<PartialFeaturizationConfig>,
    enumeration: Option<PartialEnumerationConfig>,
    histogram: Option<PartialHistogramConfig>,
}

impl PartialAppConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Reads the configuration file named by `args` (if any) and applies its
    /// `--preset` and `--set` overrides.
    pub fn load(args: &ModelArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if args.preset.is_some() {
            config.preset = args.preset;
        }
        config.apply_set_values(&args.set_values)?;
        Ok(config)
    }

    fn defaults(&self) -> Option<DefaultsConfig> {
        self.preset.map(DefaultsConfig::for_preset)
    }

    pub fn merge_model(&self, args: &ModelArgs) -> Result<ModelConfig> {
        let defaults = self.defaults();
        let file = self.model.as_ref();

        let geometry = file
            .and_then(|m| m.geometry)
            .or(defaults.as_ref().map(|d| d.geometry))
            .ok_or_else(|| missing("model.geometry"))?;
        let metals = args
            .metals
            .clone()
            .or_else(|| file.and_then(|m| m.metals.clone()))
            .or_else(|| defaults.as_ref().map(|d| d.metals.clone()))
            .ok_or_else(|| missing("model.metals"))?;
        let zones = file
            .and_then(|m| m.zones.clone())
            .or_else(|| defaults.as_ref().map(|d| d.zones.clone()))
            .ok_or_else(|| missing("model.zones"))?;

        ModelConfigBuilder::new()
            .geometry(geometry)
            .metals(metals)
            .zones(zones)
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    /// Without an explicit adsorbate, the model's site geometry picks it: *OH for
    /// on-top models, *O for hollow ones. On-top models reject drifted adsorbates
    /// unless site filters are disabled.
    pub fn merge_featurization(
        &self,
        model: &ModelConfig,
        args: &FeaturizeArgs,
    ) -> Result<FeaturizationConfig> {
        let defaults = self.defaults();
        let file = self.featurization.as_ref();

        let adsorbate = match &args.adsorbate {
            Some(name) => parser::parse_adsorbate(name)?,
            None => file
                .and_then(|f| f.adsorbate)
                .or(defaults.as_ref().map(|d| d.adsorbate))
                .unwrap_or(match model.geometry {
                    SiteGeometry::OnTop => Adsorbate::Oh,
                    SiteGeometry::Hollow => Adsorbate::O,
                }),
        };
        if adsorbate.site_geometry() != model.geometry {
            return Err(CliError::Config(format!(
                "Adsorbate {:?} binds at {:?} sites, but the model describes {:?} sites.",
                adsorbate,
                adsorbate.site_geometry(),
                model.geometry
            )));
        }

        let references = file.and_then(|f| f.references.as_ref());
        let fallback = ReferenceEnergies::default();
        let references = ReferenceEnergies {
            water: references
                .and_then(|r| r.water)
                .unwrap_or(fallback.water),
            hydrogen: references
                .and_then(|r| r.hydrogen)
                .unwrap_or(fallback.hydrogen),
        };

        let mut builder = FeaturizationConfigBuilder::new()
            .adsorbate(adsorbate)
            .references(references);
        if let Some(threshold) = args
            .distortion_threshold
            .or(file.and_then(|f| f.distortion_threshold))
        {
            builder = builder.distortion_threshold(threshold);
        }

        if !args.no_site_filters {
            let on_top_distance = args
                .on_top_distance
                .or(file.and_then(|f| f.on_top_distance))
                .or(defaults.as_ref().and_then(|d| d.on_top_distance))
                .or((model.geometry == SiteGeometry::OnTop).then_some(DEFAULT_ON_TOP_DISTANCE));
            if let (Some(distance), SiteGeometry::OnTop) = (on_top_distance, model.geometry) {
                builder = builder.on_top_distance(distance);
            }

            let required_site = match &args.required_site {
                Some(name) => Some(parser::parse_hollow_site(name)?),
                None => file
                    .and_then(|f| f.required_site)
                    .or(defaults.as_ref().and_then(|d| d.required_site)),
            };
            if let (Some(site), SiteGeometry::Hollow) = (required_site, model.geometry) {
                builder = builder.required_site(site);
            }
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    pub fn merge_enumeration(&self, chunk_threshold: Option<u64>) -> EnumerationConfig {
        let mut config = EnumerationConfig::default();
        if let Some(threshold) =
            chunk_threshold.or(self.enumeration.as_ref().and_then(|e| e.chunk_threshold))
        {
            config.chunk_threshold = threshold;
        }
        config
    }

    pub fn merge_bins(
        &self,
        start: Option<f64>,
        stop: Option<f64>,
        width: Option<f64>,
    ) -> Result<BinSpec> {
        let defaults = self.defaults();
        let file = self.histogram.as_ref();
        let pick = |cli: Option<f64>,
                    from_file: Option<f64>,
                    preset: Option<f64>,
                    key: &str|
         -> Result<f64> {
            cli.or(from_file)
                .or(preset)
                .ok_or_else(|| missing(&format!("histogram.{}", key)))
        };

        Ok(BinSpec {
            start: pick(
                start,
                file.and_then(|h| h.start),
                defaults.as_ref().map(|d| d.bins.start),
                "start",
            )?,
            stop: pick(
                stop,
                file.and_then(|h| h.stop),
                defaults.as_ref().map(|d| d.bins.stop),
                "stop",
            )?,
            width: pick(
                width,
                file.and_then(|h| h.width),
                defaults.as_ref().map(|d| d.bins.width),
                "width",
            )?,
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value_str) = parser::parse_assignment(kv_pair)?;

            match key {
                "preset" => {
                    self.preset = Some(<Preset as clap::ValueEnum>::from_str(value_str, true).map_err(
                        |_| {
                            CliError::Config(format!(
                                "Unknown preset for {}: '{}'",
                                key, value_str
                            ))
                        },
                    )?);
                }
                "model.geometry" => {
                    self.model_mut().geometry = Some(parser::parse_geometry(value_str)?);
                }
                "model.metals" => {
                    self.model_mut().metals = Some(parser::parse_metal_list(value_str)?);
                }
                "model.zones" => {
                    self.model_mut().zones = Some(parser::parse_zone_list(value_str)?);
                }
                "featurization.adsorbate" => {
                    self.featurization_mut().adsorbate =
                        Some(parser::parse_adsorbate(value_str)?);
                }
                "featurization.distortion-threshold" => {
                    self.featurization_mut().distortion_threshold =
                        Some(parse_number(key, value_str)?);
                }
                "featurization.on-top-distance" => {
                    self.featurization_mut().on_top_distance =
                        Some(parse_number(key, value_str)?);
                }
                "featurization.required-site" => {
                    self.featurization_mut().required_site =
                        Some(parser::parse_hollow_site(value_str)?);
                }
                "featurization.references.water" => {
                    self.references_mut().water = Some(parse_number(key, value_str)?);
                }
                "featurization.references.hydrogen" => {
                    self.references_mut().hydrogen = Some(parse_number(key, value_str)?);
                }
                "enumeration.chunk-threshold" => {
                    self.enumeration
                        .get_or_insert_with(Default::default)
                        .chunk_threshold = Some(parse_number(key, value_str)?);
                }
                "histogram.start" => {
                    self.histogram_mut().start = Some(parse_number(key, value_str)?);
                }
                "histogram.stop" => {
                    self.histogram_mut().stop = Some(parse_number(key, value_str)?);
                }
                "histogram.width" => {
                    self.histogram_mut().width = Some(parse_number(key, value_str)?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }

    fn model_mut(&mut self) -> &mut PartialModelConfig {
        self.model.get_or_insert_with(Default::default)
    }

    fn featurization_mut(&mut self) -> &mut PartialFeaturizationConfig {
        self.featurization.get_or_insert_with(Default::default)
    }

    fn references_mut(&mut self) -> &mut PartialReferenceEnergies {
        self.featurization_mut()
            .references
            .get_or_insert_with(Default::default)
    }

    fn histogram_mut(&mut self) -> &mut PartialHistogramConfig {
        self.histogram.get_or_insert_with(Default::default)
    }
}

fn missing(key: &str) -> CliError {
    CliError::Config(format!(
        "A value for '{}' is required either in the config file, via --set, or from a --preset.",
        key
    ))
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid numeric value for {}: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use alloysite::core::geometry::zones::ZoneKind;
    use clap::Parser;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::{TempDir, tempdir};

    fn write_config_file(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("alloysite.toml");
        fs::write(&path, content).unwrap();
        path
    }

    fn featurize_args(extra: &[&str]) -> FeaturizeArgs {
        let mut args = vec!["alloysite", "featurize", "-i", "samples.toml", "-o", "out.csv"];
        args.extend_from_slice(extra);
        match Cli::parse_from(args).command {
            Commands::Featurize(args) => args,
            other => panic!("Expected 'featurize' subcommand, got {:?}", other),
        }
    }

    #[test]
    fn preset_alone_defines_the_on_top_model() {
        let args = featurize_args(&["--preset", "oh-on-top"]);
        let config = PartialAppConfig::load(&args.model).unwrap();

        let model = config.merge_model(&args.model).unwrap();
        assert_eq!(model.geometry, SiteGeometry::OnTop);
        assert_eq!(model.metals.as_slice().len(), 5);
        assert_eq!(model.zones.sizes(), vec![1, 6, 3]);

        let featurization = config.merge_featurization(&model, &args).unwrap();
        assert_eq!(featurization.adsorbate, Adsorbate::Oh);
        assert_eq!(featurization.on_top_distance, Some(DEFAULT_ON_TOP_DISTANCE));
        assert_eq!(featurization.required_site, None);
    }

    #[test]
    fn file_values_override_the_preset() {
        let dir = tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
            preset = "o-fcc-hollow"

            [model]
            metals = ["Pt", "Ru"]

            [featurization]
            distortion-threshold = 1.2

            [featurization.references]
            water = -14.0
            "#,
        );
        let args = featurize_args(&["-c", path.to_str().unwrap()]);
        let config = PartialAppConfig::load(&args.model).unwrap();

        let model = config.merge_model(&args.model).unwrap();
        assert_eq!(model.geometry, SiteGeometry::Hollow);
        assert_eq!(model.metals.as_slice(), &["Pt".to_string(), "Ru".to_string()]);
        assert_eq!(model.zones.sizes(), vec![3, 6, 3, 3, 3]);

        let featurization = config.merge_featurization(&model, &args).unwrap();
        assert_eq!(featurization.adsorbate, Adsorbate::O);
        assert_eq!(featurization.distortion_threshold, 1.2);
        assert_eq!(featurization.references.water, -14.0);
        assert_eq!(
            featurization.references.hydrogen,
            ReferenceEnergies::default().hydrogen
        );
        assert_eq!(featurization.required_site, Some(HollowSite::Fcc));
        assert_eq!(featurization.on_top_distance, None);
    }

    #[test]
    fn set_values_and_flags_override_the_file() {
        let dir = tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
            [model]
            geometry = "on-top"
            metals = ["Ag", "Au", "Cu"]
            zones = [
                { kind = "ensemble", size = 1 },
                { kind = "surface", size = 6 },
            ]

            [featurization]
            on-top-distance = 0.5
            "#,
        );
        let args = featurize_args(&[
            "-c",
            path.to_str().unwrap(),
            "-S",
            "model.zones=ens:1,s:6,ss:3",
            "-S",
            "featurization.on-top-distance=0.6",
            "--metals",
            "Ag,Au",
            "--distortion-threshold",
            "1.05",
        ]);
        let config = PartialAppConfig::load(&args.model).unwrap();
        let model = config.merge_model(&args.model).unwrap();
        assert_eq!(model.metals.len(), 2);
        assert_eq!(
            model.zones.zones()[2],
            Zone::new(ZoneKind::Subsurface, 3)
        );

        let featurization = config.merge_featurization(&model, &args).unwrap();
        assert_eq!(featurization.on_top_distance, Some(0.6));
        assert_eq!(featurization.distortion_threshold, 1.05);
    }

    #[test]
    fn site_filters_can_be_disabled() {
        let args = featurize_args(&["--preset", "o-fcc-hollow", "--no-site-filters"]);
        let config = PartialAppConfig::load(&args.model).unwrap();
        let model = config.merge_model(&args.model).unwrap();
        let featurization = config.merge_featurization(&model, &args).unwrap();
        assert_eq!(featurization.required_site, None);
    }

    #[test]
    fn missing_model_returns_config_error() {
        let args = featurize_args(&[]);
        let config = PartialAppConfig::load(&args.model).unwrap();
        let result = config.merge_model(&args.model);
        assert!(matches!(result, Err(CliError::Config(ref msg)) if msg.contains("model.geometry")));
    }

    #[test]
    fn adsorbate_must_match_the_model_geometry() {
        let args = featurize_args(&["--preset", "oh-on-top", "--adsorbate", "o"]);
        let config = PartialAppConfig::load(&args.model).unwrap();
        let model = config.merge_model(&args.model).unwrap();
        assert!(matches!(
            config.merge_featurization(&model, &args),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn unknown_set_keys_and_file_keys_are_rejected() {
        let args = featurize_args(&["-S", "model.radius=3"]);
        assert!(matches!(
            PartialAppConfig::load(&args.model),
            Err(CliError::Config(_))
        ));

        let dir = tempdir().unwrap();
        let path = write_config_file(&dir, "[model]\nradius = 3\n");
        assert!(matches!(
            PartialAppConfig::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));
    }

    #[test]
    fn bins_and_chunking_fall_back_to_preset_and_defaults() {
        let args = featurize_args(&["-P", "oh-on-top", "-S", "histogram.width=0.01"]);
        let config = PartialAppConfig::load(&args.model).unwrap();

        let bins = config.merge_bins(Some(-0.2), None, None).unwrap();
        assert_eq!(bins.start, -0.2);
        assert_eq!(bins.stop, 1.5);
        assert_eq!(bins.width, 0.01);

        assert_eq!(
            config.merge_enumeration(None),
            EnumerationConfig::default()
        );
        assert_eq!(config.merge_enumeration(Some(10)).chunk_threshold, 10);
    }
}
