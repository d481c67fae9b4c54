use super::error::IoError;
use std::path::Path;

/// Fingerprints paired with their target adsorption energies.
///
/// On disk a dataset is a header-less CSV file: the integer fingerprint columns of
/// each sample followed by its energy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    fingerprints: Vec<Vec<u32>>,
    energies: Vec<f64>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fingerprint: Vec<u32>, energy: f64) {
        self.fingerprints.push(fingerprint);
        self.energies.push(energy);
    }

    pub fn fingerprints(&self) -> &[Vec<u32>] {
        &self.fingerprints
    }

    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    /// Number of fingerprint columns, or `None` for an empty dataset.
    pub fn n_columns(&self) -> Option<usize> {
        self.fingerprints.first().map(Vec::len)
    }

    pub fn read_csv(path: &Path) -> Result<Self, IoError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| IoError::csv(path, e))?;

        let mut dataset = Dataset::new();
        for (row, result) in reader.records().enumerate() {
            let record = result.map_err(|e| IoError::csv(path, e))?;
            if record.len() < 2 {
                return Err(IoError::malformed(
                    path,
                    row + 1,
                    "expected at least one fingerprint column and an energy",
                ));
            }

            let (energy_field, count_fields) = (&record[record.len() - 1], record.len() - 1);
            let fingerprint = record
                .iter()
                .take(count_fields)
                .map(|field| {
                    field.parse::<u32>().map_err(|_| {
                        IoError::malformed(path, row + 1, format!("invalid count '{}'", field))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let energy = energy_field.parse::<f64>().map_err(|_| {
                IoError::malformed(path, row + 1, format!("invalid energy '{}'", energy_field))
            })?;

            dataset.push(fingerprint, energy);
        }
        Ok(dataset)
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), IoError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|e| IoError::csv(path, e))?;

        for (fingerprint, energy) in self.fingerprints.iter().zip(&self.energies) {
            let mut record: Vec<String> = fingerprint.iter().map(u32::to_string).collect();
            record.push(energy.to_string());
            writer
                .write_record(&record)
                .map_err(|e| IoError::csv(path, e))?;
        }
        writer.flush().map_err(|e| IoError::io(path, e))
    }
}

/// Writes one predicted energy per line with five decimals.
pub fn write_predictions(path: &Path, predictions: &[f64]) -> Result<(), IoError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| IoError::csv(path, e))?;
    for prediction in predictions {
        writer
            .write_record([format!("{:.5}", prediction)])
            .map_err(|e| IoError::csv(path, e))?;
    }
    writer.flush().map_err(|e| IoError::io(path, e))
}
