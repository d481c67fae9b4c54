use super::error::IoError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One row of an enumeration table: total per-metal atom counts of a fingerprint,
/// its predicted energy and its multiplicity.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumerationRecord {
    pub metal_counts: Vec<u32>,
    pub energy: f64,
    pub multiplicity: u64,
}

/// Streaming writer for header-less enumeration tables.
pub struct EnumerationTableWriter<W: Write> {
    writer: csv::Writer<W>,
    path: PathBuf,
    record: Vec<String>,
}

impl EnumerationTableWriter<File> {
    pub fn create(path: &Path) -> Result<Self, IoError> {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|e| IoError::csv(path, e))?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            record: Vec::new(),
        })
    }
}

impl<W: Write> EnumerationTableWriter<W> {
    /// Wraps an arbitrary writer; `label` names the destination in error messages.
    pub fn from_writer(inner: W, label: &str) -> Self {
        Self {
            writer: csv::WriterBuilder::new().has_headers(false).from_writer(inner),
            path: PathBuf::from(label),
            record: Vec::new(),
        }
    }

    pub fn write(&mut self, metal_counts: &[u32], energy: f64, multiplicity: u64) -> Result<(), IoError> {
        self.record.clear();
        self.record.extend(metal_counts.iter().map(u32::to_string));
        self.record.push(format!("{:.5}", energy));
        self.record.push(multiplicity.to_string());
        self.writer
            .write_record(&self.record)
            .map_err(|e| IoError::csv(&self.path, e))
    }

    pub fn finish(mut self) -> Result<(), IoError> {
        self.writer.flush().map_err(|e| IoError::io(&self.path, e))
    }
}

/// Streaming reader for enumeration tables over `n_metals` metals.
pub struct EnumerationTableReader {
    reader: csv::Reader<File>,
    path: PathBuf,
    n_metals: usize,
}

impl EnumerationTableReader {
    pub fn open(path: &Path, n_metals: usize) -> Result<Self, IoError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| IoError::csv(path, e))?;
        Ok(Self {
            reader,
            path: path.to_path_buf(),
            n_metals,
        })
    }

    pub fn records(&mut self) -> impl Iterator<Item = Result<EnumerationRecord, IoError>> + '_ {
        let path = &self.path;
        let n_metals = self.n_metals;
        self.reader.records().enumerate().map(move |(row, result)| {
            let record = result.map_err(|e| IoError::csv(path, e))?;
            parse_record(&record, n_metals).map_err(|message| IoError::malformed(path, row + 1, message))
        })
    }
}

fn parse_record(record: &csv::StringRecord, n_metals: usize) -> Result<EnumerationRecord, String> {
    if record.len() != n_metals + 2 {
        return Err(format!(
            "expected {} columns ({} metal counts, energy, multiplicity), found {}",
            n_metals + 2,
            n_metals,
            record.len()
        ));
    }

    let metal_counts = record
        .iter()
        .take(n_metals)
        .map(|field| field.parse::<u32>().map_err(|_| format!("invalid count '{}'", field)))
        .collect::<Result<Vec<_>, _>>()?;
    let energy = record[n_metals]
        .parse::<f64>()
        .map_err(|_| format!("invalid energy '{}'", &record[n_metals]))?;
    let multiplicity = record[n_metals + 1]
        .parse::<u64>()
        .map_err(|_| format!("invalid multiplicity '{}'", &record[n_metals + 1]))?;

    Ok(EnumerationRecord {
        metal_counts,
        energy,
        multiplicity,
    })
}

/// Path of the shard holding ensemble `ensemble_id`: `<stem>_<id>.<ext>` next to
/// `path`.
pub fn shard_path(path: &Path, ensemble_id: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, ensemble_id, ext.to_string_lossy()),
        None => format!("{}_{}", stem, ensemble_id),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn writer_formats_counts_energy_and_multiplicity() {
        let mut buffer = Vec::new();
        {
            let mut writer = EnumerationTableWriter::from_writer(&mut buffer, "memory");
            writer.write(&[2, 8], 1.23456789, 6).unwrap();
            writer.write(&[10, 0], -0.5, 1).unwrap();
            writer.finish().unwrap();
        }
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "2,8,1.23457,6\n10,0,-0.50000,1\n"
        );
    }

    #[test]
    fn reader_parses_written_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("enum.csv");
        let mut writer = EnumerationTableWriter::create(&path).unwrap();
        writer.write(&[1, 2, 0], 0.75, 3).unwrap();
        writer.finish().unwrap();

        let mut reader = EnumerationTableReader::open(&path, 3).unwrap();
        let records: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(
            records,
            vec![EnumerationRecord {
                metal_counts: vec![1, 2, 0],
                energy: 0.75,
                multiplicity: 3,
            }]
        );
    }

    #[test]
    fn reader_rejects_rows_with_wrong_width() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("enum.csv");
        fs::write(&path, "1,2,0.5,1\n").unwrap();

        let mut reader = EnumerationTableReader::open(&path, 3).unwrap();
        let first = reader.records().next().unwrap();
        assert!(matches!(first, Err(IoError::MalformedRow { row: 1, .. })));
    }

    #[test]
    fn shard_path_inserts_ensemble_id_before_extension() {
        assert_eq!(
            shard_path(Path::new("/tmp/out/enum.csv"), 12),
            PathBuf::from("/tmp/out/enum_12.csv")
        );
        assert_eq!(shard_path(Path::new("table"), 0), PathBuf::from("table_0"));
    }
}
