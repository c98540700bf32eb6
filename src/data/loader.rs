//! Reading plate-reader well exports from delimited text.
//!
//! The reader expects the column names of the plate reader's per-well export.
//! A missing required column fails before any row is read; everything else
//! (blank stimuli, blank counts, rows without a donor) is tolerated.

use crate::data::record::{merge_donors, split_by_donor, DonorRecords, LabelValue, WellRecord};
use crate::error::{FluoroError, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

pub const DONOR_COLUMN: &str = "Layout-Donor";
pub const PLATE_COLUMN: &str = "Plate";
pub const STIMULUS_COLUMN: &str = "Layout-Stimuli";
pub const SFU_COLUMN: &str = "Spot Forming Units (SFU)";
pub const POPULATION_COLUMN: &str = "Analyte Secreting Population";

/// Columns every well export must carry.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    DONOR_COLUMN,
    PLATE_COLUMN,
    STIMULUS_COLUMN,
    SFU_COLUMN,
    POPULATION_COLUMN,
];

const MISSING_MARKERS: [&str; 6] = ["", "nan", "na", "n/a", "-", "null"];

/// Field delimiter implied by a file extension (`.tsv`/`.txt` are tab-separated).
pub fn delimiter_for<P: AsRef<Path>>(path: P) -> u8 {
    match path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("tsv") | Some("txt") => b'\t',
        _ => b',',
    }
}

/// Whether a file looks like a well export this module can read.
pub fn is_export_file<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('~') || n.starts_with('.'));
    let known = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| matches!(e.as_str(), "csv" | "tsv" | "txt"));
    path.is_file() && known && !hidden
}

fn parse_sfu(value: &str, row: usize) -> Result<f64> {
    let trimmed = value.trim();
    if MISSING_MARKERS.contains(&trimmed.to_ascii_lowercase().as_str()) {
        return Ok(f64::NAN);
    }
    trimmed.parse::<f64>().map_err(|_| FluoroError::InvalidValue {
        value: value.to_string(),
        row,
        column: SFU_COLUMN.to_string(),
    })
}

/// Read well records from any reader.
///
/// Extra columns are ignored. Row numbers in errors are 1-based data rows.
pub fn read_wells<R: Read>(reader: R, delimiter: u8) -> Result<Vec<WellRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut positions = [0usize; 5];
    for (slot, name) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| FluoroError::MissingColumn(name.to_string()))?;
    }
    let [donor_idx, plate_idx, stim_idx, sfu_idx, pop_idx] = positions;

    let mut records = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let row = row?;
        let field = |idx: usize| row.get(idx).unwrap_or("");
        let sfu = parse_sfu(field(sfu_idx), i + 1)?;
        records.push(WellRecord::new(
            field(donor_idx).trim(),
            field(plate_idx).trim(),
            LabelValue::from(field(stim_idx)),
            field(pop_idx).trim(),
            sfu,
        ));
    }

    let missing = records.iter().filter(|r| r.is_missing()).count();
    if missing > 0 {
        debug!(missing, "wells without a spot count");
    }
    Ok(records)
}

/// Read well records from a CSV/TSV file.
pub fn read_wells_file<P: AsRef<Path>>(path: P) -> Result<Vec<WellRecord>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read_wells(file, delimiter_for(path))
}

/// Load a combined export and split it into per-donor tables.
pub fn load_donor_file<P: AsRef<Path>>(path: P) -> Result<Vec<DonorRecords>> {
    let path = path.as_ref();
    let records = read_wells_file(path)?;
    let total = records.len();
    let donors = split_by_donor(records);
    let kept: usize = donors.iter().map(|(_, r)| r.len()).sum();
    if kept < total {
        warn!(
            file = %path.display(),
            skipped = total - kept,
            "rows without a donor id were skipped"
        );
    }
    info!(file = %path.display(), donors = donors.len(), rows = kept, "loaded well export");
    Ok(donors)
}

/// Load every export in a directory, merging donors that span several files.
///
/// Files are read in file-name order; lock files (`~...`) are skipped.
pub fn load_donor_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<DonorRecords>> {
    let dir = dir.as_ref();
    let mut files: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| is_export_file(p))
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(FluoroError::EmptyData(format!(
            "no CSV/TSV exports found in {}",
            dir.display()
        )));
    }

    let mut sets = Vec::new();
    for file in &files {
        let donors = load_donor_file(file)?;
        if donors.len() > 1 {
            let ids: Vec<&str> = donors.iter().map(|(id, _)| id.as_str()).collect();
            info!(file = %file.display(), donors = ?ids, "file holds several donors");
        }
        sets.extend(donors);
    }
    Ok(merge_donors(sets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    const HEADER: &str =
        "Layout-Donor,Plate,Layout-Stimuli,Spot Forming Units (SFU),Analyte Secreting Population,Well";

    #[test]
    fn test_read_wells_basic() {
        let data = format!(
            "{}\nD001,plate_1,DMSO,10,LED490 Total,A1\nD001,plate_1,4990.67,45,LED490 Total,A2\nD001,plate_1,,NaN,LED490 Total,A3\n",
            HEADER
        );
        let records = read_wells(data.as_bytes(), b',').unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].stimulus(), Some("DMSO"));
        assert_eq!(records[1].stimulus(), Some("4990.67"));
        assert_eq!(records[1].sfu, 45.0);
        assert_eq!(records[2].stimulus(), None);
        assert!(records[2].is_missing());
    }

    #[test]
    fn test_missing_column_fails_fast() {
        let data = "Layout-Donor,Plate,Layout-Stimuli,Analyte Secreting Population\nD1,p,DMSO,LED490 Total\n";
        let err = read_wells(data.as_bytes(), b',').unwrap_err();
        match err {
            FluoroError::MissingColumn(col) => assert_eq!(col, SFU_COLUMN),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_invalid_sfu() {
        let data = format!("{}\nD001,plate_1,DMSO,lots,LED490 Total,A1\n", HEADER);
        let err = read_wells(data.as_bytes(), b',').unwrap_err();
        assert!(matches!(err, FluoroError::InvalidValue { row: 1, .. }));
    }

    #[test]
    fn test_load_donor_file_tsv() {
        let mut file = tempfile::Builder::new().suffix(".tsv").tempfile().unwrap();
        writeln!(file, "{}", HEADER.replace(',', "\t")).unwrap();
        writeln!(file, "DONOR_A\tplate_1\tDMSO\t10\tLED490 Total\tA1").unwrap();
        writeln!(file, "DONOR_B\tplate_1\tDMSO\t15\tLED490 Total\tA2").unwrap();
        writeln!(file, "DONOR_A\tplate_1\tPHA\t50\tLED490 Total\tA3").unwrap();
        writeln!(file, "\tplate_1\tPHA\t50\tLED490 Total\tA4").unwrap();
        file.flush().unwrap();

        let donors = load_donor_file(file.path()).unwrap();
        assert_eq!(donors.len(), 2);
        assert_eq!(donors[0].0, "DONOR_A");
        assert_eq!(donors[0].1.len(), 2);
        assert_eq!(donors[1].0, "DONOR_B");
    }

    #[test]
    fn test_load_donor_dir_merges_and_skips_lock_files() {
        let dir = tempdir().unwrap();
        let write = |name: &str, rows: &[&str]| {
            let mut f = File::create(dir.path().join(name)).unwrap();
            writeln!(f, "{}", HEADER).unwrap();
            for row in rows {
                writeln!(f, "{}", row).unwrap();
            }
        };
        write("a.csv", &["D1,plate_1,DMSO,10,LED490 Total,A1"]);
        write("b.csv", &["D2,plate_1,DMSO,11,LED490 Total,A1", "D1,plate_2,DMSO,12,LED490 Total,A1"]);
        write("~lock.csv", &["D9,plate_1,DMSO,10,LED490 Total,A1"]);
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let donors = load_donor_dir(dir.path()).unwrap();
        let ids: Vec<&str> = donors.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["D1", "D2"]);
        assert_eq!(donors[0].1.len(), 2);
    }

    #[test]
    fn test_load_donor_dir_empty() {
        let dir = tempdir().unwrap();
        assert!(matches!(load_donor_dir(dir.path()), Err(FluoroError::EmptyData(_))));
    }

    #[test]
    fn test_delimiter_for() {
        assert_eq!(delimiter_for("x.tsv"), b'\t');
        assert_eq!(delimiter_for("x.TXT"), b'\t');
        assert_eq!(delimiter_for("x.csv"), b',');
        let file = NamedTempFile::new().unwrap();
        assert!(!is_export_file(file.path()));
    }
}
