use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use csv::WriterBuilder;
use serde::Serialize;

use crate::histogram::H1;
use crate::ntuple::Ntuple;
use crate::AnalysisError;

pub const OUTPUT_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub schema_version: String,
    pub created_utc: String,
    pub file_name: String,
    pub file_type: String,
    pub ntuple_merging: bool,
    pub histograms: Vec<PathBuf>,
    pub ntuples: Vec<PathBuf>,
}

impl Manifest {
    pub fn new(file_name: &str, file_type: &str, ntuple_merging: bool) -> Self {
        Self {
            schema_version: OUTPUT_SCHEMA_VERSION.to_string(),
            created_utc: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            file_name: file_name.to_string(),
            file_type: file_type.to_string(),
            ntuple_merging,
            histograms: Vec::new(),
            ntuples: Vec::new(),
        }
    }
}

/// Create `<root>/<UTC timestamp>` (with a numeric suffix if it already exists).
pub fn create_timestamped_output_dir(root: &Path) -> Result<PathBuf, AnalysisError> {
    fs::create_dir_all(root)?;

    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let mut output_dir = root.join(&timestamp);
    let mut counter = 1_u32;

    while output_dir.exists() {
        output_dir = root.join(format!("{timestamp}-{counter:02}"));
        counter += 1;
    }

    fs::create_dir_all(&output_dir)?;
    Ok(output_dir)
}

fn fmt_f64(value: f64) -> String {
    format!("{value:.10}")
}

pub fn histogram_path(dir: &Path, file_name: &str, histo: &H1) -> PathBuf {
    dir.join(format!("{file_name}_h1_{}.csv", histo.name()))
}

pub fn ntuple_path(dir: &Path, file_name: &str, ntuple: &Ntuple) -> PathBuf {
    dir.join(format!("{file_name}_nt_{}.csv", ntuple.name()))
}

pub fn write_histogram_csv(path: &Path, histo: &H1) -> Result<(), AnalysisError> {
    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "#class chamber_analysis::H1")?;
    writeln!(file, "#title {}", histo.title())?;
    writeln!(file, "#dimension 1")?;
    writeln!(
        file,
        "#axis fixed {} {} {}",
        histo.bins(),
        fmt_f64(histo.lower()),
        fmt_f64(histo.upper())
    )?;
    writeln!(file, "#entries {}", histo.entries())?;
    writeln!(file, "#mean {}", fmt_f64(histo.mean()))?;
    writeln!(file, "#rms {}", fmt_f64(histo.rms()))?;

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    writer.write_record(["bin", "lower_edge", "content", "error"])?;

    writer.write_record([
        "-1".to_string(),
        "-inf".to_string(),
        fmt_f64(histo.underflow()),
        fmt_f64(histo.underflow_error()),
    ])?;

    for bin in 0..histo.bins() {
        writer.write_record([
            bin.to_string(),
            fmt_f64(histo.bin_lower_edge(bin)),
            fmt_f64(histo.bin_content(bin).unwrap_or_default()),
            fmt_f64(histo.bin_error(bin).unwrap_or_default()),
        ])?;
    }

    writer.write_record([
        histo.bins().to_string(),
        fmt_f64(histo.upper()),
        fmt_f64(histo.overflow()),
        fmt_f64(histo.overflow_error()),
    ])?;

    writer.flush()?;
    Ok(())
}

pub fn write_ntuple_csv(path: &Path, ntuple: &Ntuple) -> Result<(), AnalysisError> {
    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "#class chamber_analysis::Ntuple")?;
    writeln!(file, "#title {}", ntuple.title())?;
    writeln!(file, "#separator 44")?;
    for column in ntuple.columns() {
        writeln!(file, "#column double {column}")?;
    }

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    for row in ntuple.rows() {
        writer.write_record(row.iter().map(|&value| fmt_f64(value)))?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_manifest_json(path: &Path, manifest: &Manifest) -> Result<(), AnalysisError> {
    let payload = serde_json::to_string_pretty(manifest)?;
    fs::write(path, payload)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamped_dirs_do_not_collide() {
        let root = tempfile::tempdir().expect("tempdir");
        let first = create_timestamped_output_dir(root.path()).expect("first");
        let second = create_timestamped_output_dir(root.path()).expect("second");
        assert_ne!(first, second);
        assert!(first.is_dir() && second.is_dir());
    }

    #[test]
    fn histogram_csv_lists_flows_and_bins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut histo = H1::new("EGas", "Edep in chamber (MeV)", 2, 0.0, 1.0).expect("histo");
        histo.fill(0.25, 2.0);
        histo.fill(1.5, 1.0);

        let path = histogram_path(dir.path(), "CloudChamber", &histo);
        write_histogram_csv(&path, &histo).expect("write");

        assert!(path.ends_with("CloudChamber_h1_EGas.csv"));
        let text = fs::read_to_string(&path).expect("read");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "#class chamber_analysis::H1");
        assert_eq!(lines[1], "#title Edep in chamber (MeV)");
        assert_eq!(lines[7], "bin,lower_edge,content,error");
        assert_eq!(lines[8], "-1,-inf,0.0000000000,0.0000000000");
        assert_eq!(lines[9], "0,0.0000000000,2.0000000000,2.0000000000");
        assert_eq!(lines[11], "2,1.0000000000,1.0000000000,1.0000000000");
        assert_eq!(lines.len(), 12);
    }

    #[test]
    fn ntuple_csv_has_column_header_then_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut nt = Ntuple::new(1, "PrimaryE", "PrimaryE");
        nt.create_column("PrimE").expect("column");
        nt.finish();
        nt.fill_column(0, 1500.0).expect("fill");
        nt.add_row().expect("row");

        let path = ntuple_path(dir.path(), "CloudChamber", &nt);
        write_ntuple_csv(&path, &nt).expect("write");

        let text = fs::read_to_string(&path).expect("read");
        assert_eq!(
            text,
            "#class chamber_analysis::Ntuple\n#title PrimaryE\n#separator 44\n\
             #column double PrimE\n1500.0000000000\n"
        );
    }
}
