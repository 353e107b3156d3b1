//! In-memory analysis backend writing CSV files
//!
//! Histograms and ntuples are kept in memory for the whole session and only
//! hit the disk on [`AnalysisBackend::write`]. Each object gets its own file,
//! prefixed with the session file name.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::backend::{AnalysisBackend, ColumnId, HistoId, NtupleId};
use crate::histogram::H1;
use crate::ntuple::Ntuple;
use crate::output::{
    histogram_path, ntuple_path, write_histogram_csv, write_manifest_json, write_ntuple_csv,
    Manifest,
};
use crate::AnalysisError;

pub const FILE_TYPE: &str = "csv";

#[derive(Debug)]
pub struct CsvAnalysisManager {
    output_root: PathBuf,
    verbose_level: u8,
    ntuple_merging: bool,
    histo_directory: String,
    ntuple_directory: String,
    file_name: String,
    file_open: bool,
    histograms: Vec<H1>,
    ntuples: Vec<Ntuple>,
    written: Vec<PathBuf>,
}

impl CsvAnalysisManager {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            verbose_level: 0,
            ntuple_merging: false,
            histo_directory: String::new(),
            ntuple_directory: String::new(),
            file_name: String::new(),
            file_open: false,
            histograms: Vec::new(),
            ntuples: Vec::new(),
            written: Vec::new(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn is_file_open(&self) -> bool {
        self.file_open
    }

    pub fn ntuple_merging(&self) -> bool {
        self.ntuple_merging
    }

    pub fn histograms(&self) -> &[H1] {
        &self.histograms
    }

    pub fn ntuple(&self, id: NtupleId) -> Option<&Ntuple> {
        self.ntuples.get(id)
    }

    pub fn ntuple_count(&self) -> usize {
        self.ntuples.len()
    }

    /// Files produced by the last successful [`AnalysisBackend::write`].
    pub fn written_files(&self) -> &[PathBuf] {
        &self.written
    }

    fn histo_dir(&self) -> PathBuf {
        self.output_root.join(&self.histo_directory)
    }

    fn ntuple_dir(&self) -> PathBuf {
        self.output_root.join(&self.ntuple_directory)
    }

    fn ntuple_mut(&mut self, id: NtupleId) -> Result<&mut Ntuple, AnalysisError> {
        self.ntuples
            .get_mut(id)
            .ok_or(AnalysisError::UnknownNtuple(id))
    }
}

impl AnalysisBackend for CsvAnalysisManager {
    fn set_verbose_level(&mut self, level: u8) {
        self.verbose_level = level;
    }

    fn set_ntuple_merging(&mut self, merge: bool) {
        // single-threaded: rows already land in one place, only report it
        self.ntuple_merging = merge;
    }

    fn set_histo_directory_name(&mut self, name: &str) {
        self.histo_directory = name.to_string();
    }

    fn set_ntuple_directory_name(&mut self, name: &str) {
        self.ntuple_directory = name.to_string();
    }

    fn open_file(&mut self, name: &str) -> Result<(), AnalysisError> {
        if self.file_open {
            return Err(AnalysisError::FileAlreadyOpen(self.file_name.clone()));
        }

        self.file_name = name.to_string();
        fs::create_dir_all(self.histo_dir())?;
        fs::create_dir_all(self.ntuple_dir())?;
        self.file_open = true;

        if self.verbose_level >= 1 {
            debug!(file = %name, root = %self.output_root.display(), "opened analysis file");
        }
        Ok(())
    }

    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn file_type(&self) -> &str {
        FILE_TYPE
    }

    fn create_h1(
        &mut self,
        name: &str,
        title: &str,
        bins: usize,
        lower: f64,
        upper: f64,
    ) -> Result<HistoId, AnalysisError> {
        self.histograms.push(H1::new(name, title, bins, lower, upper)?);
        let id = self.histograms.len() - 1;

        if self.verbose_level >= 1 {
            debug!(id, name, bins, lower, upper, "created h1");
        }
        Ok(id)
    }

    fn create_ntuple(&mut self, name: &str, title: &str) -> Result<NtupleId, AnalysisError> {
        let id = self.ntuples.len();
        self.ntuples.push(Ntuple::new(id, name, title));

        if self.verbose_level >= 1 {
            debug!(id, name, "created ntuple");
        }
        Ok(id)
    }

    fn create_ntuple_d_column(
        &mut self,
        ntuple: NtupleId,
        name: &str,
    ) -> Result<ColumnId, AnalysisError> {
        self.ntuple_mut(ntuple)?.create_column(name)
    }

    fn finish_ntuple(&mut self, ntuple: NtupleId) -> Result<(), AnalysisError> {
        self.ntuple_mut(ntuple)?.finish();
        Ok(())
    }

    fn fill_h1(&mut self, id: HistoId, value: f64, weight: f64) -> Result<(), AnalysisError> {
        let histo = self
            .histograms
            .get_mut(id)
            .ok_or(AnalysisError::UnknownHistogram(id))?;
        histo.fill(value, weight);
        Ok(())
    }

    fn h1(&self, id: HistoId) -> Option<&H1> {
        self.histograms.get(id)
    }

    fn h1_mut(&mut self, id: HistoId) -> Option<&mut H1> {
        self.histograms.get_mut(id)
    }

    fn h1_count(&self) -> usize {
        self.histograms.len()
    }

    fn fill_ntuple_d_column(
        &mut self,
        ntuple: NtupleId,
        column: ColumnId,
        value: f64,
    ) -> Result<(), AnalysisError> {
        self.ntuple_mut(ntuple)?.fill_column(column, value)
    }

    fn add_ntuple_row(&mut self, ntuple: NtupleId) -> Result<(), AnalysisError> {
        self.ntuple_mut(ntuple)?.add_row()
    }

    fn write(&mut self) -> Result<(), AnalysisError> {
        if !self.file_open {
            return Err(AnalysisError::FileNotOpen);
        }

        let mut manifest = Manifest::new(&self.file_name, FILE_TYPE, self.ntuple_merging);

        let histo_dir = self.histo_dir();
        for histo in &self.histograms {
            let path = histogram_path(&histo_dir, &self.file_name, histo);
            write_histogram_csv(&path, histo)?;
            if self.verbose_level >= 2 {
                debug!(path = %path.display(), "wrote h1");
            }
            manifest.histograms.push(path);
        }

        let ntuple_dir = self.ntuple_dir();
        for ntuple in &self.ntuples {
            let path = ntuple_path(&ntuple_dir, &self.file_name, ntuple);
            write_ntuple_csv(&path, ntuple)?;
            if self.verbose_level >= 2 {
                debug!(path = %path.display(), rows = ntuple.row_count(), "wrote ntuple");
            }
            manifest.ntuples.push(path);
        }

        let manifest_path = self
            .output_root
            .join(format!("{}_manifest.json", self.file_name));
        write_manifest_json(&manifest_path, &manifest)?;

        self.written = manifest
            .histograms
            .into_iter()
            .chain(manifest.ntuples)
            .chain(std::iter::once(manifest_path))
            .collect();

        if self.verbose_level >= 1 {
            debug!(files = self.written.len(), "wrote analysis file");
        }
        Ok(())
    }

    fn close_file(&mut self) -> Result<(), AnalysisError> {
        if !self.file_open {
            return Err(AnalysisError::FileNotOpen);
        }

        self.file_open = false;
        if self.verbose_level >= 1 {
            debug!(file = %self.file_name, "closed analysis file");
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.histograms.clear();
        self.ntuples.clear();
        self.file_open = false;
        self.histo_directory.clear();
        self.ntuple_directory.clear();
    }
}
