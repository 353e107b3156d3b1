//! Analysis backend seam
//!
//! The recorder talks to its histogram/ntuple engine only through this trait.
//! Histogram, ntuple and column ids are positional: each `create_*` call hands
//! out the next id, starting at 0.

use crate::histogram::H1;
use crate::AnalysisError;

pub type HistoId = usize;
pub type NtupleId = usize;
pub type ColumnId = usize;

pub trait AnalysisBackend {
    fn set_verbose_level(&mut self, level: u8);

    /// Request merging of ntuple rows produced by worker threads.
    fn set_ntuple_merging(&mut self, merge: bool);

    fn set_histo_directory_name(&mut self, name: &str);

    fn set_ntuple_directory_name(&mut self, name: &str);

    fn open_file(&mut self, name: &str) -> Result<(), AnalysisError>;

    /// Name of the current (or last attempted) output file, without extension.
    fn file_name(&self) -> &str;

    fn file_type(&self) -> &str;

    fn create_h1(
        &mut self,
        name: &str,
        title: &str,
        bins: usize,
        lower: f64,
        upper: f64,
    ) -> Result<HistoId, AnalysisError>;

    fn create_ntuple(&mut self, name: &str, title: &str) -> Result<NtupleId, AnalysisError>;

    fn create_ntuple_d_column(
        &mut self,
        ntuple: NtupleId,
        name: &str,
    ) -> Result<ColumnId, AnalysisError>;

    fn finish_ntuple(&mut self, ntuple: NtupleId) -> Result<(), AnalysisError>;

    fn fill_h1(&mut self, id: HistoId, value: f64, weight: f64) -> Result<(), AnalysisError>;

    fn h1(&self, id: HistoId) -> Option<&H1>;

    fn h1_mut(&mut self, id: HistoId) -> Option<&mut H1>;

    fn h1_count(&self) -> usize;

    fn fill_ntuple_d_column(
        &mut self,
        ntuple: NtupleId,
        column: ColumnId,
        value: f64,
    ) -> Result<(), AnalysisError>;

    fn add_ntuple_row(&mut self, ntuple: NtupleId) -> Result<(), AnalysisError>;

    /// Flush every histogram and ntuple to the open file.
    fn write(&mut self) -> Result<(), AnalysisError>;

    fn close_file(&mut self) -> Result<(), AnalysisError>;

    /// Tear the session down: drop all declarations and file state.
    fn clear(&mut self);
}
