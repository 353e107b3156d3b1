//! chamber-analysis - measurement recording for cloud-chamber runs
//!
//! A [`MeasurementRecorder`] books a fixed set of histograms and ntuples on an
//! injected [`AnalysisBackend`], forwards per-event measurements into them and
//! saves the output at the end of a run. [`CsvAnalysisManager`] is the bundled
//! backend and writes everything as CSV.

pub mod backend;
pub mod config;
pub mod csv_manager;
pub mod histogram;
pub mod ntuple;
pub mod output;
pub mod recorder;
pub mod sim;
pub mod units;

use thiserror::Error;

pub use backend::{AnalysisBackend, ColumnId, HistoId, NtupleId};
pub use config::RecorderConfig;
pub use csv_manager::CsvAnalysisManager;
pub use histogram::H1;
pub use ntuple::Ntuple;
pub use recorder::{BookedLayout, MeasurementRecorder};
pub use sim::{run_chamber, ChamberConfig, ChamberEvent, RunSummary};
pub use units::{BestUnit, UnitCategory};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid histogram {name}: {reason}")]
    InvalidHistogram { name: String, reason: String },
    #[error("histogram {0} does not exist")]
    UnknownHistogram(HistoId),
    #[error("ntuple {0} does not exist")]
    UnknownNtuple(NtupleId),
    #[error("ntuple {ntuple} has no column {column}")]
    UnknownColumn { ntuple: NtupleId, column: ColumnId },
    #[error("ntuple {0} is already finished, no more columns can be added")]
    NtupleLocked(NtupleId),
    #[error("ntuple {0} is not finished yet")]
    NtupleNotFinished(NtupleId),
    #[error("output file {0} is already open")]
    FileAlreadyOpen(String),
    #[error("no output file is open")]
    FileNotOpen,
}
