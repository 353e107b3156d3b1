//! Measurement recorder
//!
//! Mediates between the simulation event loop and an [`AnalysisBackend`]. The
//! recorder books a fixed set of histograms and ntuples, forwards measurements
//! into them by id and saves the session at the end of a run.
//!
//! Session states: `Closed -> book() -> Open -> save() -> Closed`. A disabled
//! recorder never calls its backend.

use std::io::{self, Write};

use tracing::{error, info};

use crate::backend::{AnalysisBackend, ColumnId, HistoId, NtupleId};
use crate::config::RecorderConfig;
use crate::units::{BestUnit, UnitCategory, GEV, M, MEV};
use crate::AnalysisError;

/// Histogram declared at booking time.
#[derive(Debug, Clone, Copy)]
pub struct H1Declaration {
    pub name: &'static str,
    pub title: &'static str,
    pub bins: usize,
    pub lower: f64,
    pub upper: f64,
}

/// Ntuple declared at booking time, with its columns in id order.
#[derive(Debug, Clone, Copy)]
pub struct NtupleDeclaration {
    pub name: &'static str,
    pub title: &'static str,
    pub columns: &'static [&'static str],
}

/// Declaration order fixes the histogram ids: EGas = 0, LGas = 1, EPrimary = 2.
pub const HISTOGRAMS: [H1Declaration; 3] = [
    H1Declaration {
        name: "EGas",
        title: "Edep in chamber (MeV)",
        bins: 50,
        lower: 0.0,
        upper: 1.0 * MEV,
    },
    H1Declaration {
        name: "LGas",
        title: "trackL in chamber (mm)",
        bins: 50,
        lower: 0.0,
        upper: 1.0 * M,
    },
    H1Declaration {
        name: "EPrimary",
        title: "Energy of Primaries (MeV)",
        bins: 50,
        lower: 0.0,
        upper: 80.0 * GEV,
    },
];

/// Declaration order fixes the ntuple ids: NtupleE = 0, PrimaryE = 1.
pub const NTUPLES: [NtupleDeclaration; 2] = [
    NtupleDeclaration {
        name: "NtupleE",
        title: "Edep",
        columns: &["Egas", "Lgas"],
    },
    NtupleDeclaration {
        name: "PrimaryE",
        title: "PrimaryE",
        columns: &["PrimE"],
    },
];

/// Per-step rows go to ntuple `event_id + STEP_NTUPLE_OFFSET`.
///
/// Those per-event ntuples are never declared by [`MeasurementRecorder::book`];
/// with a backend that checks ids the step fills come back as
/// [`AnalysisError::UnknownNtuple`].
pub const STEP_NTUPLE_OFFSET: NtupleId = NTUPLES.len();

/// Columns of a per-step row: x, y, z, energy, step length.
pub const STEP_COLUMNS: usize = 5;

/// Ids returned by the backend while booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookedLayout {
    pub gas_energy: HistoId,
    pub gas_track_length: HistoId,
    pub primary_energy: HistoId,
    pub edep_ntuple: NtupleId,
    pub edep_column: ColumnId,
    pub track_length_column: ColumnId,
    pub primary_ntuple: NtupleId,
    pub primary_energy_column: ColumnId,
}

impl BookedLayout {
    /// Ids a fresh backend hands out for [`HISTOGRAMS`] and [`NTUPLES`].
    pub const POSITIONAL: Self = Self {
        gas_energy: 0,
        gas_track_length: 1,
        primary_energy: 2,
        edep_ntuple: 0,
        edep_column: 0,
        track_length_column: 1,
        primary_ntuple: 1,
        primary_energy_column: 0,
    };
}

pub struct MeasurementRecorder<B: AnalysisBackend> {
    backend: B,
    config: RecorderConfig,
    open: bool,
    booked: Option<BookedLayout>,
}

impl<B: AnalysisBackend> MeasurementRecorder<B> {
    pub fn new(backend: B, config: RecorderConfig) -> Self {
        Self {
            backend,
            config,
            open: false,
            booked: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Layout of the currently open session.
    pub fn booked(&self) -> Option<&BookedLayout> {
        self.booked.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Open the output file and declare every histogram and ntuple.
    ///
    /// A file that cannot be opened is logged and leaves the session closed;
    /// it is not an error for the caller. A failed declaration clears the
    /// backend before the error is returned, so the file is not left open.
    pub fn book(&mut self) -> Result<(), AnalysisError> {
        if !self.config.enabled {
            return Ok(());
        }

        self.backend.set_verbose_level(self.config.verbose_level);
        self.backend.set_ntuple_merging(self.config.ntuple_merging);
        self.backend
            .set_histo_directory_name(&self.config.histo_directory);
        self.backend
            .set_ntuple_directory_name(&self.config.ntuple_directory);

        if let Err(err) = self.backend.open_file(&self.config.file_name) {
            error!(
                file = %self.backend.file_name(),
                error = %err,
                "cannot open output file"
            );
            return Ok(());
        }

        match self.declare() {
            Ok(layout) => self.booked = Some(layout),
            Err(err) => {
                error!(error = %err, "declaration failed, dropping the session");
                self.backend.clear();
                return Err(err);
            }
        }
        self.open = true;

        info!(
            "Output file is open in {}.{}",
            self.backend.file_name(),
            self.backend.file_type()
        );
        Ok(())
    }

    fn declare(&mut self) -> Result<BookedLayout, AnalysisError> {
        let mut histo_ids = [0; HISTOGRAMS.len()];
        for (slot, decl) in histo_ids.iter_mut().zip(HISTOGRAMS.iter()) {
            *slot = self
                .backend
                .create_h1(decl.name, decl.title, decl.bins, decl.lower, decl.upper)?;
        }

        let mut ntuple_ids = Vec::with_capacity(NTUPLES.len());
        for decl in NTUPLES.iter() {
            let id = self.backend.create_ntuple(decl.name, decl.title)?;
            let columns = decl
                .columns
                .iter()
                .map(|column| self.backend.create_ntuple_d_column(id, column))
                .collect::<Result<Vec<_>, _>>()?;
            self.backend.finish_ntuple(id)?;
            ntuple_ids.push((id, columns));
        }

        let (edep_ntuple, edep_columns) = &ntuple_ids[0];
        let (primary_ntuple, primary_columns) = &ntuple_ids[1];
        Ok(BookedLayout {
            gas_energy: histo_ids[0],
            gas_track_length: histo_ids[1],
            primary_energy: histo_ids[2],
            edep_ntuple: *edep_ntuple,
            edep_column: edep_columns[0],
            track_length_column: edep_columns[1],
            primary_ntuple: *primary_ntuple,
            primary_energy_column: primary_columns[0],
        })
    }

    /// Add a weighted entry to histogram `id`. Unknown ids are the backend's
    /// error to raise.
    pub fn fill_histo(
        &mut self,
        id: HistoId,
        value: f64,
        weight: f64,
    ) -> Result<(), AnalysisError> {
        if !self.config.enabled {
            return Ok(());
        }
        self.backend.fill_h1(id, value, weight)
    }

    /// Scale histogram `id` by `factor`; does nothing if it does not exist.
    pub fn normalize(&mut self, id: HistoId, factor: f64) {
        if !self.config.enabled {
            return;
        }
        if let Some(histo) = self.backend.h1_mut(id) {
            histo.scale(factor);
        }
    }

    /// Append one row to the energy-deposit ntuple and one to the primary
    /// energy ntuple.
    pub fn fill_ntuple(
        &mut self,
        energy_deposit: f64,
        track_length: f64,
        primary_energy: f64,
    ) -> Result<(), AnalysisError> {
        if !self.config.enabled {
            return Ok(());
        }

        let layout = self.layout();

        self.backend
            .fill_ntuple_d_column(layout.edep_ntuple, layout.edep_column, energy_deposit)?;
        self.backend.fill_ntuple_d_column(
            layout.edep_ntuple,
            layout.track_length_column,
            track_length,
        )?;
        self.backend.add_ntuple_row(layout.edep_ntuple)?;

        self.backend.fill_ntuple_d_column(
            layout.primary_ntuple,
            layout.primary_energy_column,
            primary_energy,
        )?;
        self.backend.add_ntuple_row(layout.primary_ntuple)
    }

    /// Append one step row to the ntuple of event `event_id`.
    ///
    /// See [`STEP_NTUPLE_OFFSET`]: the target ntuples are not booked here.
    pub fn fill_ntuple_each_step(
        &mut self,
        event_id: usize,
        x: f64,
        y: f64,
        z: f64,
        energy_step: f64,
        step_size: f64,
    ) -> Result<(), AnalysisError> {
        if !self.config.enabled {
            return Ok(());
        }

        let ntuple = event_id + STEP_NTUPLE_OFFSET;
        let values: [f64; STEP_COLUMNS] = [x, y, z, energy_step, step_size];
        for (column, value) in values.into_iter().enumerate() {
            self.backend.fill_ntuple_d_column(ntuple, column, value)?;
        }
        self.backend.add_ntuple_row(ntuple)
    }

    /// Write everything, close the file and tear the backend session down.
    pub fn save(&mut self) -> Result<(), AnalysisError> {
        if !self.config.enabled || !self.open {
            return Ok(());
        }

        self.backend.write()?;
        self.backend.close_file()?;
        info!("Histograms and ntuples are saved");

        self.backend.clear();
        self.open = false;
        self.booked = None;
        Ok(())
    }

    /// Print mean and rms of every histogram to stdout.
    pub fn print_statistic(&self) -> Result<(), AnalysisError> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.write_statistic(&mut out)
    }

    pub fn write_statistic<W: Write>(&self, out: &mut W) -> Result<(), AnalysisError> {
        if !self.config.enabled || !self.open {
            return Ok(());
        }

        writeln!(out, "\n ----> print histograms statistic \n")?;
        for id in 0..self.backend.h1_count() {
            let Some(histo) = self.backend.h1(id) else {
                continue;
            };
            let category = UnitCategory::from_histogram_name(histo.name());
            writeln!(
                out,
                "{}: mean = {} rms = {}",
                histo.name(),
                BestUnit::new(histo.mean(), category),
                BestUnit::new(histo.rms(), category)
            )?;
        }
        Ok(())
    }

    fn layout(&self) -> BookedLayout {
        self.booked.unwrap_or(BookedLayout::POSITIONAL)
    }
}
