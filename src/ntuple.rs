//! Tabular record streams
//!
//! An ntuple is declared column by column, then locked with [`Ntuple::finish`].
//! Rows are built by setting column values on a pending row and committing it
//! with [`Ntuple::add_row`].

use crate::backend::{ColumnId, NtupleId};
use crate::AnalysisError;

#[derive(Debug, Clone)]
pub struct Ntuple {
    id: NtupleId,
    name: String,
    title: String,
    columns: Vec<String>,
    pending: Vec<f64>,
    rows: Vec<Vec<f64>>,
    finished: bool,
}

impl Ntuple {
    pub fn new(id: NtupleId, name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            title: title.into(),
            columns: Vec::new(),
            pending: Vec::new(),
            rows: Vec::new(),
            finished: false,
        }
    }

    pub fn id(&self) -> NtupleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Declare a `f64` column. Ids follow declaration order, starting at 0.
    pub fn create_column(&mut self, name: impl Into<String>) -> Result<ColumnId, AnalysisError> {
        if self.finished {
            return Err(AnalysisError::NtupleLocked(self.id));
        }

        self.columns.push(name.into());
        Ok(self.columns.len() - 1)
    }

    /// Lock the column layout. Calling it again is harmless.
    pub fn finish(&mut self) {
        self.finished = true;
        self.pending = vec![0.0; self.columns.len()];
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn fill_column(&mut self, column: ColumnId, value: f64) -> Result<(), AnalysisError> {
        if !self.finished {
            return Err(AnalysisError::NtupleNotFinished(self.id));
        }

        let slot = self
            .pending
            .get_mut(column)
            .ok_or(AnalysisError::UnknownColumn {
                ntuple: self.id,
                column,
            })?;
        *slot = value;
        Ok(())
    }

    /// Commit the pending row. Columns not set since the last commit are 0.
    pub fn add_row(&mut self) -> Result<(), AnalysisError> {
        if !self.finished {
            return Err(AnalysisError::NtupleNotFinished(self.id));
        }

        let row = std::mem::replace(&mut self.pending, vec![0.0; self.columns.len()]);
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_ids_follow_declaration_order() {
        let mut nt = Ntuple::new(0, "NtupleE", "Edep");
        assert_eq!(nt.create_column("Egas").ok(), Some(0));
        assert_eq!(nt.create_column("Lgas").ok(), Some(1));
        nt.finish();
        assert_eq!(nt.columns(), ["Egas", "Lgas"]);
    }

    #[test]
    fn finished_layout_is_locked() {
        let mut nt = Ntuple::new(3, "n", "t");
        nt.finish();
        assert!(matches!(
            nt.create_column("late"),
            Err(AnalysisError::NtupleLocked(3))
        ));
    }

    #[test]
    fn rows_need_a_finished_layout() {
        let mut nt = Ntuple::new(1, "n", "t");
        nt.create_column("a").expect("column");
        assert!(matches!(
            nt.fill_column(0, 1.0),
            Err(AnalysisError::NtupleNotFinished(1))
        ));
        assert!(matches!(nt.add_row(), Err(AnalysisError::NtupleNotFinished(1))));
    }

    #[test]
    fn add_row_commits_and_resets() {
        let mut nt = Ntuple::new(0, "NtupleE", "Edep");
        nt.create_column("Egas").expect("column");
        nt.create_column("Lgas").expect("column");
        nt.finish();

        nt.fill_column(0, 0.3).expect("fill");
        nt.fill_column(1, 120.0).expect("fill");
        nt.add_row().expect("row");
        nt.fill_column(1, 7.0).expect("fill");
        nt.add_row().expect("row");

        assert_eq!(nt.rows(), [vec![0.3, 120.0], vec![0.0, 7.0]]);
    }

    #[test]
    fn unknown_column_is_rejected() {
        let mut nt = Ntuple::new(1, "PrimaryE", "PrimaryE");
        nt.create_column("PrimE").expect("column");
        nt.finish();
        assert!(matches!(
            nt.fill_column(4, 1.0),
            Err(AnalysisError::UnknownColumn { ntuple: 1, column: 4 })
        ));
    }
}
