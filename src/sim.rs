//! Synthetic cloud-chamber run
//!
//! Generates toy events (primary energy, gas energy deposit, track length and
//! per-step points) and drives a [`MeasurementRecorder`] through a full run.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp1, Gamma, Normal};
use serde::Serialize;
use tracing::warn;

use crate::backend::AnalysisBackend;
use crate::recorder::{BookedLayout, MeasurementRecorder};
use crate::units::{CM, GEV, KEV, M, MM};
use crate::AnalysisError;

/// Run configuration for the synthetic chamber
#[derive(Debug, Clone, Serialize)]
pub struct ChamberConfig {
    pub events: usize,
    pub seed: u64,
    /// Primary energy range [MeV]
    pub primary_energy_min: f64,
    pub primary_energy_max: f64,
    /// Gas gap crossed by a straight track [mm]
    pub gas_thickness: f64,
    /// Mean energy loss in the gas [MeV/mm]
    pub energy_loss_per_mm: f64,
    /// Spread of the track angle to the chamber axis [rad]
    pub angular_spread: f64,
    pub steps_per_track: usize,
    /// Forward each step to the per-event step ntuples
    pub record_steps: bool,
    /// Scale every histogram by 1/events before printing
    pub normalize: bool,
}

impl Default for ChamberConfig {
    fn default() -> Self {
        Self {
            events: 1000,
            seed: 42,
            primary_energy_min: 1.0 * GEV,
            primary_energy_max: 80.0 * GEV,
            gas_thickness: 30.0 * CM,
            energy_loss_per_mm: 0.25 * KEV / MM,
            angular_spread: 0.35,
            steps_per_track: 8,
            record_steps: false,
            normalize: false,
        }
    }
}

impl ChamberConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.primary_energy_min > 0.0 && self.primary_energy_max > self.primary_energy_min) {
            return Err(AnalysisError::InvalidConfig(
                "primary energy range must be positive and non-empty".to_string(),
            ));
        }
        if !(self.gas_thickness > 0.0) || !(self.energy_loss_per_mm > 0.0) {
            return Err(AnalysisError::InvalidConfig(
                "gas_thickness and energy_loss_per_mm must be > 0".to_string(),
            ));
        }
        if !(self.angular_spread >= 0.0) {
            return Err(AnalysisError::InvalidConfig(
                "angular_spread must be >= 0".to_string(),
            ));
        }
        if self.steps_per_track == 0 {
            return Err(AnalysisError::InvalidConfig(
                "steps_per_track must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChamberStep {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub energy: f64,
    pub length: f64,
}

#[derive(Debug, Clone)]
pub struct ChamberEvent {
    pub event_id: usize,
    pub primary_energy: f64,
    pub energy_deposit: f64,
    pub track_length: f64,
    pub steps: Vec<ChamberStep>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub events: usize,
    pub total_energy_deposit: f64,
    pub mean_track_length: f64,
    pub step_rows: usize,
    pub step_failures: usize,
}

pub fn generate_event(rng: &mut StdRng, config: &ChamberConfig, event_id: usize) -> ChamberEvent {
    let primary_energy = rng.gen_range(config.primary_energy_min..config.primary_energy_max);

    let theta = match Normal::new(0.0, config.angular_spread) {
        Ok(dist) => dist.sample(rng).clamp(-1.4, 1.4),
        Err(_) => 0.0,
    };
    let phi = rng.gen_range(0.0..std::f64::consts::TAU);
    // capped at the 1 m histogram range
    let track_length = (config.gas_thickness / theta.cos()).min(1.0 * M);

    let mean_deposit = config.energy_loss_per_mm * track_length;
    let energy_deposit = match Gamma::new(4.0, mean_deposit / 4.0) {
        Ok(dist) => dist.sample(rng),
        Err(_) => mean_deposit,
    };

    let shares: Vec<f64> = (0..config.steps_per_track)
        .map(|_| Exp1.sample(rng))
        .collect();
    let share_sum: f64 = shares.iter().sum::<f64>().max(f64::MIN_POSITIVE);

    let step_length = track_length / config.steps_per_track as f64;
    let (dx, dy, dz) = (
        theta.sin() * phi.cos(),
        theta.sin() * phi.sin(),
        theta.cos(),
    );

    let steps = shares
        .iter()
        .enumerate()
        .map(|(idx, share)| {
            let s = step_length * (idx as f64 + 1.0);
            ChamberStep {
                x: dx * s,
                y: dy * s,
                z: dz * s,
                energy: energy_deposit * share / share_sum,
                length: step_length,
            }
        })
        .collect();

    ChamberEvent {
        event_id,
        primary_energy,
        energy_deposit,
        track_length,
        steps,
    }
}

/// Book, fill `config.events` events, print statistics and save.
///
/// When the output session could not be opened the events are still
/// generated and summarised, but nothing is forwarded to the backend.
pub fn run_chamber<B: AnalysisBackend>(
    recorder: &mut MeasurementRecorder<B>,
    config: &ChamberConfig,
) -> Result<RunSummary, AnalysisError> {
    config.validate()?;
    recorder.book()?;

    let layout = recorder
        .booked()
        .copied()
        .unwrap_or(BookedLayout::POSITIONAL);
    let recording = recorder.is_open();
    if recorder.is_enabled() && !recording {
        warn!("output session is not open, events are generated but not recorded");
    }
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut summary = RunSummary::default();
    let mut record_steps = recording && config.record_steps;

    for event_id in 0..config.events {
        let event = generate_event(&mut rng, config, event_id);

        if recording {
            recorder.fill_histo(layout.gas_energy, event.energy_deposit, 1.0)?;
            recorder.fill_histo(layout.gas_track_length, event.track_length, 1.0)?;
            recorder.fill_histo(layout.primary_energy, event.primary_energy, 1.0)?;
            recorder.fill_ntuple(event.energy_deposit, event.track_length, event.primary_energy)?;
        }

        if record_steps {
            for step in &event.steps {
                let filled = recorder.fill_ntuple_each_step(
                    event.event_id,
                    step.x,
                    step.y,
                    step.z,
                    step.energy,
                    step.length,
                );
                if let Err(err) = filled {
                    warn!(event = event.event_id, error = %err, "step ntuple not available, dropping step rows");
                    summary.step_failures += 1;
                    record_steps = false;
                    break;
                }
                summary.step_rows += 1;
            }
        }

        summary.events += 1;
        summary.total_energy_deposit += event.energy_deposit;
        summary.mean_track_length += event.track_length;
    }

    if summary.events > 0 {
        summary.mean_track_length /= summary.events as f64;

        if config.normalize {
            let factor = 1.0 / summary.events as f64;
            for id in [
                layout.gas_energy,
                layout.gas_track_length,
                layout.primary_energy,
            ] {
                recorder.normalize(id, factor);
            }
        }
    }

    recorder.print_statistic()?;
    recorder.save()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_reproducible() {
        let config = ChamberConfig::default();
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        let ea = generate_event(&mut a, &config, 0);
        let eb = generate_event(&mut b, &config, 0);
        assert_eq!(ea.energy_deposit, eb.energy_deposit);
        assert_eq!(ea.steps, eb.steps);
    }

    #[test]
    fn event_quantities_stay_in_range() {
        let config = ChamberConfig::default();
        let mut rng = StdRng::seed_from_u64(config.seed);
        for id in 0..200 {
            let event = generate_event(&mut rng, &config, id);
            assert!(event.primary_energy >= config.primary_energy_min);
            assert!(event.primary_energy < config.primary_energy_max);
            assert!(event.track_length >= config.gas_thickness);
            assert!(event.track_length <= 1.0 * M);
            assert!(event.energy_deposit >= 0.0);
            assert_eq!(event.steps.len(), config.steps_per_track);
        }
    }

    #[test]
    fn steps_share_the_deposit() {
        let config = ChamberConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let event = generate_event(&mut rng, &config, 0);
        let total: f64 = event.steps.iter().map(|s| s.energy).sum();
        let length: f64 = event.steps.iter().map(|s| s.length).sum();
        assert!((total - event.energy_deposit).abs() < 1e-12);
        assert!((length - event.track_length).abs() < 1e-9);
    }

    #[test]
    fn rejects_empty_energy_range() {
        let config = ChamberConfig {
            primary_energy_max: 1.0 * GEV,
            ..ChamberConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
