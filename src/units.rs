//! Unit system and best-unit rendering
//!
//! Energies are stored in MeV and lengths in mm. Values handed to the
//! recorder are expected in these internal units.

use std::fmt;

pub const MEV: f64 = 1.0;
pub const EV: f64 = 1.0e-6 * MEV;
pub const KEV: f64 = 1.0e-3 * MEV;
pub const GEV: f64 = 1.0e3 * MEV;
pub const TEV: f64 = 1.0e6 * MEV;
pub const PEV: f64 = 1.0e9 * MEV;
/// Electron charge in coulomb, used to express the joule in MeV.
pub const E_SI: f64 = 1.602_176_634e-19;
pub const JOULE: f64 = EV / E_SI;

pub const MM: f64 = 1.0;
pub const NM: f64 = 1.0e-6 * MM;
pub const UM: f64 = 1.0e-3 * MM;
pub const CM: f64 = 10.0 * MM;
pub const M: f64 = 1.0e3 * MM;
pub const KM: f64 = 1.0e3 * M;
pub const PARSEC: f64 = 3.085_677_580_7e16 * M;
pub const ANGSTROM: f64 = 1.0e-10 * M;
pub const FERMI: f64 = 1.0e-15 * M;

const ENERGY_UNITS: &[(&str, f64)] = &[
    ("eV", EV),
    ("keV", KEV),
    ("MeV", MEV),
    ("GeV", GEV),
    ("TeV", TEV),
    ("PeV", PEV),
    ("J", JOULE),
];

const LENGTH_UNITS: &[(&str, f64)] = &[
    ("pc", PARSEC),
    ("km", KM),
    ("m", M),
    ("cm", CM),
    ("mm", MM),
    ("um", UM),
    ("nm", NM),
    ("Ang", ANGSTROM),
    ("fm", FERMI),
];

/// Physical quantity a histogram axis is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitCategory {
    Energy,
    Length,
    Unknown,
}

impl UnitCategory {
    /// Infer the category from the first character of a histogram name.
    ///
    /// Names starting with `E` hold energies and names starting with `L`
    /// hold lengths. Every other name (and the empty name) is `Unknown`.
    pub fn from_histogram_name(name: &str) -> Self {
        match name.chars().next() {
            Some('E') => Self::Energy,
            Some('L') => Self::Length,
            _ => Self::Unknown,
        }
    }

    pub fn units(self) -> &'static [(&'static str, f64)] {
        match self {
            Self::Energy => ENERGY_UNITS,
            Self::Length => LENGTH_UNITS,
            Self::Unknown => &[],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Energy => "Energy",
            Self::Length => "Length",
            Self::Unknown => "",
        }
    }

    /// Pick the display unit for `value`.
    ///
    /// Prefers the unit giving the smallest ratio >= 1, then the unit giving
    /// the largest ratio below 1. Zero and values at or below
    /// `f64::MIN_POSITIVE` take the smallest unit of the table.
    pub fn best_unit(self, value: f64) -> Option<(&'static str, f64)> {
        let units = self.units();
        let magnitude = value.abs();

        if magnitude <= f64::MIN_POSITIVE {
            return units
                .iter()
                .copied()
                .min_by(|(_, a), (_, b)| a.total_cmp(b));
        }

        let mut above: Option<(usize, f64)> = None;
        let mut below: Option<(usize, f64)> = None;

        for (idx, &(_, unit)) in units.iter().enumerate() {
            let ratio = magnitude / unit;
            if ratio >= 1.0 {
                if above.map_or(true, |(_, best)| ratio < best) {
                    above = Some((idx, ratio));
                }
            } else if ratio > 0.0 && below.map_or(true, |(_, best)| ratio > best) {
                below = Some((idx, ratio));
            }
        }

        let index = above.or(below).map(|(idx, _)| idx).unwrap_or(0);
        units.get(index).copied()
    }
}

/// A value rendered in the best-fit unit of its category.
#[derive(Debug, Clone, Copy)]
pub struct BestUnit {
    pub value: f64,
    pub category: UnitCategory,
}

impl BestUnit {
    pub fn new(value: f64, category: UnitCategory) -> Self {
        Self { value, category }
    }
}

impl fmt::Display for BestUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.category.best_unit(self.value) {
            Some((symbol, unit)) => {
                write_significant(f, self.value / unit)?;
                write!(f, " {symbol}")
            }
            None => write_significant(f, self.value),
        }
    }
}

/// Six significant digits; exponent form below 1e-4.
fn write_significant(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    let rounded = significant(value, 6);
    if rounded != 0.0 && rounded.abs() < 1.0e-4 {
        write!(f, "{rounded:e}")
    } else {
        write!(f, "{rounded}")
    }
}

/// Round to `digits` significant digits.
fn significant(value: f64, digits: i32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }

    let magnitude = value.abs().log10().floor() as i32;
    let factor = 10_f64.powi(digits - 1 - magnitude);
    if !factor.is_finite() {
        return value;
    }
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_lookup() {
        assert_eq!(UnitCategory::from_histogram_name("EGas"), UnitCategory::Energy);
        assert_eq!(UnitCategory::from_histogram_name("LGas"), UnitCategory::Length);
        assert_eq!(UnitCategory::from_histogram_name("EPrimary"), UnitCategory::Energy);
        assert_eq!(UnitCategory::from_histogram_name("Steps"), UnitCategory::Unknown);
        assert_eq!(UnitCategory::from_histogram_name(""), UnitCategory::Unknown);
    }

    #[test]
    fn energy_picks_closest_unit_above_one() {
        assert_eq!(BestUnit::new(0.25 * MEV, UnitCategory::Energy).to_string(), "250 keV");
        assert_eq!(BestUnit::new(42.0 * GEV, UnitCategory::Energy).to_string(), "42 GeV");
        assert_eq!(BestUnit::new(3.5 * EV, UnitCategory::Energy).to_string(), "3.5 eV");
    }

    #[test]
    fn length_picks_closest_unit_above_one() {
        assert_eq!(BestUnit::new(35.0 * CM, UnitCategory::Length).to_string(), "35 cm");
        assert_eq!(BestUnit::new(1.5 * M, UnitCategory::Length).to_string(), "1.5 m");
        assert_eq!(BestUnit::new(2.0 * MM, UnitCategory::Length).to_string(), "2 mm");
    }

    #[test]
    fn tiny_value_falls_back_to_smallest_unit() {
        let text = BestUnit::new(1.0e-3 * EV, UnitCategory::Energy).to_string();
        assert_eq!(text, "0.001 eV");
    }

    #[test]
    fn zero_uses_smallest_unit() {
        assert_eq!(BestUnit::new(0.0, UnitCategory::Energy).to_string(), "0 eV");
        assert_eq!(BestUnit::new(0.0, UnitCategory::Length).to_string(), "0 fm");
        let symbol = UnitCategory::Length.best_unit(1.0e-310).map(|(symbol, _)| symbol);
        assert_eq!(symbol, Some("fm"));
    }

    #[test]
    fn subnormal_values_stay_finite() {
        assert_eq!(significant(1.0e-310, 6), 1.0e-310);
        assert_eq!(significant(-5.0e-320, 6), -5.0e-320);
        let text = BestUnit::new(1.0e-310, UnitCategory::Unknown).to_string();
        assert!(!text.contains("NaN"), "{text}");
        assert_eq!(text, "1e-310");
    }

    #[test]
    fn tiny_ratios_print_in_exponent_form() {
        assert_eq!(BestUnit::new(1.234_567e-14, UnitCategory::Unknown).to_string(), "1.23457e-14");
        let text = BestUnit::new(2.5e-9 * EV, UnitCategory::Energy).to_string();
        assert_eq!(text, "2.5e-9 eV");
    }

    #[test]
    fn unknown_category_prints_bare_value() {
        assert_eq!(BestUnit::new(12.5, UnitCategory::Unknown).to_string(), "12.5");
    }

    #[test]
    fn rounds_to_six_significant_digits() {
        assert_eq!(significant(1.234_567_89, 6), 1.234_57);
        assert_eq!(significant(-98_765.432_1, 6), -98_765.4);
    }
}
