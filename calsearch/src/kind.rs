use serde::{Deserialize, Serialize};
use std::fmt;

/// Calibration frame kinds that can be associated with a science exposure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationKind {
    /// Detector bias frame
    Bias,
    /// Flat-field frame
    Flat,
    /// ThAr wavelength-reference frame
    Wavelength,
    /// Order-definition frame
    OrderDefinition,
    /// Format-check frame
    FormatCheck,
    /// Spectrophotometric standard star
    Standard,
}

impl CalibrationKind {
    /// Every kind, in the order the engine processes them
    pub const ALL: [CalibrationKind; 6] = [
        CalibrationKind::Bias,
        CalibrationKind::Flat,
        CalibrationKind::Wavelength,
        CalibrationKind::OrderDefinition,
        CalibrationKind::FormatCheck,
        CalibrationKind::Standard,
    ];

    /// Short lowercase label (`bias`, `flat`, `wav`, `ord`, `fmt`, `std`)
    pub fn label(&self) -> &'static str {
        match self {
            CalibrationKind::Bias => "bias",
            CalibrationKind::Flat => "flat",
            CalibrationKind::Wavelength => "wav",
            CalibrationKind::OrderDefinition => "ord",
            CalibrationKind::FormatCheck => "fmt",
            CalibrationKind::Standard => "std",
        }
    }
}

impl fmt::Display for CalibrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label().to_uppercase())
    }
}

/// One value per calibration kind.
///
/// Used for quotas, per-kind selections and found counts so that every kind
/// is always present and serialises in a fixed field order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerKind<T> {
    pub bias: T,
    pub flat: T,
    pub wavelength: T,
    pub order_definition: T,
    pub format_check: T,
    pub standard: T,
}

impl<T> PerKind<T> {
    /// Build by evaluating `f` once per kind, in [`CalibrationKind::ALL`] order
    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(CalibrationKind) -> T,
    {
        Self {
            bias: f(CalibrationKind::Bias),
            flat: f(CalibrationKind::Flat),
            wavelength: f(CalibrationKind::Wavelength),
            order_definition: f(CalibrationKind::OrderDefinition),
            format_check: f(CalibrationKind::FormatCheck),
            standard: f(CalibrationKind::Standard),
        }
    }

    /// Fallible variant of [`PerKind::from_fn`]; stops at the first error
    pub fn try_from_fn<F, E>(mut f: F) -> Result<Self, E>
    where
        F: FnMut(CalibrationKind) -> Result<T, E>,
    {
        Ok(Self {
            bias: f(CalibrationKind::Bias)?,
            flat: f(CalibrationKind::Flat)?,
            wavelength: f(CalibrationKind::Wavelength)?,
            order_definition: f(CalibrationKind::OrderDefinition)?,
            format_check: f(CalibrationKind::FormatCheck)?,
            standard: f(CalibrationKind::Standard)?,
        })
    }

    pub fn get(&self, kind: CalibrationKind) -> &T {
        match kind {
            CalibrationKind::Bias => &self.bias,
            CalibrationKind::Flat => &self.flat,
            CalibrationKind::Wavelength => &self.wavelength,
            CalibrationKind::OrderDefinition => &self.order_definition,
            CalibrationKind::FormatCheck => &self.format_check,
            CalibrationKind::Standard => &self.standard,
        }
    }

    pub fn get_mut(&mut self, kind: CalibrationKind) -> &mut T {
        match kind {
            CalibrationKind::Bias => &mut self.bias,
            CalibrationKind::Flat => &mut self.flat,
            CalibrationKind::Wavelength => &mut self.wavelength,
            CalibrationKind::OrderDefinition => &mut self.order_definition,
            CalibrationKind::FormatCheck => &mut self.format_check,
            CalibrationKind::Standard => &mut self.standard,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (CalibrationKind, &T)> {
        CalibrationKind::ALL
            .into_iter()
            .map(move |kind| (kind, self.get(kind)))
    }

    pub fn map<U, F>(&self, mut f: F) -> PerKind<U>
    where
        F: FnMut(CalibrationKind, &T) -> U,
    {
        PerKind::from_fn(|kind| f(kind, self.get(kind)))
    }
}

impl PerKind<usize> {
    /// Largest value across all kinds
    pub fn largest(&self) -> usize {
        self.iter().map(|(_, v)| *v).max().unwrap_or(0)
    }
}
