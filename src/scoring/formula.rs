//! Risk formulas: how one matrix row turns a weight into a value, and how a
//! scope's values reduce to a single score.

use crate::config::NztaSettings;
use crate::matrix::ControlWeightSet;
use crate::questionnaire::RiskCalculation;

pub trait RiskFormula: Send + Sync {
    fn name(&self) -> &'static str;

    /// Value of one (control, risk) pair. A missing row counts as zero.
    fn contribution(&self, weight: i64, row: Option<&ControlWeightSet>) -> f64;

    /// Score for a set of pair values.
    fn reduce(&self, values: &[f64]) -> f64;
}

/// Worst single finding dominates.
#[derive(Debug, Clone, Copy, Default)]
pub struct Maximum;

impl RiskFormula for Maximum {
    fn name(&self) -> &'static str {
        "Maximum"
    }

    fn contribution(&self, weight: i64, row: Option<&ControlWeightSet>) -> f64 {
        match row {
            Some(row) => weight as f64 * f64::from(row.likelihood) * f64::from(row.impact),
            None => 0.0,
        }
    }

    fn reduce(&self, values: &[f64]) -> f64 {
        values.iter().copied().fold(0.0, f64::max)
    }
}

/// Additive model with penalties as multiplicative discounts.
#[derive(Debug, Clone, Copy)]
pub struct NztaApprox {
    pub penalty_scale: f64,
    pub floor: f64,
}

impl Default for NztaApprox {
    fn default() -> Self {
        NztaApprox::from(&NztaSettings::default())
    }
}

impl From<&NztaSettings> for NztaApprox {
    fn from(settings: &NztaSettings) -> Self {
        Self {
            penalty_scale: settings.penalty_scale,
            floor: settings.floor,
        }
    }
}

impl RiskFormula for NztaApprox {
    fn name(&self) -> &'static str {
        "NztaApproxRepresentation"
    }

    fn contribution(&self, weight: i64, row: Option<&ControlWeightSet>) -> f64 {
        let Some(row) = row else {
            return 0.0;
        };
        let likelihood_discount = 1.0 - f64::from(row.likelihood_penalty) / self.penalty_scale;
        let impact_discount = 1.0 - f64::from(row.impact_penalty) / self.penalty_scale;

        weight as f64
            * f64::from(row.likelihood)
            * f64::from(row.impact)
            * likelihood_discount
            * impact_discount
    }

    fn reduce(&self, values: &[f64]) -> f64 {
        values.iter().sum::<f64>().max(self.floor)
    }
}

/// Formula selected by a questionnaire's risk calculation.
pub fn formula_for(calculation: RiskCalculation, nzta: &NztaSettings) -> Box<dyn RiskFormula> {
    match calculation {
        RiskCalculation::Maximum => Box::new(Maximum),
        RiskCalculation::NztaApproxRepresentation => Box::new(NztaApprox::from(nzta)),
    }
}
