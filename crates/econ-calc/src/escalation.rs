//! Escalation of scalar amounts and monthly series.
//!
//! Elapsed time is measured in whole months from the escalation start. Values
//! before the start are left unescalated.

use econ_core::{EscalationFrequency, EscalationKind, EscalationModel};

fn elapsed_years(model: &EscalationModel, elapsed_months: i32) -> f64 {
    match model.frequency {
        EscalationFrequency::Monthly => f64::from(elapsed_months) / 12.0,
        EscalationFrequency::Yearly => f64::from(elapsed_months.div_euclid(12)),
    }
}

/// Escalate `value` by `elapsed_months` under `model`.
///
/// Example:
/// let m = EscalationModel { kind: EscalationKind::Pct, rate: 10.0, frequency: EscalationFrequency::Yearly };
/// assert!((escalate_value(100.0, Some(&m), 24) - 121.0).abs() < 1e-9);
pub fn escalate_value(value: f64, model: Option<&EscalationModel>, elapsed_months: i32) -> f64 {
    let Some(model) = model else {
        return value;
    };
    if elapsed_months <= 0 {
        return value;
    }
    let years = elapsed_years(model, elapsed_months);
    match model.kind {
        EscalationKind::Pct => value * (1.0 + model.rate / 100.0).powf(years),
        EscalationKind::Dollar => value + model.rate * years,
    }
}

/// Escalate a monthly series whose index 0 sits `start_offset` months after the
/// escalation start (negative when the series begins before it).
pub fn escalate_series(
    values: &[f64],
    model: Option<&EscalationModel>,
    start_offset: i32,
) -> Vec<f64> {
    if model.is_none() {
        return values.to_vec();
    }
    values
        .iter()
        .enumerate()
        .map(|(i, v)| escalate_value(*v, model, start_offset + i as i32))
        .collect()
}
