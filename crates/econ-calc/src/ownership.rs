//! Ownership interests laid onto a timeline.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use econ_core::calendar::month_offset;
use econ_core::{
    Interest, OwnershipBasis, OwnershipModel, OwnershipSplit, PhaseOwnership, Product, Timeline,
};

/// Interest in effect during the month of `date`.
///
/// A dated series holds its first value before its start and its last value
/// after its end.
pub fn interest_at(interest: &Interest, date: NaiveDate) -> f64 {
    match interest {
        Interest::Scalar(v) => *v,
        Interest::Monthly { start, values } => {
            let Some(last) = values.len().checked_sub(1) else {
                return 0.0;
            };
            let idx = usize::try_from(month_offset(*start, date).max(0)).unwrap_or(0);
            values[idx.min(last)]
        }
    }
}

pub fn interest_series(interest: &Interest, timeline: &Timeline) -> Vec<f64> {
    timeline.dates().map(|d| interest_at(interest, d)).collect()
}

fn phase_nri(model: &OwnershipModel, product: Product) -> &Interest {
    let specific = match product {
        Product::Oil => &model.oil_nri,
        Product::Gas => &model.gas_nri,
        Product::Ngl => &model.ngl_nri,
        Product::DripCondensate => &model.drip_condensate_nri,
    };
    specific.as_ref().unwrap_or(&model.nri)
}

/// Per-product WI / NRI / lease NRI series on `timeline`.
pub fn ownership_split(model: &OwnershipModel, timeline: &Timeline) -> OwnershipSplit {
    let wi = interest_series(&model.wi, timeline);
    let lease = interest_series(model.lease_nri.as_ref().unwrap_or(&model.nri), timeline);
    let phases: BTreeMap<Product, PhaseOwnership> = Product::ALL
        .iter()
        .map(|p| {
            (
                *p,
                PhaseOwnership {
                    wi: wi.clone(),
                    nri: interest_series(phase_nri(model, *p), timeline),
                    lease_nri: lease.clone(),
                },
            )
        })
        .collect();
    OwnershipSplit { phases }
}

/// Net fraction per month for an expense charged on `basis`.
pub fn basis_series(split: &OwnershipSplit, basis: OwnershipBasis, len: usize) -> Vec<f64> {
    let oil = split.phase(Product::Oil);
    let pick = |v: Option<&Vec<f64>>| -> Vec<f64> {
        let mut out = v.cloned().unwrap_or_default();
        out.resize(len, 0.0);
        out
    };
    match basis {
        OwnershipBasis::Wi => pick(oil.map(|p| &p.wi)),
        OwnershipBasis::Nri => pick(oil.map(|p| &p.nri)),
        OwnershipBasis::LeaseNri => pick(oil.map(|p| &p.lease_nri)),
        OwnershipBasis::OneHundredPctWi => vec![1.0; len],
    }
}
