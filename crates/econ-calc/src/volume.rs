//! Wellhead to unshrunk to sales volumes, byproducts, ownership splits and BOE.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use econ_core::{
    safe_div, DrivenBy, EngineConfig, OwnershipKey, OwnershipSplit, PhaseVolumes, Product,
    ProductionSeries, RatePhase, RiskingModel, ShutInWindow, StreamProperties, Timeline,
    VolumeResult,
};

use crate::shut_in::{monthly_multiplier, ShutInStream};

/// Runs the volume chain for one well.
#[derive(Clone, Copy, Debug)]
pub struct VolumeCalculator<'a> {
    pub stream: &'a StreamProperties,
    pub risking: &'a RiskingModel,
    pub config: &'a EngineConfig,
    pub shut_ins: &'a [ShutInWindow],
}

fn scale(v: &[f64], f: f64) -> Vec<f64> {
    v.iter().map(|x| x * f).collect()
}

/// Byproduct barrels from gas mcf at `yield_per_mmcf`.
fn byproduct(parent_gas: &[f64], yield_per_mmcf: f64, risk: f64) -> Vec<f64> {
    parent_gas
        .iter()
        .map(|g| g / 1000.0 * yield_per_mmcf * risk)
        .collect()
}

fn boe(v: &PhaseVolumes, gas_factor: f64) -> Vec<f64> {
    (0..v.oil.len())
        .map(|i| v.oil[i] + v.ngl[i] + v.drip_condensate[i] + safe_div(v.gas[i], gas_factor))
        .collect()
}

impl<'a> VolumeCalculator<'a> {
    /// Volumes on `timeline`, zero after the month of `cutoff`.
    pub fn compute(
        &self,
        production: &ProductionSeries,
        timeline: &Timeline,
        ownership: &OwnershipSplit,
        cutoff: NaiveDate,
    ) -> VolumeResult {
        let src = production.timeline();
        let n = timeline.months;
        let producing = self.producing_mask(timeline, cutoff);
        let gross = |phase| {
            let v = timeline.align(&production.volume(phase), &src);
            crate::mul(&v, &producing)
        };
        let s = self.stream;
        let r = self.risking;

        let oil_raw = gross(RatePhase::Oil);
        let gas_raw = gross(RatePhase::Gas);
        let water_raw = gross(RatePhase::Water);

        let oil_loss = 1.0 - s.oil_loss_pct / 100.0;
        let gas_loss = (1.0 - s.gas_loss_pct / 100.0) * (1.0 - s.gas_flare_pct / 100.0);

        let mut wellhead = PhaseVolumes::zeros(n);
        wellhead.oil = scale(&oil_raw, r.oil);
        wellhead.gas = scale(&gas_raw, r.gas);
        wellhead.water = scale(&water_raw, r.water);

        let mut unshrunk = PhaseVolumes::zeros(n);
        unshrunk.oil = scale(&wellhead.oil, oil_loss);
        unshrunk.gas = scale(&wellhead.gas, gas_loss);
        unshrunk.water = wellhead.water.clone();

        let parent = match s.driven_by {
            DrivenBy::Risked => unshrunk.gas.clone(),
            DrivenBy::Unrisked => scale(&gas_raw, gas_loss),
        };
        let ngl = byproduct(&parent, s.ngl_yield, r.ngl);
        let drip = byproduct(&parent, s.drip_condensate_yield, r.drip_condensate);
        let compositional: BTreeMap<String, Vec<f64>> = if self.config.compositional_economics {
            s.compositional
                .iter()
                .map(|c| (c.name.clone(), byproduct(&parent, c.yield_per_mmcf, c.risk)))
                .collect()
        } else {
            BTreeMap::new()
        };
        for stage in [&mut wellhead, &mut unshrunk] {
            stage.ngl = ngl.clone();
            stage.drip_condensate = drip.clone();
            stage.compositional = compositional.clone();
        }

        let sales = PhaseVolumes {
            oil: scale(&unshrunk.oil, s.oil_shrink_pct / 100.0),
            gas: scale(&unshrunk.gas, s.gas_shrink_pct / 100.0),
            water: unshrunk.water.clone(),
            ngl,
            drip_condensate: drip,
            compositional,
        };

        let by_key = ownership_volumes(&sales, ownership, n);
        let wellhead_boe = boe(&wellhead, self.config.wet_gas_boe_factor);
        let sales_boe = boe(&sales, self.config.dry_gas_boe_factor);
        let net_boe = by_key
            .get("nri")
            .map(|v| boe(v, self.config.dry_gas_boe_factor))
            .unwrap_or_else(|| vec![0.0; n]);
        let mcfe = scale(&sales_boe, self.config.mcfe_factor);
        let net_mcfe = scale(&net_boe, self.config.mcfe_factor);

        VolumeResult {
            wellhead,
            unshrunk,
            sales,
            ownership: by_key,
            wellhead_boe,
            boe: sales_boe,
            mcfe,
            net_boe,
            net_mcfe,
        }
    }

    /// Production shut-in multiplier with months after the cutoff zeroed.
    fn producing_mask(&self, timeline: &Timeline, cutoff: NaiveDate) -> Vec<f64> {
        let mut m = monthly_multiplier(timeline, self.shut_ins, ShutInStream::Production);
        let last = timeline.offset_of(cutoff);
        for (i, v) in m.iter_mut().enumerate() {
            if i as i32 > last {
                *v = 0.0;
            }
        }
        m
    }
}

/// Sales volumes keyed by `gross`, `wi`, `nri` and `lease_nri`.
fn ownership_volumes(
    sales: &PhaseVolumes,
    split: &OwnershipSplit,
    n: usize,
) -> BTreeMap<String, PhaseVolumes> {
    let key_series = |product: Product, key: OwnershipKey| -> Vec<f64> {
        let mut v = split
            .phase(product)
            .map(|p| p.get(key))
            .unwrap_or_default();
        v.resize(n, 0.0);
        v
    };
    let mut out = BTreeMap::new();
    out.insert("gross".to_string(), sales.clone());
    for (name, key) in [
        ("wi", OwnershipKey::Wi),
        ("nri", OwnershipKey::Nri),
        ("lease_nri", OwnershipKey::LeaseNri),
    ] {
        let oil_f = key_series(Product::Oil, key);
        let wi_f = key_series(Product::Oil, OwnershipKey::Wi);
        let water_f = if key == OwnershipKey::Wi { &wi_f } else { &oil_f };
        let compositional = sales
            .compositional
            .iter()
            .map(|(k, v)| (k.clone(), crate::mul(v, &key_series(Product::Ngl, key))))
            .collect();
        out.insert(
            name.to_string(),
            PhaseVolumes {
                oil: crate::mul(&sales.oil, &oil_f),
                gas: crate::mul(&sales.gas, &key_series(Product::Gas, key)),
                water: crate::mul(&sales.water, water_f),
                ngl: crate::mul(&sales.ngl, &key_series(Product::Ngl, key)),
                drip_condensate: crate::mul(
                    &sales.drip_condensate,
                    &key_series(Product::DripCondensate, key),
                ),
                compositional,
            },
        );
    }
    out
}
