//! Revenue seam. Pricing lives upstream; the engine only consumes its output.

use serde::{Deserialize, Serialize};

use econ_core::{OwnershipSplit, PhaseRevenue, Product, Timeline, VolumeResult};

/// Upstream source of net revenue per sold product.
pub trait RevenueSource: Send + Sync {
    fn revenue(
        &self,
        well_id: &str,
        timeline: &Timeline,
        volumes: &VolumeResult,
        ownership: &OwnershipSplit,
    ) -> PhaseRevenue;
}

/// Constant price per unit times NRI sales volume.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatPriceRevenue {
    /// $/bbl
    #[serde(default)]
    pub oil: f64,
    /// $/mcf
    #[serde(default)]
    pub gas: f64,
    #[serde(default)]
    pub ngl: f64,
    #[serde(default)]
    pub drip_condensate: f64,
}

impl FlatPriceRevenue {
    pub fn price(&self, product: Product) -> f64 {
        match product {
            Product::Oil => self.oil,
            Product::Gas => self.gas,
            Product::Ngl => self.ngl,
            Product::DripCondensate => self.drip_condensate,
        }
    }
}

impl RevenueSource for FlatPriceRevenue {
    fn revenue(
        &self,
        _well_id: &str,
        timeline: &Timeline,
        volumes: &VolumeResult,
        ownership: &OwnershipSplit,
    ) -> PhaseRevenue {
        let n = timeline.months;
        let net = |product: Product| -> Vec<f64> {
            let sales = volumes.sales.product(product);
            let nri = ownership.phase(product).map(|p| p.nri.as_slice()).unwrap_or(&[]);
            let price = self.price(product);
            (0..n)
                .map(|i| {
                    sales.get(i).copied().unwrap_or(0.0)
                        * nri.get(i).copied().unwrap_or(0.0)
                        * price
                })
                .collect()
        };
        PhaseRevenue {
            oil: net(Product::Oil),
            gas: net(Product::Gas),
            ngl: net(Product::Ngl),
            drip_condensate: net(Product::DripCondensate),
        }
    }
}
