//! Shared result type for PDP/ICE and ALE.

/// Which method produced a [`FeatureEffect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectMethod {
    /// Partial dependence with individual conditional expectation curves.
    PdpIce,
    /// Accumulated local effects.
    Ale,
}

/// The effect of one feature on the prediction along a grid of values.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FeatureEffect {
    /// Feature name.
    pub feature: String,
    /// Producing method.
    pub method: EffectMethod,
    /// Grid values (ALE: interval borders), ascending.
    pub grid: Vec<f64>,
    /// Average effect at each grid value (the PDP curve or the ALE curve).
    pub average: Vec<f64>,
    /// One ICE curve per data row, aligned with `grid`. Empty for ALE.
    pub ice: Vec<Vec<f64>>,
    /// Rows per interval, `grid.len() - 1` entries. Empty for PDP.
    pub counts: Vec<usize>,
    /// Value every curve was anchored to zero at, if centred.
    pub center_at: Option<f64>,
}
