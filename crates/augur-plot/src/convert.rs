//! Conversions from interpretation results to charts.

use augur_interpret::{
    Compare, EffectMethod, FeatureEffect, FeatureImportance, InteractionStrength,
    LocalExplanation, TreeSurrogate,
};

use crate::chart::{Bar, BarChart, Chart, LineChart, Series, SeriesStyle};
use crate::error::RenderError;

/// A result that can be drawn as a [`Chart`].
pub trait IntoChart {
    /// Build the chart for this result.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::EmptyResult`] when there is nothing to draw.
    fn to_chart(&self) -> Result<Chart, RenderError>;
}

impl IntoChart for Chart {
    fn to_chart(&self) -> Result<Chart, RenderError> {
        Ok(self.clone())
    }
}

impl IntoChart for FeatureImportance {
    fn to_chart(&self) -> Result<Chart, RenderError> {
        if self.features.is_empty() {
            return Err(RenderError::EmptyResult {
                chart: "feature importance",
            });
        }
        let compare = match self.compare {
            Compare::Difference => "increase",
            Compare::Ratio => "ratio",
        };
        Ok(Chart::Bars(BarChart {
            title: "Permutation feature importance".to_string(),
            x_label: format!("{} loss {compare}", self.loss.to_string().to_uppercase()),
            bars: self
                .features
                .iter()
                .map(|f| Bar {
                    label: f.feature.clone(),
                    value: f.importance,
                    whisker: Some((f.lower, f.upper)),
                })
                .collect(),
        }))
    }
}

impl IntoChart for InteractionStrength {
    fn to_chart(&self) -> Result<Chart, RenderError> {
        if self.features.is_empty() {
            return Err(RenderError::EmptyResult {
                chart: "interaction strength",
            });
        }
        let mut entries: Vec<_> = self.features.iter().collect();
        entries.sort_by(|a, b| b.h_statistic.total_cmp(&a.h_statistic));
        Ok(Chart::Bars(BarChart {
            title: "Overall interaction strength".to_string(),
            x_label: "H-statistic".to_string(),
            bars: entries
                .into_iter()
                .map(|e| Bar {
                    label: e.feature.clone(),
                    value: e.h_statistic,
                    whisker: None,
                })
                .collect(),
        }))
    }
}

impl IntoChart for FeatureEffect {
    fn to_chart(&self) -> Result<Chart, RenderError> {
        if self.grid.is_empty() || self.average.len() != self.grid.len() {
            return Err(RenderError::EmptyResult {
                chart: "feature effect",
            });
        }
        let curve = |values: &[f64]| -> Vec<(f64, f64)> {
            self.grid.iter().copied().zip(values.iter().copied()).collect()
        };

        let mut series: Vec<Series> = self
            .ice
            .iter()
            .map(|ice| Series {
                points: curve(ice),
                style: SeriesStyle::Background,
            })
            .collect();
        series.push(Series {
            points: curve(&self.average),
            style: SeriesStyle::Emphasis,
        });

        let (title, y_label) = match self.method {
            EffectMethod::PdpIce => (
                format!("Partial dependence and ICE: {}", self.feature),
                match self.center_at {
                    Some(c) => format!("prediction relative to {}", trim_float(c)),
                    None => "predicted outcome".to_string(),
                },
            ),
            EffectMethod::Ale => (
                format!("Accumulated local effects: {}", self.feature),
                "ALE".to_string(),
            ),
        };
        Ok(Chart::Lines(LineChart {
            title,
            x_label: self.feature.clone(),
            y_label,
            series,
        }))
    }
}

impl IntoChart for TreeSurrogate {
    fn to_chart(&self) -> Result<Chart, RenderError> {
        if self.leaves.is_empty() {
            return Err(RenderError::EmptyResult {
                chart: "surrogate tree",
            });
        }
        Ok(Chart::Bars(BarChart {
            title: format!(
                "Surrogate tree, depth {} (R\u{b2} = {:.3})",
                self.max_depth, self.r_squared
            ),
            x_label: "mean predicted outcome".to_string(),
            bars: self
                .leaves
                .iter()
                .map(|leaf| Bar {
                    label: format!("{} (n={})", leaf.rule, leaf.n_samples),
                    value: leaf.mean,
                    whisker: None,
                })
                .collect(),
        }))
    }
}

impl IntoChart for LocalExplanation {
    fn to_chart(&self) -> Result<Chart, RenderError> {
        if self.features.is_empty() {
            return Err(RenderError::EmptyResult {
                chart: "local explanation",
            });
        }
        Ok(Chart::Bars(BarChart {
            title: format!(
                "Local explanation, row {} (model {:.3}, local {:.3})",
                self.instance_index, self.model_prediction, self.local_prediction
            ),
            x_label: "effect".to_string(),
            bars: self
                .features
                .iter()
                .map(|e| Bar {
                    label: format!("{} = {}", e.feature, trim_float(e.value)),
                    value: e.effect,
                    whisker: None,
                })
                .collect(),
        }))
    }
}

/// Short form of a float for labels: at most four decimals, no trailing zeros.
fn trim_float(v: f64) -> String {
    let s = format!("{v:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}
