//! Static SVG rendering of interpretation results.
//!
//! Every result type from `augur-interpret` implements [`IntoChart`];
//! [`PlotExporter`] lays the chart out at a fixed size and writes it to
//! disk.

mod chart;
mod convert;
mod error;
mod exporter;
mod svg;

pub use chart::{Bar, BarChart, Chart, LineChart, Series, SeriesStyle};
pub use convert::IntoChart;
pub use error::RenderError;
pub use exporter::{PlotExporter, PlotFile};
