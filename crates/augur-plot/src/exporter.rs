//! Writing charts to SVG files.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::convert::IntoChart;
use crate::error::RenderError;

/// The six images a pipeline run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotFile {
    /// Permutation feature importance.
    Importance,
    /// Interaction strength.
    Interaction,
    /// Partial dependence with ICE curves.
    PdpIce,
    /// Accumulated local effects.
    Ale,
    /// Global surrogate tree.
    SurrogateTree,
    /// Local surrogate.
    Lime,
}

impl PlotFile {
    /// All plot files in pipeline order.
    pub const ALL: [PlotFile; 6] = [
        PlotFile::Importance,
        PlotFile::Interaction,
        PlotFile::PdpIce,
        PlotFile::Ale,
        PlotFile::SurrogateTree,
        PlotFile::Lime,
    ];

    /// Fixed file name, e.g. `pdp_ice.svg`.
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            PlotFile::Importance => "importance.svg",
            PlotFile::Interaction => "interaction.svg",
            PlotFile::PdpIce => "pdp_ice.svg",
            PlotFile::Ale => "ale.svg",
            PlotFile::SurrogateTree => "surrogate_tree.svg",
            PlotFile::Lime => "lime.svg",
        }
    }

    /// Path inside `dir`, optionally prefixed with `{prefix}_`.
    #[must_use]
    pub fn path_in(self, dir: &Path, prefix: Option<&str>) -> PathBuf {
        match prefix {
            Some(p) => dir.join(format!("{p}_{}", self.file_name())),
            None => dir.join(self.file_name()),
        }
    }
}

/// Renders interpretation results to SVG files.
///
/// # Defaults
///
/// | Parameter  | Default |
/// |------------|---------|
/// | `width_in` | 6.0     |
/// | `height_in`| 6.0     |
/// | `dpi`      | 96.0    |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotExporter {
    width_in: f64,
    height_in: f64,
    dpi: f64,
}

impl Default for PlotExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PlotExporter {
    /// Create an exporter with default dimensions (576 × 576 px).
    #[must_use]
    pub fn new() -> Self {
        Self {
            width_in: 6.0,
            height_in: 6.0,
            dpi: 96.0,
        }
    }

    /// Set the image size in inches.
    #[must_use]
    pub fn with_size(mut self, width_in: f64, height_in: f64) -> Self {
        self.width_in = width_in;
        self.height_in = height_in;
        self
    }

    /// Set the resolution in dots per inch.
    #[must_use]
    pub fn with_dpi(mut self, dpi: f64) -> Self {
        self.dpi = dpi;
        self
    }

    /// Image size in pixels.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidDimensions`] unless every dimension is
    /// finite and positive.
    pub fn pixel_size(&self) -> Result<(f64, f64), RenderError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !(valid(self.width_in) && valid(self.height_in) && valid(self.dpi)) {
            return Err(RenderError::InvalidDimensions {
                width_in: self.width_in,
                height_in: self.height_in,
                dpi: self.dpi,
            });
        }
        Ok((self.width_in * self.dpi, self.height_in * self.dpi))
    }

    /// Render a result to an SVG string.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RenderError::InvalidDimensions`] | non-positive or non-finite size |
    /// | [`RenderError::EmptyResult`] | the result has nothing to draw |
    pub fn render<R: IntoChart + ?Sized>(&self, result: &R) -> Result<String, RenderError> {
        let (width, height) = self.pixel_size()?;
        let chart = result.to_chart()?;
        Ok(chart.render(width, height))
    }

    /// Render a result and write it to `path`, replacing any existing file.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Everything [`PlotExporter::render`] returns, plus
    /// [`RenderError::CreateDir`] and [`RenderError::WriteFile`].
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn export<R: IntoChart + ?Sized>(&self, result: &R, path: &Path) -> Result<(), RenderError> {
        let svg = self.render(result)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| RenderError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        debug!(bytes = svg.len(), "writing svg");
        std::fs::write(path, &svg).map_err(|source| RenderError::WriteFile {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "plot exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{Bar, BarChart, Chart};

    fn chart() -> Chart {
        Chart::Bars(BarChart {
            title: "t".into(),
            x_label: "x".into(),
            bars: vec![Bar {
                label: "a".into(),
                value: 1.0,
                whisker: None,
            }],
        })
    }

    #[test]
    fn default_size_is_576_pixels() {
        assert_eq!(PlotExporter::new().pixel_size().unwrap(), (576.0, 576.0));
        let svg = PlotExporter::new().render(&chart()).unwrap();
        assert!(svg.contains("width=\"576\" height=\"576\""));
    }

    #[test]
    fn invalid_dimensions_rejected() {
        let err = PlotExporter::new().with_dpi(0.0).render(&chart()).unwrap_err();
        assert!(matches!(err, RenderError::InvalidDimensions { .. }));
        assert!(PlotExporter::new().with_size(f64::NAN, 4.0).pixel_size().is_err());
    }

    #[test]
    fn file_names() {
        let dir = Path::new("out");
        assert_eq!(PlotFile::PdpIce.path_in(dir, None), dir.join("pdp_ice.svg"));
        assert_eq!(
            PlotFile::SurrogateTree.path_in(dir, Some("crime")),
            dir.join("crime_surrogate_tree.svg")
        );
        assert_eq!(PlotFile::ALL.len(), 6);
    }

    #[test]
    fn export_creates_directories_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/importance.svg");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "stale").unwrap();

        PlotExporter::new().export(&chart(), &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<?xml"));

        let fresh = dir.path().join("new_dir/lime.svg");
        PlotExporter::new().with_size(4.0, 3.0).export(&chart(), &fresh).unwrap();
        let written = std::fs::read_to_string(&fresh).unwrap();
        assert!(written.contains("width=\"384\" height=\"288\""));
    }

    #[test]
    fn unwritable_target_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should go.
        let path = dir.path().join("taken.svg");
        std::fs::create_dir(&path).unwrap();
        let err = PlotExporter::new().export(&chart(), &path).unwrap_err();
        assert!(matches!(err, RenderError::WriteFile { .. }));
    }
}
