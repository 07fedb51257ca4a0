//! Minimal SVG document builder.

/// An SVG document assembled element by element.
pub(crate) struct SvgDocument {
    width: f64,
    height: f64,
    body: String,
}

/// Escape text for use in SVG content and attributes.
pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Text anchoring for [`SvgDocument::text`].
#[derive(Clone, Copy)]
pub(crate) enum Anchor {
    Middle,
    End,
}

impl Anchor {
    fn as_str(self) -> &'static str {
        match self {
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

impl SvgDocument {
    pub(crate) fn new(width: f64, height: f64) -> Self {
        let mut doc = Self {
            width,
            height,
            body: String::new(),
        };
        doc.rect(0.0, 0.0, width, height, "#ffffff", None);
        doc
    }

    pub(crate) fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: &str, stroke: Option<&str>) {
        let stroke = stroke.map_or(String::new(), |s| format!(" stroke=\"{s}\""));
        self.body.push_str(&format!(
            "  <rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{fill}\"{stroke}/>\n",
            w.max(0.0),
            h.max(0.0)
        ));
    }

    pub(crate) fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: &str, width: f64) {
        self.body.push_str(&format!(
            "  <line x1=\"{x1:.2}\" y1=\"{y1:.2}\" x2=\"{x2:.2}\" y2=\"{y2:.2}\" stroke=\"{stroke}\" stroke-width=\"{width}\"/>\n"
        ));
    }

    pub(crate) fn polyline(&mut self, points: &[(f64, f64)], stroke: &str, width: f64, opacity: f64) {
        let coords: Vec<String> = points.iter().map(|(x, y)| format!("{x:.2},{y:.2}")).collect();
        self.body.push_str(&format!(
            "  <polyline points=\"{}\" fill=\"none\" stroke=\"{stroke}\" stroke-width=\"{width}\" stroke-opacity=\"{opacity}\"/>\n",
            coords.join(" ")
        ));
    }

    pub(crate) fn circle(&mut self, cx: f64, cy: f64, r: f64, fill: &str) {
        self.body.push_str(&format!(
            "  <circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{r:.2}\" fill=\"{fill}\"/>\n"
        ));
    }

    pub(crate) fn text(&mut self, x: f64, y: f64, size: f64, anchor: Anchor, content: &str) {
        self.body.push_str(&format!(
            "  <text x=\"{x:.2}\" y=\"{y:.2}\" font-family=\"sans-serif\" font-size=\"{size:.1}\" text-anchor=\"{}\">{}</text>\n",
            anchor.as_str(),
            escape(content)
        ));
    }

    /// Text rotated 90° counter-clockwise around its anchor point.
    pub(crate) fn vertical_text(&mut self, x: f64, y: f64, size: f64, content: &str) {
        self.body.push_str(&format!(
            "  <text x=\"{x:.2}\" y=\"{y:.2}\" font-family=\"sans-serif\" font-size=\"{size:.1}\" text-anchor=\"middle\" transform=\"rotate(-90 {x:.2} {y:.2})\">{}</text>\n",
            escape(content)
        ));
    }

    pub(crate) fn finish(self) -> String {
        let mut svg = String::new();
        svg.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        svg.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n",
            w = self.width.round(),
            h = self.height.round()
        ));
        svg.push_str(&self.body);
        svg.push_str("</svg>\n");
        svg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn document_is_wrapped() {
        let mut doc = SvgDocument::new(100.0, 50.0);
        doc.text(1.0, 2.0, 10.0, Anchor::End, "x <= 3");
        let svg = doc.finish();
        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains("width=\"100\" height=\"50\""));
        assert!(svg.contains("text-anchor=\"end\">x &lt;= 3</text>"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
