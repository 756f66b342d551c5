//! Fixed-text watermark overlay.
//!
//! Every produced segment carries a text watermark burned into the
//! bottom-right corner via FFmpeg's `drawtext` filter, with a small drop
//! shadow for readability on light footage.

/// Default watermark text.
pub const DEFAULT_WATERMARK_TEXT: &str = "V-Chopz by VLTRN";

/// Configuration for the drawtext overlay.
#[derive(Debug, Clone)]
pub struct WatermarkConfig {
    /// Overlay text
    pub text: String,
    /// Font size in points
    pub font_size: u32,
    /// Inset from the right edge, in pixels
    pub inset_x: u32,
    /// Inset from the bottom edge, in pixels
    pub inset_y: u32,
    /// Text opacity (0.0 to 1.0)
    pub opacity: f32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            text: DEFAULT_WATERMARK_TEXT.to_string(),
            font_size: 24,
            inset_x: 10,
            inset_y: 10,
            opacity: 0.85,
        }
    }
}

impl WatermarkConfig {
    /// Override the overlay text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set text opacity (clamped to 0.0..=1.0).
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Build the drawtext filter string.
    ///
    /// `w-tw-X:h-th-Y` anchors the text X pixels from the right edge and Y
    /// pixels from the bottom edge.
    pub fn to_drawtext_filter(&self) -> String {
        format!(
            "drawtext=text='{}':x=w-tw-{}:y=h-th-{}:fontsize={}:fontcolor=white@{:.2}:shadowcolor=black@0.6:shadowx=2:shadowy=2",
            escape_drawtext(&self.text),
            self.inset_x,
            self.inset_y,
            self.font_size,
            self.opacity,
        )
    }
}

/// Escape characters that are special inside a drawtext value.
fn escape_drawtext(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
        .replace('%', "\\%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_anchors_bottom_right() {
        let filter = WatermarkConfig::default().to_drawtext_filter();
        assert!(filter.contains("x=w-tw-10"));
        assert!(filter.contains("y=h-th-10"));
        assert!(filter.contains("fontsize=24"));
        assert!(filter.contains("V-Chopz by VLTRN"));
    }

    #[test]
    fn test_escaping() {
        let filter = WatermarkConfig::default()
            .with_text("100%: it's done")
            .to_drawtext_filter();
        assert!(filter.contains("100\\%\\: it\\'s done"));
    }

    #[test]
    fn test_opacity_clamping() {
        let config = WatermarkConfig::default().with_opacity(1.5);
        assert!((config.opacity - 1.0).abs() < f32::EPSILON);
    }
}
