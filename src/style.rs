use serde::Serialize;

/// Closed set of labels with their own visual encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLabel {
    Critical,
    Surplus,
    Stale,
    Normal,
}

impl StatusLabel {
    /// Unknown labels fall back to `Normal`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "critical" => StatusLabel::Critical,
            "surplus" => StatusLabel::Surplus,
            "stale" => StatusLabel::Stale,
            _ => StatusLabel::Normal,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            StatusLabel::Critical => "#EF4444",
            StatusLabel::Surplus => "#10B981",
            StatusLabel::Stale => "#9CA3AF",
            StatusLabel::Normal => "#3B82F6",
        }
    }

    /// Stale markers are dimmed.
    pub fn fill_opacity(&self) -> f64 {
        match self {
            StatusLabel::Stale => 0.5,
            _ => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkerStyle {
    pub label: StatusLabel,
    pub color: &'static str,
    pub fill_opacity: f64,
    pub radius: u32,
    pub stroke_color: &'static str,
    pub stroke_weight: u32,
}

pub fn resolve_style(display_status: &str) -> MarkerStyle {
    let label = StatusLabel::parse(display_status);
    MarkerStyle {
        label,
        color: label.color(),
        fill_opacity: label.fill_opacity(),
        radius: 8,
        stroke_color: "#fff",
        stroke_weight: 2,
    }
}
