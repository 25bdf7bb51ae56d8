//! Line-marker styles

use owo_colors::Style;

/// Styles for the marker printed in front of each output line.
#[derive(Default, Clone, Copy)]
pub struct Styles {
    pub success: Style,
    pub warning: Style,
    pub info: Style,
    pub step: Style,
}

impl Styles {
    /// Markers without escape codes.
    #[must_use]
    pub fn plain() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn colored() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().yellow(),
            info: Style::new().blue(),
            step: Style::new().bold().cyan(),
        }
    }
}
