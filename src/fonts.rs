//! Bundled chart font.
//!
//! Charts are rendered without system font lookup, so the bitmap backends
//! need a registered face before any caption or tick label is drawn.

use crate::error::{PlotError, Result};
use plotters::style::{register_font, FontStyle};
use std::path::Path;
use std::sync::OnceLock;

/// Family name used by every text style in the crate
pub const FAMILY: &str = "sans-serif";

static DEJAVU_SANS: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

static REGISTERED: OnceLock<bool> = OnceLock::new();

/// Register the bundled face under [`FAMILY`]. Idempotent; `output` only
/// names the chart in the error.
pub fn ensure_registered(output: &Path) -> Result<()> {
    let ok = *REGISTERED
        .get_or_init(|| register_font(FAMILY, FontStyle::Normal, DEJAVU_SANS).is_ok());
    if ok {
        Ok(())
    } else {
        Err(PlotError::render(output, "bundled font could not be loaded"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_font_registers_once() {
        let out = Path::new("chart.png");
        ensure_registered(out).unwrap();
        ensure_registered(out).unwrap();
    }
}
