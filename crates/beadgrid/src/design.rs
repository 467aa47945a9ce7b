//! Persisted design record: the serde contract consumed by the external
//! design store. The core defines the shape; storage itself lives outside.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::grid::PixelGrid;
use crate::sampler::SampleMode;

/// A snapshot of a design: the grid plus the parameters that produced it
/// and the display hints of the editing surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignRecord {
    /// Opaque record id.
    pub id: String,
    /// Grid rows.
    pub rows: usize,
    /// Grid columns.
    pub cols: usize,
    /// Cell edge length used by the editing surface, in pixels.
    pub cell_size_px: u32,
    /// Sampling mode the quantizer used.
    pub mode: SampleMode,
    /// Whether blocks were edge-trimmed.
    pub edge_trim: bool,
    /// Active palette subset: brand → color names.
    pub palette_selection: BTreeMap<String, Vec<String>>,
    /// Display hint: render cell labels.
    pub show_text: bool,
    /// Display hint: render reference lines.
    pub show_reference_lines: bool,
    /// Creation time, milliseconds since the Unix epoch.
    pub created_at_ms: u64,
    /// Last update time, milliseconds since the Unix epoch.
    pub updated_at_ms: u64,
    /// The design grid itself.
    pub grid: PixelGrid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb8;
    use crate::grid::PixelCell;
    use crate::palette::PaletteId;

    #[test]
    fn record_round_trips_through_json() {
        let mut grid = PixelGrid::new(2, 2);
        grid.set(
            0,
            1,
            PixelCell::Bead {
                rgb: Rgb8::new(255, 0, 0),
                palette_id: PaletteId::new("Hama", "Red"),
                confidence: 1.0,
            },
        );
        let mut selection = BTreeMap::new();
        selection.insert("Hama".to_string(), vec!["Red".to_string(), "White".to_string()]);

        let record = DesignRecord {
            id: "design-0001".to_string(),
            rows: 2,
            cols: 2,
            cell_size_px: 24,
            mode: SampleMode::Dominant,
            edge_trim: true,
            palette_selection: selection,
            show_text: false,
            show_reference_lines: true,
            created_at_ms: 1_700_000_000_000,
            updated_at_ms: 1_700_000_060_000,
            grid,
        };

        let json = serde_json::to_string(&record).unwrap();
        let back: DesignRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
        // The mode serializes under its wire spelling.
        assert!(json.contains("\"dominant\""));
    }
}
