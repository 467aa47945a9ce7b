//! Bead palettes: ordered color sets with perceptual nearest-entry queries.
//!
//! A [`Palette`] is an ordered sequence of [`PaletteEntry`] values with
//! unique `(brand, name)` ids. Lab coordinates are computed once at
//! construction so per-query matching is a pure ΔE2000 scan.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::color::{delta_e_2000, rgb_to_lab, Lab, ParseColorError, Rgb8};

/// Unique identifier of a palette color: brand plus color name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaletteId {
    /// Bead brand, e.g. "Hama" or "Perler".
    pub brand: String,
    /// Brand-specific color name.
    pub name: String,
}

impl PaletteId {
    /// Construct an id from brand and name.
    pub fn new(brand: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            brand: brand.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for PaletteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.brand, self.name)
    }
}

/// One palette color with its cached Lab coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteEntry {
    /// Unique id within the palette.
    pub id: PaletteId,
    /// sRGB value of the bead color.
    pub rgb: Rgb8,
    /// Lab coordinates derived from `rgb` at construction.
    pub lab: Lab,
}

/// Palette errors.
#[derive(Debug, Clone, PartialEq)]
pub enum PaletteError {
    /// The palette has no entries.
    Empty,
    /// Two entries share the same `(brand, name)` id.
    DuplicateId(PaletteId),
    /// A color field failed to parse as 6-digit hex.
    ParseColor {
        /// Id of the offending record.
        id: PaletteId,
        /// Underlying parse failure.
        source: ParseColorError,
    },
    /// A selection referenced a `(brand, name)` not present in the palette.
    UnknownSelection(PaletteId),
}

impl std::fmt::Display for PaletteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaletteError::Empty => write!(f, "palette has no entries"),
            PaletteError::DuplicateId(id) => write!(f, "duplicate palette id {id}"),
            PaletteError::ParseColor { id, source } => {
                write!(f, "invalid color for {id}: {source}")
            }
            PaletteError::UnknownSelection(id) => {
                write!(f, "selection references unknown palette id {id}")
            }
        }
    }
}

impl std::error::Error for PaletteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PaletteError::ParseColor { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// One color record in the palette file: a name plus a 6-digit hex value
/// (uppercase, no `#`; a leading `#` is tolerated on load).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaletteColorRecord {
    /// Color name unique within its brand.
    pub name: String,
    /// Hex color, `RRGGBB`.
    pub color: String,
}

/// The palette file layout: brand name → color records.
pub type PaletteFile = BTreeMap<String, Vec<PaletteColorRecord>>;

/// An ordered set of bead colors with cached Lab coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
}

impl Palette {
    /// Build a palette from `(id, rgb)` pairs, preserving order.
    ///
    /// Lab coordinates are computed here and cached. Duplicate ids are
    /// rejected; duplicate colors under distinct ids are allowed (nearest
    /// queries then resolve ties by insertion order).
    pub fn from_colors(
        colors: impl IntoIterator<Item = (PaletteId, Rgb8)>,
    ) -> Result<Self, PaletteError> {
        let mut entries = Vec::new();
        let mut seen: HashSet<PaletteId> = HashSet::new();
        for (id, rgb) in colors {
            if !seen.insert(id.clone()) {
                return Err(PaletteError::DuplicateId(id));
            }
            let lab = rgb_to_lab(rgb);
            entries.push(PaletteEntry { id, rgb, lab });
        }
        Ok(Self { entries })
    }

    /// Build a palette from the palette-file layout of §palette files:
    /// brands in map order, colors in record order within each brand.
    pub fn from_file_records(file: &PaletteFile) -> Result<Self, PaletteError> {
        let mut colors = Vec::new();
        for (brand, records) in file {
            for record in records {
                let id = PaletteId::new(brand.clone(), record.name.clone());
                let rgb = Rgb8::from_hex(&record.color).map_err(|source| {
                    PaletteError::ParseColor {
                        id: id.clone(),
                        source,
                    }
                })?;
                colors.push((id, rgb));
            }
        }
        Self::from_colors(colors)
    }

    /// Restrict the palette to a selection set (`brand → names`),
    /// preserving the original entry order.
    pub fn with_selection(
        &self,
        selection: &BTreeMap<String, Vec<String>>,
    ) -> Result<Self, PaletteError> {
        let mut wanted: HashMap<&str, HashSet<&str>> = HashMap::new();
        for (brand, names) in selection {
            wanted
                .entry(brand.as_str())
                .or_default()
                .extend(names.iter().map(String::as_str));
        }

        let have: HashSet<(&str, &str)> = self
            .entries
            .iter()
            .map(|e| (e.id.brand.as_str(), e.id.name.as_str()))
            .collect();
        for (&brand, names) in &wanted {
            for &name in names {
                if !have.contains(&(brand, name)) {
                    return Err(PaletteError::UnknownSelection(PaletteId::new(brand, name)));
                }
            }
        }

        let entries = self
            .entries
            .iter()
            .filter(|e| {
                wanted
                    .get(e.id.brand.as_str())
                    .is_some_and(|names| names.contains(e.id.name.as_str()))
            })
            .cloned()
            .collect();
        Ok(Self { entries })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the palette has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    /// Find the perceptually nearest entry to `lab` by ΔE2000.
    ///
    /// Ties resolve to the earliest-inserted entry. Fails on an empty
    /// palette.
    pub fn nearest(&self, lab: Lab) -> Result<(&PaletteEntry, f64), PaletteError> {
        let mut best: Option<(usize, f64)> = None;
        for (i, entry) in self.entries.iter().enumerate() {
            let de = delta_e_2000(lab, entry.lab);
            match best {
                Some((_, best_de)) if de >= best_de => {}
                _ => best = Some((i, de)),
            }
        }
        best.map(|(i, de)| (&self.entries[i], de))
            .ok_or(PaletteError::Empty)
    }
}

/// Map a ΔE2000 match distance to a reported confidence in `[0, 1]`.
///
/// Distances under 2 (generally imperceptible) are full confidence; the
/// score then decays linearly and reaches zero at ΔE = 17.
pub fn match_confidence(delta_e: f64) -> f32 {
    if delta_e < 2.0 {
        1.0
    } else {
        (1.0 - (delta_e - 2.0) / 15.0).max(0.0) as f32
    }
}
