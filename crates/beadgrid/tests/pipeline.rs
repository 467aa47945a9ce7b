//! End-to-end scenarios driving the public API.

use std::cell::RefCell;

use beadgrid::{
    analyze_cells, detect_grid, quantize, recognize, AnalyzerConfig, CancelToken, DetectorConfig,
    Palette, PaletteId, PixelCell, QuantizeSpec, RecognizeConfig, RecognizeError, Rgb8,
    SampleMode,
};
use image::{Rgba, RgbaImage};

fn palette(colors: &[(&str, [u8; 3])]) -> Palette {
    Palette::from_colors(
        colors
            .iter()
            .map(|&(name, rgb)| (PaletteId::new("Test", name), Rgb8::new(rgb[0], rgb[1], rgb[2]))),
    )
    .unwrap()
}

fn fill_disk(img: &mut RgbaImage, cx: f64, cy: f64, radius: f64, rgb: [u8; 3]) {
    let (w, h) = img.dimensions();
    let scan = radius.ceil() as i64;
    for dy in -scan..=scan {
        for dx in -scan..=scan {
            let px = cx.round() as i64 + dx;
            let py = cy.round() as i64 + dy;
            if px < 0 || py < 0 || px >= w as i64 || py >= h as i64 {
                continue;
            }
            let d = (((px as f64 - cx).powi(2)) + ((py as f64 - cy).powi(2))).sqrt();
            if d <= radius {
                img.put_pixel(px as u32, py as u32, Rgba([rgb[0], rgb[1], rgb[2], 255]));
            }
        }
    }
}

/// A 25×25 board on a 16 px lattice at origin (24, 24), optionally leaving
/// out cells and coloring beads per cell.
fn board(
    pick: impl Fn(usize, usize) -> Option<[u8; 3]>,
) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(432, 432, Rgba([255, 255, 255, 255]));
    for row in 0..25 {
        for col in 0..25 {
            if let Some(rgb) = pick(row, col) {
                let cx = 24.0 + col as f64 * 16.0;
                let cy = 24.0 + row as f64 * 16.0;
                fill_disk(&mut img, cx, cy, 6.0, rgb);
            }
        }
    }
    img
}

// ── synthesis ──────────────────────────────────────────────────────────

#[test]
fn checkerboard_quantization_is_exact() {
    let img = RgbaImage::from_fn(4, 4, |x, y| {
        if (x + y) % 2 == 0 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 255, 255])
        }
    });
    let palette = palette(&[
        ("red", [255, 0, 0]),
        ("blue", [0, 0, 255]),
        ("gray", [128, 128, 128]),
    ]);
    let spec = QuantizeSpec {
        width: 4,
        height: 4,
        mode: SampleMode::Original,
        edge_trim: false,
    };
    let grid = quantize(&img, &spec, &palette).unwrap();
    assert_eq!((grid.rows(), grid.cols()), (4, 4));
    for (r, c, cell) in grid.iter() {
        let expected = if (r + c) % 2 == 0 { "red" } else { "blue" };
        match cell {
            PixelCell::Bead {
                palette_id,
                confidence,
                ..
            } => {
                assert_eq!(palette_id.name, expected, "cell ({r},{c})");
                assert_eq!(*confidence, 1.0);
            }
            PixelCell::Empty => panic!("unexpected empty cell"),
        }
    }
}

#[test]
fn average_mode_splits_a_two_tone_image() {
    let img = RgbaImage::from_fn(10, 10, |x, _| {
        if x < 5 {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 255])
        }
    });
    let palette = palette(&[
        ("white", [255, 255, 255]),
        ("black", [0, 0, 0]),
        ("gray", [128, 128, 128]),
    ]);
    let spec = QuantizeSpec {
        width: 2,
        height: 1,
        mode: SampleMode::Average,
        edge_trim: false,
    };
    let grid = quantize(&img, &spec, &palette).unwrap();
    assert_eq!((grid.rows(), grid.cols()), (1, 2));
    let name = |cell: &PixelCell| match cell {
        PixelCell::Bead { palette_id, .. } => palette_id.name.clone(),
        PixelCell::Empty => unreachable!(),
    };
    assert_eq!(name(grid.get(0, 0)), "white");
    assert_eq!(name(grid.get(0, 1)), "black");
}

#[test]
fn duplicate_palette_colors_resolve_to_the_first_entry() {
    let palette = Palette::from_colors([
        (PaletteId::new("Test", "A"), Rgb8::new(100, 100, 100)),
        (PaletteId::new("Test", "B"), Rgb8::new(100, 100, 100)),
    ])
    .unwrap();
    let img = RgbaImage::from_pixel(4, 4, Rgba([100, 100, 100, 255]));
    let spec = QuantizeSpec {
        width: 2,
        height: 2,
        mode: SampleMode::Average,
        edge_trim: false,
    };
    let grid = quantize(&img, &spec, &palette).unwrap();
    for (_, _, cell) in grid.iter() {
        match cell {
            PixelCell::Bead { palette_id, .. } => assert_eq!(palette_id.name, "A"),
            PixelCell::Empty => unreachable!(),
        }
    }
}

// ── recognition ────────────────────────────────────────────────────────

#[test]
fn detects_the_synthetic_lattice_geometry() {
    let img = board(|_, _| Some([40, 40, 40]));
    let model = detect_grid(&img, &DetectorConfig::default()).unwrap();
    assert!(
        model.pitch_x >= 15.5 && model.pitch_x <= 16.5,
        "pitch {}",
        model.pitch_x
    );
    assert_eq!((model.rows, model.cols), (25, 25));
}

#[test]
fn occupancy_matches_the_rendered_pattern() {
    // Roughly every third lattice column left blank. Column 23 stays
    // occupied so the rightmost column keeps enough neighbors for the
    // detector's isolation filter.
    let skip = |_row: usize, col: usize| col % 3 == 2 && col != 23;
    let img = board(|r, c| (!skip(r, c)).then_some([40, 40, 40]));
    let model = detect_grid(&img, &DetectorConfig::default()).unwrap();
    assert_eq!((model.rows, model.cols), (25, 25));

    let cells = analyze_cells(&img, &model, &AnalyzerConfig::default());
    let rendered: usize = (0..25)
        .flat_map(|r| (0..25).map(move |c| (r, c)))
        .filter(|&(r, c)| !skip(r, c))
        .count();
    let occupied = cells.iter().filter(|c| c.occupied).count();
    assert_eq!(
        occupied, rendered,
        "morphology must neither remove nor add cells"
    );
    for cell in &cells {
        assert_eq!(cell.occupied, !skip(cell.row, cell.col), "cell ({}, {})", cell.row, cell.col);
    }
}

#[test]
fn recognizes_a_two_color_board() {
    let skip = |_row: usize, col: usize| col % 3 == 2 && col != 23;
    let red = [180, 20, 20];
    let blue = [20, 20, 200];
    let img = board(|r, c| {
        (!skip(r, c)).then_some(if (r + c) % 2 == 0 { red } else { blue })
    });
    let palette = palette(&[
        ("red", red),
        ("blue", blue),
        ("white", [255, 255, 255]),
        ("gray", [128, 128, 128]),
    ]);

    let cancel = CancelToken::new();
    let grid = recognize(
        &img,
        &palette,
        &RecognizeConfig::default(),
        &mut |_| {},
        &cancel,
    )
    .unwrap();

    assert_eq!((grid.rows(), grid.cols()), (25, 25));
    let rendered: usize = (0..25)
        .flat_map(|r| (0..25).map(move |c| (r, c)))
        .filter(|&(r, c)| !skip(r, c))
        .count();
    assert_eq!(grid.bead_count(), rendered);

    for (r, c, cell) in grid.iter() {
        match cell {
            PixelCell::Bead {
                palette_id,
                confidence,
                ..
            } => {
                assert!(!skip(r, c), "bead where none was rendered at ({r},{c})");
                let expected = if (r + c) % 2 == 0 { "red" } else { "blue" };
                assert_eq!(palette_id.name, expected, "cell ({r},{c})");
                assert!(*confidence > 0.0);
            }
            PixelCell::Empty => assert!(skip(r, c), "missing bead at ({r},{c})"),
        }
    }
}

#[test]
fn recognition_normalizes_partial_boards() {
    // Beads only in the 12×12 sub-lattice spanning rows/cols 6..18, with
    // three interior columns left blank. The boundary columns keep their
    // inward neighbors occupied.
    let in_subboard = |r: usize, c: usize| (6..18).contains(&r) && (6..18).contains(&c);
    let skip = |_r: usize, c: usize| matches!(c, 8 | 11 | 14);
    let img = board(|r, c| (in_subboard(r, c) && !skip(r, c)).then_some([40, 40, 40]));
    let palette = palette(&[("black", [40, 40, 40]), ("white", [255, 255, 255])]);
    let cancel = CancelToken::new();
    let grid = recognize(
        &img,
        &palette,
        &RecognizeConfig::default(),
        &mut |_| {},
        &cancel,
    )
    .unwrap();
    // The detector only sees the populated region, and normalization pins
    // the first occupied row/column to zero.
    assert_eq!((grid.rows(), grid.cols()), (12, 12));
    let rendered: usize = (0..25)
        .flat_map(|r| (0..25).map(move |c| (r, c)))
        .filter(|&(r, c)| in_subboard(r, c) && !skip(r, c))
        .count();
    assert_eq!(grid.bead_count(), rendered);
}

#[test]
fn grid_not_found_carries_diagnostics() {
    let img = RgbaImage::from_pixel(300, 300, Rgba([210, 210, 210, 255]));
    let palette = palette(&[("gray", [128, 128, 128])]);
    let cancel = CancelToken::new();
    match recognize(
        &img,
        &palette,
        &RecognizeConfig::default(),
        &mut |_| {},
        &cancel,
    ) {
        Err(RecognizeError::GridNotFound { debug }) => {
            assert_eq!(debug.candidate_count, 0);
            assert!(debug.projection_attempted);
        }
        other => panic!("expected GridNotFound, got {other:?}"),
    }
}

#[test]
fn cancellation_after_detect_stops_the_pipeline() {
    let img = board(|_r, c| (c % 3 != 2).then_some([40, 40, 40]));
    let palette = palette(&[("black", [40, 40, 40]), ("white", [255, 255, 255])]);

    let cancel = CancelToken::new();
    let seen = RefCell::new(Vec::new());
    let result = {
        let cancel_inner = cancel.clone();
        let mut on_progress = |p: beadgrid::Progress| {
            seen.borrow_mut().push(p.fraction);
            // Fire as soon as the detect phase reports completion.
            if p.fraction >= 0.45 {
                cancel_inner.cancel();
            }
        };
        recognize(
            &img,
            &palette,
            &RecognizeConfig::default(),
            &mut on_progress,
            &cancel,
        )
    };

    assert!(matches!(result, Err(RecognizeError::Cancelled)));
    let max_seen = seen
        .borrow()
        .iter()
        .cloned()
        .fold(0.0f32, f32::max);
    assert!(
        max_seen <= 0.45 + 1e-6,
        "per-cell work observed after cancellation: {max_seen}"
    );
}
