use super::*;

fn compositor() -> Option<DecalCompositor> {
    let Ok(font) = DecalFont::system_bold_sans() else {
        eprintln!("skipping: no system fonts installed");
        return None;
    };
    Some(DecalCompositor::new(&font).unwrap())
}

fn d(n: u8) -> Option<DesignNumber> {
    Some(DesignNumber::new(n).unwrap())
}

#[test]
fn blank_name_renders_nothing() {
    let Some(mut c) = compositor() else {
        return;
    };
    assert!(c.compose("  \t", Icing::Vanilla, None).unwrap().is_none());
}

#[test]
fn compose_is_deterministic() {
    let Some(mut a) = compositor() else {
        return;
    };
    let Some(mut b) = compositor() else {
        return;
    };
    let x = a.compose("Alex Jordan Lee", Icing::Chocolate, d(3)).unwrap().unwrap();
    let y = b.compose("Alex Jordan Lee", Icing::Chocolate, d(3)).unwrap().unwrap();
    assert_eq!(x.fingerprint(), y.fingerprint());
    assert_eq!(x.rgba8_premul, y.rgba8_premul);

    let again = a.compose("Alex Jordan Lee", Icing::Chocolate, d(3)).unwrap().unwrap();
    assert!(Arc::ptr_eq(&x, &again));
}

#[test]
fn decal_is_transparent_canvas_with_colored_glyphs() {
    let Some(mut c) = compositor() else {
        return;
    };
    let img = c.compose("Mia", Icing::Strawberry, None).unwrap().unwrap();
    assert_eq!((img.width, img.height), (DECAL_CANVAS_SIZE, DECAL_CANVAS_SIZE));
    assert!(img.covered_pixels() > 0);
    assert_eq!(img.alpha_at(0, 0), 0);
    assert_eq!(img.alpha_at(1023, 1023), 0);

    let straight = img.to_straight_rgba8();
    let opaque = straight
        .chunks_exact(4)
        .find(|px| px[3] == 255)
        .expect("glyph interiors are fully covered");
    assert_eq!(&opaque[..3], &[0xC7, 0x15, 0x85]);
}

#[test]
fn text_is_rotated_to_run_vertically() {
    let Some(mut c) = compositor() else {
        return;
    };
    let img = c.compose("WWWWWWWW", Icing::Vanilla, None).unwrap().unwrap();

    let (mut min_x, mut max_x, mut min_y, mut max_y) = (u32::MAX, 0, u32::MAX, 0);
    for y in 0..img.height {
        for x in 0..img.width {
            if img.alpha_at(x, y) != 0 {
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            }
        }
    }
    // A single long line, rotated -90°, is taller than it is wide and centered on the canvas.
    assert!(max_y - min_y > max_x - min_x);
    let cy = (min_y + max_y) / 2;
    let cx = (min_x + max_x) / 2;
    assert!((cy as i64 - 512).abs() < 40, "vertical center {cy}");
    assert!((cx as i64 - 512).abs() < 40, "horizontal center {cx}");
}

#[test]
fn design_offsets_move_the_text() {
    let Some(mut c) = compositor() else {
        return;
    };
    let centered = c.compose("Ana", Icing::Vanilla, None).unwrap().unwrap();
    let shifted = c.compose("Ana", Icing::Vanilla, d(2)).unwrap().unwrap();
    assert_ne!(centered.fingerprint(), shifted.fingerprint());

    // offsetY = 170 in the rotated frame moves text to the right on the canvas.
    let mean_x = |img: &RasterImage| {
        let (mut sum, mut n) = (0u64, 0u64);
        for y in 0..img.height {
            for x in 0..img.width {
                if img.alpha_at(x, y) != 0 {
                    sum += u64::from(x);
                    n += 1;
                }
            }
        }
        sum / n.max(1)
    };
    assert!(mean_x(&shifted) > mean_x(&centered) + 100);
}

#[test]
fn missing_font_file_is_reported() {
    let err = DecalFont::from_path(Path::new("/definitely/not/here.ttf")).unwrap_err();
    assert!(matches!(err, CakeError::Other(_)));
}
