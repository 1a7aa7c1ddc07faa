use super::*;

fn d(n: u8) -> Option<DesignNumber> {
    Some(DesignNumber::new(n).unwrap())
}

#[test]
fn colors_follow_icing() {
    assert_eq!(text_color(Icing::Vanilla), Rgba8::BLACK);
    assert_eq!(text_color(Icing::Chocolate).to_hex(), "#ffd700");
    assert_eq!(text_color(Icing::Strawberry).to_hex(), "#c71585");
}

#[test]
fn params_table_and_default() {
    let p = DecalLayoutParams::for_design(d(4));
    assert_eq!((p.font_size, p.offset_x, p.offset_y), (80.0, -140.0, 150.0));
    let p = DecalLayoutParams::for_design(d(5));
    assert_eq!((p.font_size, p.offset_x, p.offset_y), (70.0, 190.0, 150.0));
    let p = DecalLayoutParams::for_design(None);
    assert_eq!((p.font_size, p.offset_x, p.offset_y), (90.0, 0.0, 0.0));
    for design in std::iter::once(None).chain(DesignNumber::all().map(Some)) {
        assert_eq!(DecalLayoutParams::for_design(design).line_height, 150.0);
    }
}

#[test]
fn thirty_chars_wrap_into_three_lines() {
    let name = "abcdefghijklmnopqrstuvwxyz0123";
    assert_eq!(name.chars().count(), 30);
    let lines = wrap_lines(name, MAX_CHARS_PER_LINE);
    assert_eq!(
        lines.iter().map(|l| l.chars().count()).collect::<Vec<_>>(),
        vec![14, 14, 2]
    );
    assert_eq!(lines.concat(), name);
}

#[test]
fn wrapping_counts_characters_not_bytes() {
    let lines = wrap_lines("Zoë Zoë Zoë Zoë", 14);
    assert_eq!(lines, vec!["Zoë Zoë Zoë Zo".to_string(), "ë".to_string()]);
    assert!(wrap_lines("", 14).is_empty());
}

#[test]
fn heart_chocolate_design3_scenario() {
    let layout = DecalLayout::plan("Alex Jordan Lee", Icing::Chocolate, d(3)).unwrap();
    assert_eq!(layout.color.to_hex(), "#ffd700");
    assert_eq!(layout.params.font_size, 110.0);
    assert_eq!(layout.params.offset_y, 60.0);
    let texts: Vec<&str> = layout.lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["Alex Jordan Le", "e"]);
    // Two lines centered on 60 with a 150 step.
    assert_eq!(layout.lines[0].y, -15.0);
    assert_eq!(layout.lines[1].y, 135.0);
}

#[test]
fn blank_names_plan_nothing_and_names_are_trimmed() {
    assert!(DecalLayout::plan("   ", Icing::Vanilla, None).is_none());
    let layout = DecalLayout::plan("  Mia ", Icing::Vanilla, d(5)).unwrap();
    assert_eq!(layout.lines.len(), 1);
    assert_eq!(layout.lines[0].text, "Mia");
    assert_eq!((layout.lines[0].x, layout.lines[0].y), (190.0, 150.0));
}

#[test]
fn canvas_transform_rotates_about_center() {
    let t = canvas_transform();
    let origin = t * kurbo::Point::new(0.0, 0.0);
    assert!((origin.x - 512.0).abs() < 1e-9 && (origin.y - 512.0).abs() < 1e-9);
    // +x in the rotated frame points up on the canvas.
    let p = t * kurbo::Point::new(100.0, 0.0);
    assert!((p.x - 512.0).abs() < 1e-9);
    assert!((p.y - 412.0).abs() < 1e-9);
}
