use super::*;
use crate::record::schema::DesignNumber;

#[test]
fn base_cake_paths_follow_templates() {
    assert_eq!(
        base_cake_path(Shape::Round, Icing::Vanilla, SourceMode::PlainIcing).as_str(),
        "icing/round_vanilla"
    );
    let d3 = DesignNumber::new(3).unwrap();
    assert_eq!(
        base_cake_path(Shape::Heart, Icing::Chocolate, SourceMode::CatalogDesign(d3)).as_str(),
        "designs/heart_chocolate_style3"
    );
    assert_eq!(
        base_cake_path(Shape::Square, Icing::Strawberry, SourceMode::UploadedImage).as_str(),
        "image/square_strawberry_image"
    );
}

#[test]
fn candle_catalogs_keep_source_order() {
    let number = catalog(AccessoryCategory::Candle(CandleCategory::Number), Shape::Round);
    assert_eq!(number.len(), 10);
    assert_eq!(number[0].as_str(), "accessories/candles/number1");
    assert_eq!(number[9].as_str(), "accessories/candles/number0");
    assert_eq!(
        catalog_len(AccessoryCategory::Candle(CandleCategory::Wax), Shape::Heart),
        4
    );
}

#[test]
fn sprinkle_catalogs_depend_on_shape_and_sticks_do_not() {
    let cat = AccessoryCategory::Sprinkle(SprinkleCategory::Choco);
    assert_eq!(
        catalog(cat, Shape::Heart)[2].as_str(),
        "accessories/sprinkles/choco_heart3"
    );
    assert_eq!(
        catalog(cat, Shape::Square)[0].as_str(),
        "accessories/sprinkles/choco_square1"
    );

    let stick = AccessoryCategory::Stick(StickCategory::Mother);
    assert_eq!(catalog(stick, Shape::Round), catalog(stick, Shape::Heart));
}

#[test]
fn category_parse_is_scoped_by_kind() {
    assert_eq!(
        AccessoryCategory::parse(AccessoryKind::Candle, "Sparkler").unwrap(),
        AccessoryCategory::Candle(CandleCategory::Sparkler)
    );
    assert!(AccessoryCategory::parse(AccessoryKind::Stick, "wax").is_err());
    assert!(AccessoryCategory::parse(AccessoryKind::Sprinkle, "glitter").is_err());
    assert_eq!(
        AccessoryCategory::Sprinkle(SprinkleCategory::Sugar).kind(),
        AccessoryKind::Sprinkle
    );
}

#[test]
fn normalize_rel_path_rejects_escapes() {
    assert_eq!(normalize_rel_path("./a//b\\c").unwrap(), "a/b/c");
    assert!(normalize_rel_path("/abs").is_err());
    assert!(normalize_rel_path("a/../b").is_err());
    assert!(normalize_rel_path("./").is_err());
    assert!(AssetPath::new("").is_err());
}
