use std::sync::Mutex;

use super::*;
use crate::catalog::assets::{CandleCategory, SprinkleCategory};
use crate::loader::source::MemoryAssetSource;
use crate::order::submit::JsonSceneExporter;
use crate::scene::model::Material;

const WAIT: Duration = Duration::from_secs(5);
const WAX: AccessoryCategory = AccessoryCategory::Candle(CandleCategory::Wax);

fn cake(name: &str) -> SceneNode {
    SceneNode::group(
        name,
        vec![
            SceneNode::mesh("IcingRing", Material::solid(Rgba8::WHITE)),
            SceneNode::mesh("CakeTopCircle", Material::solid(Rgba8::WHITE)),
            SceneNode::mesh("CakeTopImage", Material::solid(Rgba8::WHITE)),
            SceneNode::mesh("Plate", Material::solid(Rgba8::opaque(90, 90, 90))),
        ],
    )
}

fn variant(path: &str) -> SceneNode {
    SceneNode::mesh(path, Material::solid(Rgba8::WHITE))
}

fn source() -> MemoryAssetSource {
    let mut src = MemoryAssetSource::new();
    for shape in Shape::ALL {
        for icing in Icing::ALL {
            let mut modes = vec![SourceMode::PlainIcing, SourceMode::UploadedImage];
            modes.extend(DesignNumber::all().map(SourceMode::CatalogDesign));
            for mode in modes {
                let path = base_cake_path(shape, icing, mode);
                src.insert_model(path.as_str(), cake(path.as_str()));
            }
        }
    }
    for category in [WAX, AccessoryCategory::Sprinkle(SprinkleCategory::Sugar)] {
        for shape in Shape::ALL {
            for path in crate::catalog::assets::catalog(category, shape) {
                src.insert_model(path.as_str(), variant(path.as_str()));
            }
        }
    }
    src
}

fn enter(stage: Stage, store: &ConfigStore) -> StageController {
    enter_with(stage, store, source())
}

fn enter_with(stage: Stage, store: &ConfigStore, src: MemoryAssetSource) -> StageController {
    let mut ctl = StageController::enter(
        stage,
        ConfiguratorSettings::default(),
        store.clone(),
        Arc::new(src),
        None,
    )
    .unwrap();
    assert!(ctl.wait_idle(WAIT));
    ctl
}

fn color_of(ctl: &StageController, mesh: &str) -> Rgba8 {
    ctl.cake()
        .unwrap()
        .find(mesh)
        .unwrap()
        .material
        .as_ref()
        .unwrap()
        .color
}

#[test]
fn stages_navigate_in_wizard_order() {
    assert_eq!(Stage::Shape.next(), Some(Stage::Color));
    assert_eq!(Stage::Sprinkle.next(), Some(Stage::Preview));
    assert_eq!(Stage::Preview.next(), None);
    assert_eq!(Stage::Shape.back(), None);
    assert_eq!(Stage::Candle.back(), Some(Stage::Color));
    assert_eq!("stick".parse::<Stage>().unwrap(), Stage::Stick);
    assert!("cake".parse::<Stage>().is_err());

    assert!(!Stage::Color.shows(AccessoryKind::Candle));
    assert!(Stage::Stick.shows(AccessoryKind::Candle));
    assert!(!Stage::Stick.shows(AccessoryKind::Sprinkle));
    assert!(Stage::Preview.shows(AccessoryKind::Sprinkle));
    assert_eq!(Stage::Preview.edits(), None);
}

#[test]
fn entering_loads_the_default_cake_with_base_transform() {
    let store = ConfigStore::in_memory();
    let ctl = enter(Stage::Shape, &store);
    let cake = ctl.cake().unwrap();
    assert_eq!(cake.name, "icing/round_vanilla");
    assert_eq!(cake.scale, Vector3::new(2.5, 2.0, 2.5));
    assert_eq!(cake.position, Vector3::new(0.0, -2.0, 0.0));
    assert!(ctl.selector(AccessoryKind::Candle).is_none());
}

#[test]
fn first_entry_seeds_shape_and_icing() {
    let store = ConfigStore::in_memory();
    let _ctl = enter(Stage::Shape, &store);
    assert_eq!(
        serde_json::Value::Object(store.read_raw()),
        serde_json::json!({"shape": "round", "icing": "vanilla"})
    );

    // Later stages keep what is already there.
    store.merge(&RecordPatch::new().shape(Shape::Square)).unwrap();
    let _ctl = enter(Stage::Candle, &store);
    let raw = store.read_raw();
    assert_eq!(raw["shape"], "square");
    assert_eq!(raw["icing"], "vanilla");
}

#[test]
fn missing_cake_model_is_soft() {
    let store = ConfigStore::in_memory();
    let ctl = enter_with(Stage::Color, &store, MemoryAssetSource::new());
    assert!(ctl.cake().is_none());
    assert!(ctl.is_idle());
}

#[test]
fn shape_stage_edits_persist_and_reload_the_cake() {
    let store = ConfigStore::in_memory();
    let mut ctl = enter(Stage::Shape, &store);
    ctl.select_shape(Shape::Heart).unwrap();
    ctl.select_icing(Icing::Chocolate).unwrap();
    ctl.set_uploaded_image(Some("u/photo.png".into())).unwrap();
    assert!(ctl.wait_idle(WAIT));
    assert_eq!(ctl.cake().unwrap().name, "image/heart_chocolate_image");

    ctl.select_design(Some(DesignNumber::new(4).unwrap())).unwrap();
    assert!(ctl.wait_idle(WAIT));
    assert_eq!(ctl.cake().unwrap().name, "designs/heart_chocolate_style4");

    let raw = store.read_raw();
    assert_eq!(raw["shape"], "heart");
    assert_eq!(raw["design"], "4");
    assert_eq!(raw["cameFrom"], "design");
    assert!(raw.get("uploadedImagePath").is_none());
    assert!(ctl.set_frosting_color("#ff0000").is_err());
}

#[test]
fn stale_cake_completion_never_replaces_the_current_one() {
    let store = ConfigStore::in_memory();
    let mut src = source();
    let slow = base_cake_path(Shape::Round, Icing::Vanilla, SourceMode::PlainIcing);
    src = src.with_delayed_model(slow.as_str(), cake(slow.as_str()), Duration::from_millis(150));
    let mut ctl = StageController::enter(
        Stage::Shape,
        ConfiguratorSettings::default(),
        store,
        Arc::new(src),
        None,
    )
    .unwrap();
    ctl.select_shape(Shape::Square).unwrap();
    assert!(ctl.wait_idle(WAIT));
    assert_eq!(ctl.cake().unwrap().name, "icing/square_vanilla");
}

#[test]
fn color_stage_paints_persists_and_clears() {
    let store = ConfigStore::in_memory();
    let mut ctl = enter(Stage::Color, &store);
    assert!(ctl.set_frosting_color("not-a-color").is_err());
    ctl.set_frosting_color("#336699").unwrap();
    assert_eq!(color_of(&ctl, "IcingRing"), Rgba8::opaque(0x33, 0x66, 0x99));
    assert_eq!(color_of(&ctl, "Plate"), Rgba8::opaque(90, 90, 90));
    assert_eq!(store.read().frosting_color, Some(Rgba8::opaque(0x33, 0x66, 0x99)));

    assert!(!ctl.apply_name("   ").unwrap());
    assert!(ctl.apply_name(&"x".repeat(31)).is_err());
    assert!(ctl.apply_name("  Mia  ").unwrap());
    assert_eq!(store.read().celebrant_name.as_deref(), Some("Mia"));
    // No font was supplied, so the name is stored but not drawn.
    assert!(ctl.decal().is_none());

    ctl.clear_color_and_name().unwrap();
    assert_eq!(color_of(&ctl, "IcingRing"), Rgba8::WHITE);
    let raw = store.read_raw();
    assert!(raw.get("frostingColor").is_none());
    assert!(raw.get("celebrantName").is_none());
    assert_eq!(raw["shape"], "round");
}

#[test]
fn saved_color_is_applied_when_the_cake_arrives() {
    let store = ConfigStore::in_memory();
    store
        .merge(&RecordPatch::new().frosting_color(Some(Rgba8::opaque(1, 2, 3))))
        .unwrap();
    let ctl = enter(Stage::Candle, &store);
    assert_eq!(color_of(&ctl, "IcingRing"), Rgba8::opaque(1, 2, 3));
}

#[test]
fn names_are_refused_in_upload_mode() {
    let store = ConfigStore::in_memory();
    store
        .merge(&RecordPatch::new().uploaded_image(Some("pic.png".into())))
        .unwrap();
    let mut ctl = enter(Stage::Color, &store);
    assert!(matches!(ctl.apply_name("Mia"), Err(CakeError::Validation(_))));
    assert!(store.read().celebrant_name.is_none());
}

#[test]
fn uploaded_image_lands_on_the_image_surface() {
    let store = ConfigStore::in_memory();
    store
        .merge(&RecordPatch::new().uploaded_image(Some("pic.png".into())))
        .unwrap();
    let img = RasterImage::from_premul(1, 1, vec![10, 20, 30, 255]).unwrap();
    let ctl = enter_with(Stage::Color, &store, source().with_image("pic.png", img.clone()));
    let top = ctl.cake().unwrap().find("CakeTopImage").unwrap();
    let map = top.material.as_ref().unwrap().map.as_ref().unwrap();
    assert_eq!(*map.image, img);
}

#[test]
fn candle_stage_selects_cycles_and_persists_on_advance() {
    let store = ConfigStore::in_memory();
    let mut ctl = enter(Stage::Candle, &store);
    assert!(ctl.selector(AccessoryKind::Candle).unwrap().is_editable());

    ctl.select_category(WAX).unwrap();
    assert!(ctl.wait_idle(WAIT));
    let sel = ctl.selector(AccessoryKind::Candle).unwrap();
    assert_eq!(sel.visible().unwrap().name, "accessories/candles/wax1");

    ctl.previous_variant().unwrap();
    assert_eq!(
        ctl.selector(AccessoryKind::Candle).unwrap().visible().unwrap().name,
        "accessories/candles/wax4"
    );
    assert_eq!(ctl.config().candle.unwrap().index, 3);
    assert!(ctl.apply_name("Mia").is_err());

    assert_eq!(ctl.advance().unwrap(), Some(Stage::Stick));
    let saved = store.read().candle.unwrap();
    assert_eq!((saved.category, saved.index), (CandleCategory::Wax, 3));
    assert_eq!(
        saved.position_override,
        Some(resolve(Shape::Round, None, AnchorKind::Candle))
    );
}

#[test]
fn candle_anchor_follows_a_later_shape_change() {
    let store = ConfigStore::in_memory();
    store
        .merge(&RecordPatch::new().design(DesignNumber::new(1).ok()))
        .unwrap();
    let mut ctl = enter(Stage::Candle, &store);
    ctl.select_category(WAX).unwrap();
    assert!(ctl.wait_idle(WAIT));
    ctl.advance().unwrap();
    let round = resolve(Shape::Round, DesignNumber::new(1).ok(), AnchorKind::Candle);
    assert_eq!(store.read().candle.unwrap().position_override, Some(round));

    // Back on the shape stage the customer switches to heart, design 3.
    store
        .merge(
            &RecordPatch::new()
                .shape(Shape::Heart)
                .design(DesignNumber::new(3).ok()),
        )
        .unwrap();
    let heart = resolve(Shape::Heart, DesignNumber::new(3).ok(), AnchorKind::Candle);
    assert_eq!(heart, Vector3::new(1.5, -0.2, 0.1));

    let ctl = enter(Stage::Candle, &store);
    let sel = ctl.selector(AccessoryKind::Candle).unwrap();
    assert_eq!(sel.anchor(), heart);
    assert_eq!(sel.visible().unwrap().position, heart);
    assert_eq!(store.read().candle.unwrap().position_override, Some(heart));
    drop(ctl);

    // The stick stage reads the refreshed position back.
    let ctl = enter(Stage::Stick, &store);
    assert_eq!(ctl.selector(AccessoryKind::Candle).unwrap().anchor(), heart);
}

#[test]
fn later_stages_show_earlier_accessories_read_only() {
    let store = ConfigStore::in_memory();
    store.merge(&RecordPatch::new().accessory(WAX, 2)).unwrap();
    let mut ctl = enter(Stage::Sprinkle, &store);

    let candle = ctl.selector(AccessoryKind::Candle).unwrap();
    assert!(!candle.is_editable());
    assert_eq!(candle.visible().unwrap().name, "accessories/candles/wax3");

    // Edits target the stage's own kind only.
    assert!(ctl.select_category(WAX).is_err());
    ctl.select_category(AccessoryCategory::Sprinkle(SprinkleCategory::Sugar))
        .unwrap();
    assert!(ctl.wait_idle(WAIT));
    ctl.clear_accessory().unwrap();
    let raw = store.read_raw();
    assert!(raw.get("sprinkleCategory").is_none());
    assert_eq!(raw["candleCategory"], "wax");
    assert_eq!(raw["candleIndex"], 2);
}

#[derive(Default)]
struct RecordingIntake(Mutex<Vec<OrderSubmission>>);

impl OrderIntake for RecordingIntake {
    fn submit(&self, submission: &OrderSubmission) -> CakeResult<String> {
        self.0.lock().unwrap().push(submission.clone());
        Ok("Thanks! Order #12 placed.".to_string())
    }
}

#[test]
fn preview_submits_the_visible_scene() {
    let store = ConfigStore::in_memory();
    store
        .merge(&RecordPatch::new().accessory(WAX, 1).cost(Some(30.0)))
        .unwrap();
    let ctl = enter(Stage::Preview, &store);
    let scene = ctl.scene_snapshot();
    let names: Vec<_> = scene.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["icing/round_vanilla", "accessories/candles/wax2"]);

    let intake = RecordingIntake::default();
    let reply = ctl
        .submit(
            &OrderForm::new().field("customer", "Sam"),
            &JsonSceneExporter::default(),
            &intake,
        )
        .unwrap();
    assert_eq!(reply, "Thanks! Order #12 placed.");
    let sent = intake.0.lock().unwrap();
    assert_eq!(sent[0].fields[1], ("cost".to_string(), "30".to_string()));
    assert_eq!(sent[0].attachment.field, "cakeModel");
    assert!(sent[0].attachment.file_name.starts_with("cake_"));
}

#[test]
fn submit_is_preview_only() {
    let store = ConfigStore::in_memory();
    let ctl = enter(Stage::Color, &store);
    let intake = RecordingIntake::default();
    assert!(
        ctl.submit(&OrderForm::new(), &JsonSceneExporter::default(), &intake)
            .is_err()
    );
    assert!(intake.0.lock().unwrap().is_empty());
}
