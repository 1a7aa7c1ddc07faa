use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context as _;
use cakecraft::{
    AccessoryCategory, AccessoryKind, AnchorKind, CakeConfiguration, ConfigStore,
    ConfiguratorSettings, DecalCompositor, DecalFont, DesignNumber, FileBackend, GltfAssetSource,
    Icing, JsonSceneExporter, OrderForm, RecordField, RecordPatch, Rgba8, Shape, SourceMode,
    SpoolIntake, Stage, StageController,
};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "cakecraft", version)]
struct Cli {
    /// Session directory holding the persisted record.
    #[arg(long, global = true, default_value = ".cakecraft")]
    session: PathBuf,

    /// JSON settings file (environment variables still override it).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log verbosity: -v for debug, -vv for trace.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the configuration derived from the record.
    Show(ShowArgs),
    /// Merge fields into the record.
    Set(SetArgs),
    /// Remove a group of fields from the record.
    Clear(ClearArgs),
    /// Render the name decal to a PNG.
    Decal(DecalArgs),
    /// Print the anchor an accessory would be placed at.
    Anchor(AnchorArgs),
    /// Print the asset paths the current record loads.
    Paths,
    /// Export the cake and spool an order.
    Submit(SubmitArgs),
}

#[derive(Parser, Debug)]
struct ShowArgs {
    /// Print the raw stored record instead.
    #[arg(long)]
    raw: bool,
}

#[derive(Parser, Debug)]
struct SetArgs {
    #[arg(long, value_enum)]
    shape: Option<ShapeArg>,

    #[arg(long, value_enum)]
    icing: Option<IcingArg>,

    /// Catalog design 1..=5, or `none` for plain icing.
    #[arg(long)]
    design: Option<String>,

    /// Uploaded image for the cake top; an empty value removes it.
    #[arg(long)]
    image: Option<String>,

    /// Frosting color as `#rrggbb`.
    #[arg(long)]
    color: Option<String>,

    /// Celebrant name written on the cake top.
    #[arg(long)]
    name: Option<String>,

    /// Candle as `category[:index]`.
    #[arg(long)]
    candle: Option<String>,

    /// Cake-topper stick as `category[:index]`.
    #[arg(long)]
    stick: Option<String>,

    /// Sprinkles as `category[:index]`.
    #[arg(long)]
    sprinkle: Option<String>,

    #[arg(long)]
    cost: Option<f64>,
}

#[derive(Parser, Debug)]
struct ClearArgs {
    #[arg(value_enum)]
    group: ClearGroup,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ClearGroup {
    /// Frosting color and name.
    Color,
    Candle,
    Stick,
    Sprinkle,
    /// Uploaded image.
    Image,
}

#[derive(Parser, Debug)]
struct DecalArgs {
    /// Name to draw; defaults to the record's celebrant name.
    #[arg(long)]
    name: Option<String>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Font file; defaults to the settings font, then a bold system sans-serif.
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct AnchorArgs {
    #[arg(value_enum)]
    kind: KindArg,

    /// Override the record's shape.
    #[arg(long, value_enum)]
    shape: Option<ShapeArg>,

    /// Override the record's design number.
    #[arg(long)]
    design: Option<u8>,
}

#[derive(Parser, Debug)]
struct SubmitArgs {
    /// Directory receiving the spooled order.
    #[arg(long)]
    out: PathBuf,

    /// Extra form field as `key=value` (repeatable).
    #[arg(long = "field", value_name = "KEY=VALUE")]
    fields: Vec<String>,

    /// Seconds to wait for models to load.
    #[arg(long, default_value_t = 30)]
    wait_secs: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ShapeArg {
    Round,
    Square,
    Heart,
}

impl From<ShapeArg> for Shape {
    fn from(s: ShapeArg) -> Self {
        match s {
            ShapeArg::Round => Shape::Round,
            ShapeArg::Square => Shape::Square,
            ShapeArg::Heart => Shape::Heart,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum IcingArg {
    Vanilla,
    Chocolate,
    Strawberry,
}

impl From<IcingArg> for Icing {
    fn from(i: IcingArg) -> Self {
        match i {
            IcingArg::Vanilla => Icing::Vanilla,
            IcingArg::Chocolate => Icing::Chocolate,
            IcingArg::Strawberry => Icing::Strawberry,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Candle,
    Stick,
    Sprinkle,
}

impl From<KindArg> for AccessoryKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Candle => AccessoryKind::Candle,
            KindArg::Stick => AccessoryKind::Stick,
            KindArg::Sprinkle => AccessoryKind::Sprinkle,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match &cli.settings {
        Some(path) => ConfiguratorSettings::from_file(path)?,
        None => ConfiguratorSettings::from_env(),
    };
    let store = open_store(&cli.session, &settings);

    match cli.cmd {
        Command::Show(args) => cmd_show(&store, args),
        Command::Set(args) => cmd_set(&store, args),
        Command::Clear(args) => cmd_clear(&store, args),
        Command::Decal(args) => cmd_decal(&store, &settings, args),
        Command::Anchor(args) => cmd_anchor(&store, &settings, args),
        Command::Paths => cmd_paths(&store),
        Command::Submit(args) => cmd_submit(store, settings, args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(session: &Path, settings: &ConfiguratorSettings) -> ConfigStore {
    ConfigStore::new(
        Arc::new(FileBackend::new(session)),
        settings.record_key.clone(),
    )
}

fn cmd_show(store: &ConfigStore, args: ShowArgs) -> anyhow::Result<()> {
    if args.raw {
        let raw = serde_json::Value::Object(store.read_raw());
        println!("{}", serde_json::to_string_pretty(&raw)?);
        return Ok(());
    }

    let cfg = store.read();
    println!("shape:    {}", cfg.shape.as_str());
    println!("icing:    {}", cfg.icing.as_str());
    println!("mode:     {}", describe_mode(&cfg));
    if let Some(color) = cfg.frosting_color {
        println!("frosting: {color}");
    }
    if let Some(name) = &cfg.celebrant_name {
        println!("name:     {name}");
    }
    for kind in AccessoryKind::ALL {
        if let Some((category, index)) = cfg.accessory(kind) {
            println!("{:<9} {}:{index}", format!("{}:", kind.as_str()), category.as_str());
        }
    }
    if let Some(cost) = cfg.cost {
        println!("cost:     {cost}");
    }
    Ok(())
}

fn describe_mode(cfg: &CakeConfiguration) -> String {
    match cfg.source_mode() {
        SourceMode::PlainIcing => "plain icing".to_string(),
        SourceMode::CatalogDesign(n) => format!("design {n}"),
        SourceMode::UploadedImage => format!(
            "uploaded image {}",
            cfg.uploaded_image_path.as_deref().unwrap_or_default()
        ),
    }
}

fn parse_accessory(
    kind: AccessoryKind,
    choice: &str,
    shape: Shape,
) -> anyhow::Result<(AccessoryCategory, usize)> {
    let (name, index) = match choice.split_once(':') {
        Some((name, index)) => (
            name,
            index
                .parse::<usize>()
                .with_context(|| format!("bad {} index '{index}'", kind.as_str()))?,
        ),
        None => (choice, 0),
    };
    let category = AccessoryCategory::parse(kind, name)?;
    let len = cakecraft::catalog::assets::catalog_len(category, shape);
    anyhow::ensure!(
        index < len,
        "{} '{}' has {len} variants, index {index} is out of range",
        kind.as_str(),
        category.as_str()
    );
    Ok((category, index))
}

fn cmd_set(store: &ConfigStore, args: SetArgs) -> anyhow::Result<()> {
    let current = store.read();
    let shape = args.shape.map(Shape::from).unwrap_or(current.shape);
    let mut patch = RecordPatch::new();

    if args.shape.is_some() {
        patch = patch.shape(shape);
    }
    if let Some(icing) = args.icing {
        patch = patch.icing(icing.into());
    }
    if let Some(design) = args.design.as_deref() {
        let design = match design.trim() {
            "none" | "" => None,
            n => Some(DesignNumber::new(
                n.parse().with_context(|| format!("bad design '{n}'"))?,
            )?),
        };
        patch = patch.design(design);
    }
    // Picking a design drops the uploaded image unless one is given alongside.
    let image = args
        .image
        .as_ref()
        .map(|i| Some(i.trim().to_string()).filter(|i| !i.is_empty()))
        .or(args.design.as_ref().map(|_| None));
    if let Some(image) = &image {
        patch = patch.uploaded_image(image.clone());
    }
    if let Some(color) = args.color.as_deref() {
        patch = patch.frosting_color(Some(Rgba8::parse_hex(color)?));
    }
    let name = args.name.as_deref().map(str::trim);
    if let Some(name) = name.filter(|n| !n.is_empty()) {
        let uploading = image
            .clone()
            .unwrap_or(current.uploaded_image_path.clone())
            .is_some();
        anyhow::ensure!(!uploading, "names cannot be added to a cake with an uploaded image");
        anyhow::ensure!(
            name.chars().count() <= cakecraft::stage::controller::MAX_NAME_CHARS,
            "name is longer than {} characters",
            cakecraft::stage::controller::MAX_NAME_CHARS
        );
        patch = patch.celebrant_name(Some(name.to_string()));
    }
    for (kind, choice) in [
        (AccessoryKind::Candle, &args.candle),
        (AccessoryKind::Stick, &args.stick),
        (AccessoryKind::Sprinkle, &args.sprinkle),
    ] {
        if let Some(choice) = choice {
            let (category, index) = parse_accessory(kind, choice, shape)?;
            patch = patch.accessory(category, index);
        }
    }
    if args.cost.is_some() {
        patch = patch.cost(args.cost);
    }

    if patch.is_empty() {
        anyhow::ensure!(name.is_some(), "nothing to set");
        tracing::info!("blank name ignored");
    } else {
        store.merge(&patch)?;
    }
    cmd_show(store, ShowArgs { raw: false })
}

fn cmd_clear(store: &ConfigStore, args: ClearArgs) -> anyhow::Result<()> {
    let fields: &[RecordField] = match args.group {
        ClearGroup::Color => &[RecordField::FrostingColor, RecordField::CelebrantName],
        ClearGroup::Candle => RecordField::accessory_group(AccessoryKind::Candle),
        ClearGroup::Stick => RecordField::accessory_group(AccessoryKind::Stick),
        ClearGroup::Sprinkle => RecordField::accessory_group(AccessoryKind::Sprinkle),
        ClearGroup::Image => &[RecordField::UploadedImagePath],
    };
    store.clear_fields(fields)?;
    Ok(())
}

fn resolve_font(explicit: Option<&Path>, settings: &ConfiguratorSettings) -> anyhow::Result<DecalFont> {
    let path = explicit.or(settings.decal_font.as_deref());
    Ok(DecalFont::resolve(path)?)
}

fn cmd_decal(
    store: &ConfigStore,
    settings: &ConfiguratorSettings,
    args: DecalArgs,
) -> anyhow::Result<()> {
    let cfg = store.read();
    let name = args
        .name
        .or(cfg.celebrant_name.clone())
        .context("no name given and none in the record")?;

    let font = resolve_font(args.font.as_deref(), settings)?;
    let mut compositor = DecalCompositor::new(&font)?;
    let decal = compositor
        .compose(&name, cfg.icing, cfg.design_number)?
        .context("name is empty")?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, decal.encode_png()?)
        .with_context(|| format!("write '{}'", args.out.display()))?;
    println!(
        "{} ({}x{}, font {})",
        args.out.display(),
        decal.width,
        decal.height,
        font.label()
    );
    Ok(())
}

fn cmd_anchor(
    store: &ConfigStore,
    settings: &ConfiguratorSettings,
    args: AnchorArgs,
) -> anyhow::Result<()> {
    let cfg = store.read();
    let shape = args.shape.map(Shape::from).unwrap_or(cfg.shape);
    let design = match args.design {
        Some(n) => Some(DesignNumber::new(n)?),
        None => cfg.design_number,
    };
    let kind = AccessoryKind::from(args.kind);
    let anchor = match kind {
        AccessoryKind::Sprinkle => settings.sprinkle_anchor,
        AccessoryKind::Candle => cakecraft::placement(
            shape,
            design,
            AnchorKind::Candle,
            cfg.candle.and_then(|c| c.position_override),
        ),
        AccessoryKind::Stick => cakecraft::resolve(shape, design, AnchorKind::Stick),
    };
    println!("{anchor}");
    Ok(())
}

fn cmd_paths(store: &ConfigStore) -> anyhow::Result<()> {
    let cfg = store.read();
    let base = cakecraft::catalog::assets::base_cake_path(cfg.shape, cfg.icing, cfg.source_mode());
    println!("cake: {base}");
    for kind in AccessoryKind::ALL {
        let Some((category, index)) = cfg.accessory(kind) else {
            continue;
        };
        for (i, path) in cakecraft::catalog::assets::catalog(category, cfg.shape)
            .iter()
            .enumerate()
        {
            let mark = if i == index { "*" } else { " " };
            println!("{}{mark} {path}", kind.as_str());
        }
    }
    Ok(())
}

fn cmd_submit(
    store: ConfigStore,
    settings: ConfiguratorSettings,
    args: SubmitArgs,
) -> anyhow::Result<()> {
    let mut form = OrderForm::new();
    for field in &args.fields {
        let (k, v) = field
            .split_once('=')
            .with_context(|| format!("form field '{field}' is not KEY=VALUE"))?;
        form.set(k.trim(), v);
    }

    let font = match DecalFont::resolve(settings.decal_font.as_deref()) {
        Ok(f) => Some(f),
        Err(e) => {
            tracing::warn!("no decal font: {e}");
            None
        }
    };
    let source = Arc::new(GltfAssetSource::new(
        settings.models_root.clone(),
        settings.uploads_root.clone(),
    ));
    let mut ctl = StageController::enter(Stage::Preview, settings, store, source, font.as_ref())?;
    if !ctl.wait_idle(Duration::from_secs(args.wait_secs)) {
        tracing::warn!("some models were still loading; submitting what is ready");
    }

    let reply = ctl.submit(
        &form,
        &JsonSceneExporter { pretty: true },
        &SpoolIntake::new(&args.out),
    )?;
    println!("{reply}");
    Ok(())
}
