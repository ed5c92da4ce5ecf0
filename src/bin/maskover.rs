use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use maskover::{ClassPrefs, Mask, MaskPayload, OverlayEngine, RenderOptions};

#[derive(Parser, Debug)]
#[command(name = "maskover", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite mask overlays (and an optional base image) into a PNG.
    Render(RenderArgs),
    /// Dump the derived 256-color class palette as a 16x16 swatch PNG.
    Palette(PaletteArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Ground-truth mask JSON (`{"value": [...], "shape": [...]}`).
    #[arg(long)]
    gt: Option<PathBuf>,

    /// Prediction mask JSON.
    #[arg(long)]
    pred: Option<PathBuf>,

    /// Base image to composite under the overlays.
    #[arg(long)]
    base: Option<PathBuf>,

    /// Class preference JSON (`{"1": {"enabled": true, "color": "#ff0000"}}`).
    #[arg(long)]
    prefs: Option<PathBuf>,

    /// Global overlay opacity in [0, 1].
    #[arg(long, default_value_t = 1.0)]
    alpha: f32,

    /// Skip the base image layer (black background instead).
    #[arg(long)]
    hide_raw: bool,

    /// Skip the ground-truth layer.
    #[arg(long)]
    hide_gt: bool,

    /// Skip the prediction layer.
    #[arg(long)]
    hide_pred: bool,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct PaletteArgs {
    /// Class preference JSON; omitted means the default palette.
    #[arg(long)]
    prefs: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Palette(args) => cmd_palette(args),
    }
}

fn read_mask(path: &Path) -> anyhow::Result<Mask> {
    let f = File::open(path).with_context(|| format!("open mask '{}'", path.display()))?;
    let payload: MaskPayload =
        serde_json::from_reader(BufReader::new(f)).context("parse mask JSON")?;
    Ok(payload.into_mask())
}

fn read_prefs(path: &Path) -> anyhow::Result<ClassPrefs> {
    let f = File::open(path).with_context(|| format!("open prefs '{}'", path.display()))?;
    serde_json::from_reader(BufReader::new(f)).context("parse class preference JSON")
}

fn write_out(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write png '{}'", path.display()))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let gt = args.gt.as_deref().map(read_mask).transpose()?;
    let pred = args.pred.as_deref().map(read_mask).transpose()?;

    let base = args
        .base
        .as_deref()
        .map(|p| {
            image::open(p)
                .with_context(|| format!("open base image '{}'", p.display()))
                .map(|img| img.to_rgba8())
        })
        .transpose()?;

    let options = RenderOptions {
        show_raw: !args.hide_raw,
        show_gt: !args.hide_gt,
        show_pred: !args.hide_pred,
        show_diff: false,
        alpha: args.alpha,
        class_prefs: args.prefs.as_deref().map(read_prefs).transpose()?,
    };

    let mut engine = OverlayEngine::with_default_size()?;
    let png = engine.render(base.as_ref(), gt.as_ref(), pred.as_ref(), &options)?;
    write_out(&args.out, &png)
}

fn cmd_palette(args: PaletteArgs) -> anyhow::Result<()> {
    let prefs = args.prefs.as_deref().map(read_prefs).transpose()?;

    let mut manager = maskover::PaletteManager::new();
    let palette = manager.derive(prefs.as_ref());

    let mut rgba = Vec::with_capacity(256 * 4);
    for &c in palette.iter() {
        rgba.extend_from_slice(&[
            maskover::palette::red(c),
            maskover::palette::green(c),
            maskover::palette::blue(c),
            maskover::palette::alpha(c),
        ]);
    }

    let mut png = Vec::new();
    image::write_buffer_with_format(
        &mut std::io::Cursor::new(&mut png),
        &rgba,
        16,
        16,
        image::ExtendedColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .context("encode palette swatch")?;
    write_out(&args.out, &png)
}
