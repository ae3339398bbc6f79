use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use fieldink::{
    Clock, DiscoveryOpts, DiscoveryOutcome, ElementTreeSurface, FieldDiscovery,
    FieldValueStore, Liveness, ManualClock, RendererRegistry, SystemClock, Template,
};

#[derive(Parser, Debug)]
#[command(name = "fieldink", version)]
struct Cli {
    /// Log debug events to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crop a raw ink raster to its inked region plus padding.
    Crop(CropArgs),
    /// Reconcile a template's signature fields with a rendered-surface snapshot.
    Discover(DiscoverArgs),
    /// Rasterize the image and shape fields of one page.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct CropArgs {
    /// Input PNG with the raw ink.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Also print the artifact as a data URI on stdout.
    #[arg(long)]
    data_uri: bool,
}

#[derive(Parser, Debug)]
struct DiscoverArgs {
    /// Template JSON.
    #[arg(long)]
    template: PathBuf,

    /// Rendered-surface snapshot JSON. Without it only declared fields are reported.
    #[arg(long)]
    surface: Option<PathBuf>,

    /// Run the discovery window on a fake clock instead of waiting in real time.
    #[arg(long)]
    instant: bool,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Template JSON.
    #[arg(long)]
    template: PathBuf,

    /// Field values JSON (`key -> string`).
    #[arg(long)]
    values: PathBuf,

    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Output width in pixels.
    #[arg(long, default_value_t = 595)]
    width: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Crop(args) => cmd_crop(args),
        Command::Discover(args) => cmd_discover(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn read_to_string(path: &Path, what: &str) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read {what} '{}'", path.display()))
}

fn read_template(path: &Path) -> anyhow::Result<Template> {
    let json = read_to_string(path, "template")?;
    Template::from_json(&json).with_context(|| format!("load template '{}'", path.display()))
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

fn cmd_crop(args: CropArgs) -> anyhow::Result<()> {
    let raster = image::open(&args.in_path)
        .with_context(|| format!("open ink png '{}'", args.in_path.display()))?
        .to_rgba8();
    let artifact = fieldink::crop_to_artifact(&raster)?;

    ensure_parent(&args.out)?;
    std::fs::write(&args.out, artifact.encoded_bytes())
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    if args.data_uri {
        println!("{}", artifact.to_data_uri());
    }
    eprintln!(
        "wrote {} ({}x{})",
        args.out.display(),
        artifact.width(),
        artifact.height()
    );
    Ok(())
}

fn cmd_discover(args: DiscoverArgs) -> anyhow::Result<()> {
    let template = read_template(&args.template)?;
    let mut surface = match &args.surface {
        Some(path) => {
            let json = read_to_string(path, "surface snapshot")?;
            ElementTreeSurface::from_json(&json, template.clone())
                .with_context(|| format!("load surface '{}'", path.display()))?
        }
        None => ElementTreeSurface::new(Vec::new(), template.clone()),
    };

    let clock: Box<dyn Clock> = if args.instant {
        Box::new(ManualClock::new())
    } else {
        Box::new(SystemClock::new())
    };
    let mut discovery = FieldDiscovery::new(
        &template,
        DiscoveryOpts::from_env(),
        clock.now(),
        Liveness::new(),
    );
    let outcome = discovery.run_to_end(&mut surface, clock.as_ref());

    let json = serde_json::to_string_pretty(discovery.ordered_fields())
        .context("serialize ordered fields")?;
    println!("{json}");

    match outcome {
        DiscoveryOutcome::Completed { rendered } => {
            eprintln!("discovery completed: {rendered} rendered match(es)")
        }
        DiscoveryOutcome::TimedOut => eprintln!("discovery timed out: declared fields only"),
        DiscoveryOutcome::Cancelled => eprintln!("discovery cancelled"),
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let template = read_template(&args.template)?;
    let values = read_to_string(&args.values, "values")?;
    let store = FieldValueStore::from_json(&values)
        .with_context(|| format!("load values '{}'", args.values.display()))?;

    let pages = fieldink::layout_document(&template, &store, &RendererRegistry::with_defaults());
    let page = pages
        .iter()
        .find(|p| p.page == args.page)
        .with_context(|| {
            format!(
                "page {} not in template ({} page(s))",
                args.page, template.pages
            )
        })?;
    let raster = fieldink::rasterize_page(page, args.width)?;

    ensure_parent(&args.out)?;
    raster
        .save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
