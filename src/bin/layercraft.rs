use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

use layercraft::{
    AssembleOpts, ClientConfig, Compression, ExtractedImage, ExtractionSnapshot, Extractor,
    HttpModelClient, Layer, Session, SourceImage, assemble,
};

#[derive(Parser, Debug)]
#[command(name = "layercraft", version)]
struct Cli {
    /// Log debug output (RUST_LOG overrides this).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decompose an image into layers and write them as JSON.
    Analyze(AnalyzeArgs),
    /// Extract one layer as a transparent cutout.
    Extract(ExtractArgs),
    /// Assemble a PSD from an image, a layers JSON file and optional cutouts (no network).
    Export(ExportArgs),
    /// Analyze, optionally extract image layers, and write a PSD.
    Run(RunArgs),
}

#[derive(Parser, Debug)]
struct AnalyzeArgs {
    /// Source image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output layers JSON; printed to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// Source image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Layers JSON produced by `analyze`.
    #[arg(long)]
    layers: PathBuf,

    /// Index of the layer to extract (0 = bottom-most).
    #[arg(long)]
    index: usize,

    /// Output path for the encoded cutout.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Source image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Layers JSON produced by `analyze`.
    #[arg(long)]
    layers: PathBuf,

    /// Output PSD path.
    #[arg(long)]
    out: PathBuf,

    /// Cached cutout for a layer, as `INDEX=PATH`. Repeatable.
    #[arg(long = "cutout", value_parser = parse_cutout)]
    cutouts: Vec<(usize, PathBuf)>,

    /// Write uncompressed channel data.
    #[arg(long)]
    raw: bool,

    /// Opacity of guide layers.
    #[arg(long, default_value_t = 0.5)]
    guide_opacity: f32,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Source image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PSD path.
    #[arg(long)]
    out: PathBuf,

    /// Extract every `image` layer before exporting.
    #[arg(long)]
    extract_images: bool,

    /// Worker threads for extraction.
    #[arg(long)]
    threads: Option<usize>,

    /// Write uncompressed channel data.
    #[arg(long)]
    raw: bool,

    /// Also write the layers JSON here.
    #[arg(long)]
    layers_out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Analyze(args) => cmd_analyze(args),
        Command::Extract(args) => cmd_extract(args),
        Command::Export(args) => cmd_export(args),
        Command::Run(args) => cmd_run(args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second init (e.g. in tests) is harmless.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn parse_cutout(s: &str) -> Result<(usize, PathBuf), String> {
    let (index, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=PATH, got '{s}'"))?;
    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid layer index '{index}': {e}"))?;
    if path.is_empty() {
        return Err("cutout path must be non-empty".to_owned());
    }
    Ok((index, PathBuf::from(path)))
}

fn compression(raw: bool) -> Compression {
    if raw { Compression::Raw } else { Compression::Rle }
}

fn read_source(path: &Path) -> anyhow::Result<SourceImage> {
    let bytes = std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    SourceImage::sniffed(bytes).with_context(|| format!("detect format of '{}'", path.display()))
}

fn read_layers(path: &Path) -> anyhow::Result<Vec<Layer>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read layers '{}'", path.display()))?;
    layercraft::parse_layers(&text).with_context(|| format!("parse layers '{}'", path.display()))
}

fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write '{}'", path.display()))
}

fn print_layers(layers: &[Layer]) {
    for (i, layer) in layers.iter().enumerate() {
        let b = layer.bounding_box;
        let colors: Vec<String> = layer.text_colors().iter().map(|c| c.to_string()).collect();
        let colors = if colors.is_empty() {
            String::new()
        } else {
            format!(" colors={}", colors.join(","))
        };
        eprintln!(
            "{i:>3} {:<5} {:<32} x={:.3} y={:.3} w={:.3} h={:.3}{colors}",
            layer.category.as_str(),
            layer.name,
            b.x,
            b.y,
            b.width,
            b.height,
        );
    }
}

fn model_client(config: &ClientConfig) -> anyhow::Result<HttpModelClient> {
    HttpModelClient::new(config).context("create model client")
}

fn cmd_analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let config = ClientConfig::from_env()?;
    let source = read_source(&args.in_path)?;
    let session = Session::new(model_client(&config)?, &config, source);

    let layers = session.analyze().context("analyze image")?;
    print_layers(&layers);

    let json = serde_json::to_string_pretty(&*layers).context("serialize layers")?;
    match args.out {
        Some(out) => {
            write_output(&out, json.as_bytes())?;
            eprintln!("wrote {}", out.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_extract(args: ExtractArgs) -> anyhow::Result<()> {
    let config = ClientConfig::from_env()?;
    let source = read_source(&args.in_path)?;
    let layers = read_layers(&args.layers)?;
    let layer = layers.get(args.index).with_context(|| {
        format!(
            "layer index {} out of range ({} layers)",
            args.index,
            layers.len()
        )
    })?;

    let extractor = Extractor::new(model_client(&config)?, config.extraction_model.clone());
    let cutout = extractor
        .extract(&source.bytes, &source.mime_type, layer)
        .with_context(|| format!("extract layer '{}'", layer.name))?;

    write_output(&args.out, cutout.bytes())?;
    eprintln!("wrote {} ({})", args.out.display(), cutout.mime_type);
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let source = read_source(&args.in_path)?;
    let layers = read_layers(&args.layers)?;

    let mut cutouts = ExtractionSnapshot::new();
    for (index, path) in &args.cutouts {
        if *index >= layers.len() {
            anyhow::bail!("cutout index {index} out of range ({} layers)", layers.len());
        }
        let bytes =
            std::fs::read(path).with_context(|| format!("read cutout '{}'", path.display()))?;
        let mime = layercraft::sniff_mime_type(&bytes).unwrap_or("image/png");
        cutouts.insert(*index, ExtractedImage::new(mime, bytes));
    }

    let opts = AssembleOpts {
        guide_opacity: args.guide_opacity,
        compression: compression(args.raw),
        ..AssembleOpts::default()
    };
    let doc = assemble(&source.bytes, &layers, &cutouts, &opts).context("assemble document")?;
    report_issues(&doc);
    write_output(&args.out, &doc.bytes)?;
    eprintln!(
        "wrote {} ({}x{}, {} layers)",
        args.out.display(),
        doc.canvas.width,
        doc.canvas.height,
        doc.layers.len()
    );
    Ok(())
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let config = ClientConfig::from_env()?;
    let source = read_source(&args.in_path)?;
    let session = Session::new(model_client(&config)?, &config, source);

    let layers = session.analyze().context("analyze image")?;
    print_layers(&layers);
    if let Some(path) = &args.layers_out {
        let json = serde_json::to_string_pretty(&*layers).context("serialize layers")?;
        write_output(path, json.as_bytes())?;
    }

    if args.extract_images {
        for (index, result) in session.extract_images(args.threads)? {
            if let Err(e) = result {
                tracing::warn!(index, layer = %layers[index].name, error = %e, "extraction failed; layer will be a guide");
            }
        }
    }

    let opts = AssembleOpts {
        compression: compression(args.raw),
        ..AssembleOpts::default()
    };
    let doc = session.export(&opts).context("export document")?;
    report_issues(&doc);
    write_output(&args.out, &doc.bytes)?;
    eprintln!("wrote {} ({} layers)", args.out.display(), doc.layers.len());
    Ok(())
}

fn report_issues(doc: &layercraft::AssembledDocument) {
    for issue in &doc.issues {
        eprintln!(
            "warning: layer {} ('{}') exported as a guide: {}",
            issue.index, issue.name, issue.message
        );
    }
}
