use std::path::{Path, PathBuf};
use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use acg_asset::{registry, ConvertOptionsBuilder, ConvertOutcome, SceneConverter};
use acg_core::log::{self as logging, info, LevelFilter};
use acg_scene::{LayerKind, SceneData, SceneStatistics};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert an authoring file into a .acg scene
    Convert {
        input: PathBuf,
        output: PathBuf,

        /// Convert even if the output is newer than the input
        #[arg(long)]
        force: bool,

        /// Do not read image headers for texture dimensions
        #[arg(long)]
        no_texture_probe: bool,
    },
    /// Print statistics and materials of any loadable scene
    Inspect {
        file: PathBuf,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },
    /// List the input formats that can be converted
    Formats,
}

#[derive(Serialize)]
struct MaterialReport<'a> {
    name: &'a str,
    layers: Vec<LayerKind>,
}

#[derive(Serialize)]
struct InspectReport<'a> {
    statistics: SceneStatistics,
    materials: Vec<MaterialReport<'a>>,
    textures: Vec<&'a str>,
}

impl<'a> InspectReport<'a> {
    fn new(scene: &'a SceneData) -> Self {
        Self {
            statistics: scene.statistics(),
            materials: scene
                .materials
                .iter()
                .map(|material| MaterialReport {
                    name: &material.name,
                    layers: material.layer_flags().kinds().collect(),
                })
                .collect(),
            textures: scene.textures.iter().map(|texture| texture.path.as_str()).collect(),
        }
    }
}

fn convert(input: &Path, output: &Path, force: bool, probe_texture_dimensions: bool) -> Result<()> {
    let options = ConvertOptionsBuilder::default()
        .force(force)
        .probe_texture_dimensions(probe_texture_dimensions)
        .build()?;

    match SceneConverter::new(options).convert(input, output)? {
        ConvertOutcome::UpToDate => println!("{} is up to date", output.display()),
        ConvertOutcome::Converted { bytes, statistics } => {
            println!("Converted {} -> {} ({} bytes)", input.display(), output.display(), bytes);
            println!("{}", statistics);
        }
    }
    Ok(())
}

fn inspect(file: &Path, json: bool) -> Result<()> {
    let loader = registry().create_loader(file)?;
    let scene = loader.load(file)?;
    let report = InspectReport::new(&scene);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} ({} format)", file.display(), loader.format_name());
    println!("{}", report.statistics);
    for (index, material) in report.materials.iter().enumerate() {
        let layers: Vec<String> = material.layers.iter().map(ToString::to_string).collect();
        if layers.is_empty() {
            println!("  [{}] {}", index, material.name);
        } else {
            println!("  [{}] {} ({})", index, material.name, layers.join(", "));
        }
    }
    for (index, texture) in report.textures.iter().enumerate() {
        println!("  texture {}: {}", index, texture);
    }
    Ok(())
}

fn formats() {
    let registry = registry();
    for extension in registry.supported_extensions() {
        if let Some(constructor) = registry.get(&extension) {
            let loader = constructor();
            let advanced = if loader.supports_advanced_materials() { "advanced materials" } else { "basic materials" };
            println!(".{:<6} {} ({})", extension, loader.format_name(), advanced);
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::initialize(if args.verbose { LevelFilter::Debug } else { LevelFilter::Info })?;
    info!("acg-convert {}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Convert { input, output, force, no_texture_probe } => {
            convert(&input, &output, force, !no_texture_probe)
        }
        Command::Inspect { file, json } => inspect(&file, json),
        Command::Formats => {
            formats();
            Ok(())
        }
    }
}
