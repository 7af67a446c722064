//! evo-canvas CLI - Run a genetic search from JSON configuration.

use std::fs;
use std::path::{Path, PathBuf};

use evo_canvas::{
    compute::{
        Individual, Raster,
        adapters::{BrushPainter, Stamp, StampPacker, paint_tiled, preprocess_target},
        evolution::{EvolutionEngine, FitnessEvaluator, GeneSum, GenomeRng},
    },
    genes::GeneFile,
    schema::{EngineConfig, EvolutionResult, PackerConfig, PainterConfig, ProblemConfig, RunConfig},
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <run.json> [out_genes.txt]", args[0]);
        eprintln!();
        eprintln!("Evolve genes for the problem described in a JSON run configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  run.json       Engine settings and problem description");
        eprintln!("  out_genes.txt  Where to write the best genes (default: out_genes.txt)");
        eprintln!();
        eprintln!("Image problems also write a PNG render next to the gene file.");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let out_path = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("out_genes.txt"));

    let run: RunConfig = read_json(&config_path, "run configuration");
    if let Err(e) = run.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }
    let engine = run.resolved_engine();

    println!("evo-canvas");
    println!("==========");
    println!(
        "Population: {} x ({} x {}) genes",
        engine.effective_pop_size(),
        engine.genes_x,
        engine.genes_y
    );
    println!(
        "Mutation rate: {}, crossover threshold: {}, strategy: {:?}",
        engine.mutation_rate, engine.crossover_threshold, engine.crossover
    );
    println!("Generations: {}", engine.max_generations);
    println!();

    let (genes, render) = match &run.problem {
        ProblemConfig::GeneSum => {
            let result = evolve(engine, GeneSum);
            (GeneFile::new(&result.best), None)
        }
        ProblemConfig::Painter(painter) => run_painter(painter, engine),
        ProblemConfig::Packer(packer) => run_packer(packer, engine),
    };

    if let Err(e) = genes.save(&out_path) {
        eprintln!("Error writing {}: {}", out_path.display(), e);
        std::process::exit(1);
    }
    println!("Genes written to {}", out_path.display());

    if let Some(render) = render {
        let render_path = out_path.with_extension("png");
        if let Err(e) = render.save(&render_path) {
            eprintln!("Error writing {}: {}", render_path.display(), e);
            std::process::exit(1);
        }
        println!("Render written to {}", render_path.display());
    }
}

fn run_painter(painter: &PainterConfig, engine: EngineConfig) -> (GeneFile, Option<Raster>) {
    let raw = read_raster(&painter.target);
    let target = preprocess_target(&raw, painter.downsample, painter.median_size)
        .unwrap_or_else(|e| {
            eprintln!("Error preparing target {}: {}", painter.target.display(), e);
            std::process::exit(1);
        });
    let brush = match &painter.brush {
        Some(path) => {
            let brush = read_raster(path);
            let brush = if painter.median_size > 1 {
                brush.median_filter(painter.median_size)
            } else {
                brush
            };
            brush.resize(painter.brush_scale).unwrap_or_else(|e| {
                eprintln!("Error resizing brush {}: {}", path.display(), e);
                std::process::exit(1);
            })
        }
        None => BrushPainter::round_brush(painter.brush_diameter),
    };
    println!(
        "Target: {}x{}, brush: {}x{}, tiles: {}x{}",
        target.width, target.height, brush.width, brush.height, painter.tiles_x, painter.tiles_y
    );

    let strokes: Individual = if painter.tiles_x * painter.tiles_y > 1 {
        let painting = paint_tiled(&target, &brush, painter.tiles_x, painter.tiles_y, &engine)
            .unwrap_or_else(|e| {
                eprintln!("Painting failed: {}", e);
                std::process::exit(1);
            });
        println!("Tile scores: {:?}", painting.tile_scores);
        painting.strokes
    } else {
        let evaluator = BrushPainter::new(&target, &brush).unwrap_or_else(|e| {
            eprintln!("Painter setup failed: {}", e);
            std::process::exit(1);
        });
        evolve(engine, evaluator).best
    };

    let renderer = BrushPainter::new(&target, &brush).unwrap_or_else(|e| {
        eprintln!("Painter setup failed: {}", e);
        std::process::exit(1);
    });
    let render = renderer.render(strokes.genes());

    let mut genes = GeneFile::new(&strokes);
    genes.target_dims = Some((target.width, target.height));
    (genes, Some(render))
}

fn run_packer(packer: &PackerConfig, engine: EngineConfig) -> (GeneFile, Option<Raster>) {
    let target = read_raster(&packer.target);
    let stamps: Vec<Stamp> = packer
        .stamps
        .iter()
        .map(|path| {
            log::info!("Loaded stamp {}", path.display());
            Stamp {
                name: path.display().to_string(),
                image: read_raster(path),
            }
        })
        .collect();

    let mut rng = engine.random_seed.map_or_else(GenomeRng::random, GenomeRng::new);
    let evaluator = StampPacker::new(
        &target,
        stamps,
        packer.max_objects,
        packer.scale,
        packer.weights,
        &mut rng,
    )
    .unwrap_or_else(|e| {
        eprintln!("Packer setup failed: {}", e);
        std::process::exit(1);
    });
    println!(
        "Target: {}x{}, stamps: {}, objects: {}",
        target.width,
        target.height,
        packer.stamps.len(),
        packer.max_objects
    );

    let result = evolve(engine, &evaluator);
    println!(
        "Uncovered/spilled cost: {:.1}",
        evaluator.cost(result.best.genes())
    );
    let render = evaluator.render(result.best.genes());

    let mut genes = GeneFile::new(&result.best);
    genes.target_dims = Some((evaluator.target().width, evaluator.target().height));
    genes.scale = Some(packer.scale);
    genes.stamp_paths = evaluator.slot_names().into_iter().map(String::from).collect();
    (genes, Some(render))
}

fn evolve<E: FitnessEvaluator>(config: EngineConfig, evaluator: E) -> EvolutionResult {
    let generations = config.max_generations;
    let report_every = (generations / 10).max(1);

    let mut engine = EvolutionEngine::new(config, evaluator).unwrap_or_else(|e| {
        eprintln!("Error creating engine: {}", e);
        std::process::exit(1);
    });

    println!("Running evolution...");
    let outcome = engine.run_with_callback(generations, |progress| {
        if progress.generation % report_every == 0 {
            println!(
                "  Generation {}/{}: best={:.6}, generation best={:.6}, mean={:.6}",
                progress.generation,
                progress.total_generations,
                progress.best_fitness,
                progress.generation_best,
                progress.avg_fitness
            );
        }
    });
    if let Err(e) = outcome {
        eprintln!("Evolution failed: {}", e);
        std::process::exit(1);
    }

    let result = engine.result().unwrap_or_else(|e| {
        eprintln!("No result: {}", e);
        std::process::exit(1);
    });

    println!();
    println!("Best score: {:.6}", result.best_score);
    println!(
        "Generations: {} ({:?}), {:.2}s, {:.1} evaluations/s",
        result.stats.generations,
        result.stats.stop_reason,
        result.stats.elapsed_seconds,
        result.stats.evaluations_per_second
    );
    println!();
    result
}

fn read_raster(path: &Path) -> Raster {
    let raster = Raster::open(path).unwrap_or_else(|e| {
        eprintln!("Error loading image {}: {}", path.display(), e);
        std::process::exit(1);
    });
    log::debug!(
        "Loaded {} ({}x{}, {} channels)",
        path.display(),
        raster.width,
        raster.height,
        raster.channels
    );
    raster
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> T {
    let text = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading {} {}: {}", what, path.display(), e);
        std::process::exit(1);
    });
    serde_json::from_str(&text).unwrap_or_else(|e| {
        eprintln!("Error parsing {} {}: {}", what, path.display(), e);
        std::process::exit(1);
    })
}

fn print_example_config() {
    match serde_json::to_string_pretty(&RunConfig::example()) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing example: {}", e),
    }
}
