//! pixgraph CLI - render per-pixel operator graphs from scene files.

use anyhow::{bail, Context, Result};
use pixgraph::prelude::*;
use std::sync::Arc;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("pixgraph");

    if args.len() < 2 {
        print_usage(program);
        return;
    }

    let result = match args[1].as_str() {
        "list" => {
            list_operators(args.get(2).map(String::as_str));
            Ok(())
        }
        "info" => match args.get(2) {
            Some(kind) => operator_info(kind),
            None => Err(anyhow::anyhow!("Please specify an operator kind")),
        },
        "render" => render(&args[2..]),
        "validate" => match args.get(2) {
            Some(scene) => validate_scene(scene),
            None => Err(anyhow::anyhow!("Please specify a scene file")),
        },
        "help" | "--help" | "-h" => {
            print_usage(program);
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage(program);
            std::process::exit(2);
        }
    };

    if let Err(e) = result {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}

fn print_usage(program: &str) {
    println!("🎨 pixgraph v{}", pixgraph::VERSION);
    println!();
    println!("Usage: {} <command> [options]", program);
    println!();
    println!("Commands:");
    println!("  list [query]                    List available operators");
    println!("  info <kind>                     Show detailed info about an operator");
    println!("  render <scene.json> <out.png>   Render a scene");
    println!("  validate <scene.json>           Check a scene without rendering");
    println!("  help                            Show this help message");
    println!();
    println!("Render options:");
    println!("  --parallel        Render rows in parallel");
    println!("  --threads <n>     Worker threads for --parallel (default: all cores)");
    println!("  --seed <n>        Seed for randomized operators");
    println!();
    println!("Set RUST_LOG=info (or debug) for progress logging.");
}

fn list_operators(query: Option<&str>) {
    let registry = OperatorRegistry::with_builtins();
    let matching: Option<Vec<&str>> = query.map(|q| registry.search(q));

    println!("Available operators ({} total):", registry.len());
    println!();

    for (category, operators) in registry.grouped_by_category() {
        let shown: Vec<_> = operators
            .into_iter()
            .filter(|m| matching.as_ref().map_or(true, |ids| ids.contains(&m.id.as_str())))
            .collect();
        if shown.is_empty() {
            continue;
        }

        println!("  📁 {}", category.display_name());
        for metadata in shown {
            println!("      • {} ({}) - {}", metadata.id, metadata.name, metadata.description);
        }
        println!();
    }
}

fn operator_info(kind: &str) -> Result<()> {
    let registry = OperatorRegistry::with_builtins();
    let metadata = registry.get_metadata(kind).with_context(|| {
        format!(
            "Operator not found: {} (use 'list' to see available operators)",
            kind
        )
    })?;

    println!("Operator: {}", metadata.name);
    println!("ID: {}", metadata.id);
    println!("Category: {}", metadata.category.display_name());
    if !metadata.deterministic {
        println!("Randomized: yes");
    }
    println!();
    println!("Description:");
    println!("  {}", metadata.description);
    println!();

    if !metadata.inputs.is_empty() {
        println!("Inputs:");
        for port in &metadata.inputs {
            let fallback = match port.fallback {
                InputFallback::Required => "",
                InputFallback::AmbientUv => " (defaults to pixel coordinate)",
                InputFallback::Optional => " (optional)",
            };
            println!("  • {} [{}]{}", port.name, port.port_type, fallback);
            if !port.description.is_empty() {
                println!("    {}", port.description);
            }
        }
        println!();
    }

    if !metadata.outputs.is_empty() {
        println!("Outputs:");
        for port in &metadata.outputs {
            println!("  • {} [{}]", port.name, port.port_type);
            if !port.description.is_empty() {
                println!("    {}", port.description);
            }
        }
        println!();
    }

    if !metadata.parameters.is_empty() {
        println!("Parameters:");
        for param in &metadata.parameters {
            println!("  • {} [{}] = {}", param.name, param.param_type, param.default_value);
            if !param.description.is_empty() {
                println!("    {}", param.description);
            }
        }
    }

    Ok(())
}

fn load_graph(scene_path: &str) -> Result<Graph> {
    let scene = SceneDescription::from_path(scene_path)
        .with_context(|| format!("Failed to read scene {}", scene_path))?;
    let graph = scene
        .build(Arc::new(OperatorRegistry::with_builtins()))
        .with_context(|| format!("Failed to build scene {}", scene_path))?;
    Ok(graph)
}

fn print_report(report: &ValidationReport) {
    for warning in &report.warnings {
        println!("⚠️  {}", warning);
    }
    for error in &report.errors {
        eprintln!("   {}", error);
        if let Some(fix) = error.suggested_fix() {
            eprintln!("     hint: {}", fix);
        }
    }
}

fn validate_scene(scene_path: &str) -> Result<()> {
    let graph = load_graph(scene_path)?;
    let report = validate(&graph);
    print_report(&report);

    if !report.can_execute() {
        bail!("Validation failed with {} error(s)", report.errors.len());
    }
    println!("✅ {} is valid ({} nodes)", scene_path, graph.node_count());
    Ok(())
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: Option<&String>) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = value.with_context(|| format!("{} needs a value", flag))?;
    value
        .parse()
        .with_context(|| format!("Invalid value for {}: {}", flag, value))
}

fn render(args: &[String]) -> Result<()> {
    if args.len() < 2 {
        bail!("Please specify a scene file and an output path");
    }
    let (scene_path, output_path) = (&args[0], &args[1]);

    let mut options = ExecutionOptions::new();
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--parallel" => {
                options = options.with_parallel(true);
                i += 1;
            }
            "--threads" => {
                options = options.with_max_threads(parse_value("--threads", args.get(i + 1))?);
                i += 2;
            }
            "--seed" => {
                options = options.with_seed(parse_value("--seed", args.get(i + 1))?);
                i += 2;
            }
            other => bail!("Unknown option: {}", other),
        }
    }

    let mut graph = load_graph(scene_path)?;

    let report = validate(&graph);
    print_report(&report);
    if !report.can_execute() {
        bail!("Validation failed with {} error(s)", report.errors.len());
    }

    println!("⚙️  Rendering {} -> {}", scene_path, output_path);
    let (image, stats) = ExecutionEngine::with_options(options)
        .execute(&mut graph)
        .context("Rendering failed")?;
    image
        .save(output_path)
        .with_context(|| format!("Failed to save {}", output_path))?;

    println!(
        "✅ {}x{} image saved to {} in {}ms ({} nodes per pixel)",
        stats.width,
        stats.height,
        output_path,
        stats.total_duration.as_millis(),
        stats.nodes_per_pixel
    );
    Ok(())
}
