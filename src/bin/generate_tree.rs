//! Batch tree generation utility
//!
//! Grows and voxelizes trees and reports skeleton and volume statistics.
//!
//! Usage:
//!     generate_tree [OPTIONS]
//!
//! Options:
//!     -p, --preset <NAME>         default, oak, pine, spreading_oak, bush, cypress (default: default)
//!     --params <FILE>             Load parameters from a JSON file (overrides --preset)
//!     --save-params <FILE>        Write the effective parameters as JSON
//!     -n, --count <N>             Number of trees (default: 1)
//!     --seed <SEED>               Base seed for RNG (default: 12345)
//!     -i, --iterations <N>        Maximum growth iterations (default: 500)
//!     -r, --resolution <N>        Voxel grid resolution (default: 64)
//!     --leaf-density <F>          Leaf density at branch tips (default: 0.3)
//!     --leaf-cluster-size <F>     Leaf cluster size (default: 0.4)
//!     -h, --help                  Show this help message

use std::env;
use std::path::PathBuf;
use std::time::Instant;

use arbor::core::logging;
use arbor::procgen::{TreeParameters, VolumetricTree, DEFAULT_MAX_ITERATIONS};
use arbor::voxel::{Channel, VoxelizerSettings};

fn print_help() {
    eprintln!("generate_tree - Batch tree generation utility");
    eprintln!();
    eprintln!("Usage: generate_tree [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("    -p, --preset <NAME>         default, oak, pine, spreading_oak, bush, cypress (default: default)");
    eprintln!("    --params <FILE>             Load parameters from a JSON file (overrides --preset)");
    eprintln!("    --save-params <FILE>        Write the effective parameters as JSON");
    eprintln!("    -n, --count <N>             Number of trees (default: 1)");
    eprintln!("    --seed <SEED>               Base seed for RNG (default: 12345)");
    eprintln!("    -i, --iterations <N>        Maximum growth iterations (default: {})", DEFAULT_MAX_ITERATIONS);
    eprintln!("    -r, --resolution <N>        Voxel grid resolution (default: 64)");
    eprintln!("    --leaf-density <F>          Leaf density at branch tips (default: 0.3)");
    eprintln!("    --leaf-cluster-size <F>     Leaf cluster size (default: 0.4)");
    eprintln!("    -h, --help                  Show this help message");
    eprintln!();
    eprintln!("Example:");
    eprintln!("    generate_tree -p pine -n 10 -r 96");
    eprintln!("    generate_tree --params crown.json --seed 42");
}

#[derive(Debug)]
struct Args {
    preset: String,
    params_file: Option<PathBuf>,
    save_params: Option<PathBuf>,
    count: u32,
    seed: u64,
    iterations: u32,
    voxelizer: VoxelizerSettings,
}

fn next_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("Missing value for {}", flag))
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().skip(1).collect();

    let mut parsed = Args {
        preset: "default".to_string(),
        params_file: None,
        save_params: None,
        count: 1,
        seed: 12345,
        iterations: DEFAULT_MAX_ITERATIONS,
        voxelizer: VoxelizerSettings::default(),
    };

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-p" | "--preset" => {
                parsed.preset = next_value(&args, &mut i, flag)?.to_lowercase();
            }
            "--params" => {
                parsed.params_file = Some(PathBuf::from(next_value(&args, &mut i, flag)?));
            }
            "--save-params" => {
                parsed.save_params = Some(PathBuf::from(next_value(&args, &mut i, flag)?));
            }
            "-n" | "--count" => {
                let v = next_value(&args, &mut i, flag)?;
                parsed.count = v.parse().map_err(|_| format!("Invalid count: {}", v))?;
            }
            "--seed" => {
                let v = next_value(&args, &mut i, flag)?;
                parsed.seed = v.parse().map_err(|_| format!("Invalid seed: {}", v))?;
            }
            "-i" | "--iterations" => {
                let v = next_value(&args, &mut i, flag)?;
                parsed.iterations = v.parse().map_err(|_| format!("Invalid iterations: {}", v))?;
            }
            "-r" | "--resolution" => {
                let v = next_value(&args, &mut i, flag)?;
                parsed.voxelizer.resolution =
                    v.parse().map_err(|_| format!("Invalid resolution: {}", v))?;
            }
            "--leaf-density" => {
                let v = next_value(&args, &mut i, flag)?;
                parsed.voxelizer.leaf_density =
                    v.parse().map_err(|_| format!("Invalid leaf density: {}", v))?;
            }
            "--leaf-cluster-size" => {
                let v = next_value(&args, &mut i, flag)?;
                parsed.voxelizer.leaf_cluster_size =
                    v.parse().map_err(|_| format!("Invalid leaf cluster size: {}", v))?;
            }
            other => return Err(format!("Unknown option: {}", other)),
        }
        i += 1;
    }

    Ok(parsed)
}

fn load_params(args: &Args) -> arbor::Result<TreeParameters> {
    match &args.params_file {
        Some(path) => TreeParameters::load_sync(path),
        None => TreeParameters::preset(&args.preset).ok_or_else(|| {
            arbor::Error::Configuration(format!(
                "Unknown preset: {}. Valid presets: default, oak, pine, spreading_oak, bush, cypress",
                args.preset
            ))
        }),
    }
}

fn run(args: &Args) -> arbor::Result<()> {
    let params = load_params(args)?;
    if let Some(path) = &args.save_params {
        params.save_sync(path)?;
        log::info!("Wrote parameters to {}", path.display());
    }

    let total_start = Instant::now();
    let mut total_nodes = 0usize;

    for i in 0..args.count {
        let seed = args.seed.wrapping_add(i as u64).wrapping_mul(0x517cc1b727220a95);
        let start = Instant::now();

        let mut tree = VolumetricTree::new(params.clone())
            .with_seed(seed)
            .with_max_iterations(args.iterations)
            .with_voxelizer(args.voxelizer);
        let (skeleton, volume) = tree.compile()?;
        total_nodes += skeleton.len();

        let grid = &volume.grid;
        println!(
            "Tree {:>3} (seed {:>20}): {:>5} nodes, {:>4} tips, depth {:>3}, wood {:>7} / leaf {:>7} voxels, edge {:.2}m, {:.2}s",
            i,
            seed,
            skeleton.len(),
            skeleton.tip_count(),
            skeleton.max_depth(),
            grid.occupied(Channel::Wood),
            grid.occupied(Channel::Leaf),
            volume.bounds().max_extent(),
            start.elapsed().as_secs_f64()
        );
    }

    let elapsed = total_start.elapsed();
    println!();
    println!("Summary:");
    println!("  Trees generated: {}", args.count);
    println!("  Total nodes: {}", total_nodes);
    println!("  Total time: {:.2}s ({:.1} trees/sec)",
             elapsed.as_secs_f64(),
             args.count as f64 / elapsed.as_secs_f64().max(f64::EPSILON));
    Ok(())
}

fn main() {
    logging::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
