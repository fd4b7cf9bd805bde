// Copyright @yucwang 2026

use std::env;
use std::process;
use std::str::FromStr;
use std::time::Duration;

use console::style;

use vfactor::core::enclosure_loader::load_enclosure;
use vfactor::io::matrix_io::write_matrix;
use vfactor::compute_view_factors;

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} <enclosure.xml> <output.dat> [--rays N] [--factor-eps F] [--area-eps F] \
               [--seed N] [--max-depth N] [--threads N] [--time-budget SECS] [--progress]", program);
    process::exit(1);
}

fn flag_value<T: FromStr>(args: &[String], i: usize) -> T {
    match args.get(i).and_then(|v| v.parse::<T>().ok()) {
        Some(v) => v,
        None => {
            eprintln!("{} missing or invalid value for {}", style("error:").red().bold(), args[i - 1]);
            process::exit(1);
        }
    }
}

fn main() {
    env::set_var("RUST_LOG", "info");
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        usage(&args[0]);
    }

    let input_path = &args[1];
    let output_path = &args[2];

    let load_result = match load_enclosure(input_path) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{} failed to load {}: {}", style("error:").red().bold(), input_path, e);
            process::exit(1);
        }
    };
    let patches = load_result.patches;
    let mut config = load_result.config;

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--rays" => {
                i += 1;
                config.nrays = flag_value(&args, i);
            }
            "--factor-eps" => {
                i += 1;
                config.factor_eps = flag_value(&args, i);
            }
            "--area-eps" => {
                i += 1;
                config.area_eps = flag_value(&args, i);
            }
            "--seed" => {
                i += 1;
                config.seed = flag_value(&args, i);
            }
            "--max-depth" => {
                i += 1;
                config.max_depth = flag_value(&args, i);
            }
            "--threads" => {
                i += 1;
                config.threads = flag_value(&args, i);
            }
            "--time-budget" => {
                i += 1;
                let secs: f64 = flag_value(&args, i);
                if !(secs >= 0.0 && secs.is_finite()) {
                    eprintln!("{} invalid time budget {}", style("error:").red().bold(), secs);
                    process::exit(1);
                }
                config.time_budget = Some(Duration::from_secs_f64(secs));
            }
            "--progress" => config.progress = true,
            other => {
                log::warn!("ignoring unknown argument {}", other);
            }
        }
        i += 1;
    }

    let result = match compute_view_factors(&patches, &config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            process::exit(2);
        }
    };

    if let Err(e) = write_matrix(output_path, &result.table) {
        eprintln!("{} failed to write {}: {}", style("error:").red().bold(), output_path, e);
        process::exit(1);
    }

    let stats = &result.stats;
    println!("{} {} patches, {} links", style("done:").green().bold(),
             result.table.len(), result.table.link_count());
    println!("  pairs    {} resolved, {} aborted of {}",
             stats.pairs_resolved, stats.pairs_aborted, stats.pairs_scheduled);
    println!("  rays     {}", stats.rays_cast);
    println!("  elapsed  {:.2?}", stats.elapsed);
    if stats.patches_skipped > 0 {
        println!("  {} {} degenerate patches skipped", style("note:").yellow(), stats.patches_skipped);
    }
    if stats.truncated || stats.pairs_aborted > 0 {
        println!("  {} matrix is incomplete", style("warning:").yellow().bold());
        process::exit(3);
    }
}
