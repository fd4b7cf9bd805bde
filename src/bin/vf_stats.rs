// Copyright @yucwang 2026

use vfactor::io::matrix_io::read_matrix;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <matrix.dat>", args[0]);
        std::process::exit(1);
    }

    let matrix = read_matrix(&args[1]).unwrap_or_else(|e| {
        eprintln!("failed to read {}: {}", args[1], e);
        std::process::exit(1);
    });

    let sums = matrix.row_sums();
    if sums.is_empty() {
        println!("patches=0 links=0");
        return;
    }

    let mut min = f64::MAX;
    let mut max = f64::MIN;
    let mut total = 0.0;
    let mut worst = 0usize;
    for (i, &s) in sums.iter().enumerate() {
        min = min.min(s);
        if s > max {
            max = s;
        }
        if (s - 1.0).abs() > (sums[worst] - 1.0).abs() {
            worst = i;
        }
        total += s;
    }

    println!("patches={} links={}", matrix.patches, matrix.links.len());
    println!("row_sum min={:.6} max={:.6} mean={:.6}", min, max, total / sums.len() as f64);
    println!("furthest from closure: patch {} (sum {:.6})", worst, sums[worst]);
}
