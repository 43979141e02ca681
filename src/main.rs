//! Yagi Evolve CLI - Optimize an antenna design from a JSON job file.

use std::path::PathBuf;
use std::time::Instant;

use yagi_evolve::{
    compute::{EvaluatorPool, SurrogateEvaluator},
    compute::evolution::Optimizer,
    schema::{OptimizationJob, write_json},
};

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <job.json> [result.json]", args[0]);
        eprintln!();
        eprintln!("Optimize a Yagi design against the built-in surrogate evaluator.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  job.json     Baseline design, goal and optimizer settings");
        eprintln!("  result.json  Where to write the full result (optional)");
        eprintln!();
        eprintln!("Example job is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_job();
        return;
    }

    let job_path = PathBuf::from(&args[1]);
    let output_path = args.get(2).map(PathBuf::from);

    let job = OptimizationJob::load(&job_path).unwrap_or_else(|e| {
        eprintln!("Error loading job: {}", e);
        std::process::exit(1);
    });

    // One isolated surrogate session per batch slot
    let workers = job.config.evaluation.batch_size.max(1);
    let instances = (0..workers).map(|_| SurrogateEvaluator::new()).collect();
    let Some(pool) = EvaluatorPool::isolated(instances) else {
        eprintln!("Error: no evaluator instances");
        std::process::exit(1);
    };

    println!("Yagi Evolve");
    println!("===========");
    if !job.design.name.is_empty() {
        println!("Design: {}", job.design.name);
    }
    println!(
        "Elements: {} at {} MHz",
        job.design.elements.len(),
        job.design.frequency_mhz
    );
    println!("Goal: {:?}", job.goal);
    println!(
        "Population: {}, generations: {}, workers: {}",
        job.config.population.size, job.config.population.max_generations, workers
    );
    println!();

    let mut optimizer = Optimizer::new(&job.design, job.goal, job.config.clone(), pool)
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });

    println!("Running optimization...");
    let start = Instant::now();

    let result = optimizer
        .run_with_callback(|progress| {
            let record = &progress.record;
            println!(
                "  Gen {:>3}/{}: best={:.4}, avg={:.4}, valid={}, diversity={:.3}",
                progress.generation,
                progress.max_generations,
                progress.best_fitness,
                record.average_fitness,
                record.valid_solution_count,
                record.diversity
            );
        })
        .await
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });

    let elapsed = start.elapsed();

    println!();
    println!("Result:");
    println!("  Stop reason: {:?}", result.stats.stop_reason);
    println!("  Best fitness: {:.4}", result.best_fitness);
    println!(
        "  Evaluations: {} ({} failed, {} implausible)",
        result.stats.total_evaluations,
        result.stats.evaluator_failures,
        result.stats.implausible_results
    );
    println!();
    println!("  {:<10} {:>10} {:>10}", "Element", "Length m", "Pos m");
    for element in &result.best_design.elements {
        println!(
            "  {:<10} {:>10.4} {:>10.4}",
            format!("{:?}", element.role),
            element.length,
            element.position
        );
    }
    println!();
    println!("Time: {:.2}s", elapsed.as_secs_f32());

    if let Some(path) = output_path {
        if let Err(e) = write_json(&path, &result) {
            eprintln!("Error writing result: {}", e);
            std::process::exit(1);
        }
        println!("Result written to {}", path.display());
    }
}

fn print_example_job() {
    let job = OptimizationJob::default();

    println!("Example job (job.json):");
    match serde_json::to_string_pretty(&job) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error serializing example: {}", e),
    }
}
