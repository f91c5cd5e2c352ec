use std::num::NonZeroUsize;

use clap::Parser;
use color_eyre::eyre::eyre;
use log::info;

use predicate_rules::eval::{Dataset, EvalConfig, Evaluator};
use predicate_rules::parser::{self, names_resolver, Lookahead};
use predicate_rules::predicate::Predicate;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Queries to evaluate, e.g. "[0;10) OR NOT [10;20)".
    #[arg(value_name = "QUERY", required = true)]
    queries: Vec<String>,

    /// Number of items in the dataset `0..size`.
    #[clap(long, value_name = "INT", default_value = "100000")]
    size: usize,

    /// Number of range atomics `[lo;hi)` splitting the dataset.
    #[clap(long, value_name = "INT", default_value = "10")]
    ranges: usize,

    /// Worker threads (default: hardware parallelism).
    #[clap(long, value_name = "INT")]
    threads: Option<usize>,

    /// Maximum number of cached results.
    #[clap(long, value_name = "INT", default_value = "1024")]
    cache: NonZeroUsize,

    /// Resolve atomic names with the longest match instead of the shortest.
    #[clap(long)]
    longest: bool,
}

/// Atomics `[lo;hi)` splitting `0..size` into `n` equal ranges, plus `even`.
fn atomics(size: usize, n: usize) -> Vec<Predicate<usize>> {
    let mut atomics: Vec<Predicate<usize>> = (0..n)
        .map(|i| {
            let (lo, hi) = (size * i / n, size * (i + 1) / n);
            Predicate::atomic(format!("[{};{})", lo, hi), move |x: &usize| lo <= *x && *x < hi)
        })
        .collect();
    atomics.push(Predicate::atomic_non_negatable("even", |x: &usize| x % 2 == 0));
    atomics
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let atomics = atomics(args.size, args.ranges);
    println!("atomics = [{}]", atomics.iter().map(Predicate::name).collect::<Vec<_>>().join(", "));

    let lookahead = if args.longest { Lookahead::Longest } else { Lookahead::Shortest };
    let parser = parser::Parser::new(names_resolver(atomics)).with_lookahead(lookahead);

    let mut config = EvalConfig::default().with_cache_capacity(args.cache);
    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }
    let evaluator = Evaluator::new(config)?;
    info!("evaluating on {} threads", evaluator.threads());

    let data = Dataset::new((0..args.size).collect());

    for query in &args.queries {
        let predicate = parser.parse(query)?;
        if !predicate.is_defined() {
            return Err(eyre!("query {:?} is undefined", query));
        }
        println!("{} (complexity {})", predicate, predicate.complexity());

        let time = std::time::Instant::now();
        let bits = evaluator.test(&predicate, &data)?;
        println!(
            "  matches {} of {} items in {:.3} ms",
            bits.len(),
            data.len(),
            time.elapsed().as_secs_f64() * 1000.0
        );
    }

    println!("cache: {} hits, {} misses, {} entries", evaluator.hits(), evaluator.misses(), evaluator.cached());
    println!("Total time: {:.3} s", time_total.elapsed().as_secs_f64());

    Ok(())
}
