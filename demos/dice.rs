use std::collections::BTreeMap;

use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use coins_rs::distribution::binomial;
use coins_rs::encoder::MergeOrder;
use coins_rs::encoding::Value;
use coins_rs::expr::BvExpr;
use coins_rs::infer::prob;
use coins_rs::pcirc::{pcirc, DistMap, PCirc, RandomVar};
use coins_rs::utils::ratio;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Face weights (unnormalized).
    #[arg(value_name = "INT", num_args = 1.., default_values_t = vec![1u32, 1, 1, 1, 1, 1])]
    weights: Vec<u32>,

    /// Merge coins into a chain instead of a balanced tree.
    #[clap(long)]
    chain: bool,

    /// Number of rolls to sample.
    #[clap(long, value_name = "INT", default_value = "20")]
    rolls: usize,

    /// Random seed.
    #[clap(long, value_name = "INT", default_value = "42")]
    seed: u64,

    /// Number of fair coins in the binomial example.
    #[clap(long, value_name = "INT", default_value = "6")]
    flips: usize,
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

    let order = if args.chain { MergeOrder::Chain } else { MergeOrder::Balanced };
    let sides = args.weights.len() as u64;
    let width = (64 - (sides.max(2) - 1).leading_zeros()) as usize;

    // A die is the identity over its face, with the face drawn from the weights.
    let die = BvExpr::atom(width, "die").with_output("face");
    let weights = args
        .weights
        .iter()
        .enumerate()
        .map(|(face, &w)| (Value::Int(face as u64), ratio(w as i64, 1)))
        .collect();
    let dist_map: DistMap = BTreeMap::from([("die".to_string(), weights)]);
    let circ = pcirc(die, &dist_map, order)?;
    println!(
        "die with {} faces uses {} coins, biases {:?}",
        sides,
        circ.num_coins(),
        circ.coin_biases().iter().map(|b| b.to_string()).collect::<Vec<_>>()
    );

    for face in 0..sides {
        let hit = BvExpr::atom(width, "face")
            .equals(&BvExpr::constant(width, face))
            .with_output("hit");
        let query: PCirc = &circ >> hit;
        println!("Pr(face = {}) = {:.6}", face + 1, prob(&query, false)?);
    }

    let var = RandomVar::new(circ);
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut rolls = Vec::with_capacity(args.rolls);
    for _ in 0..args.rolls {
        match var.call_with(&mut rng, &BTreeMap::new(), None)? {
            Value::Int(face) => rolls.push(face + 1),
            other => info!("unexpected draw {}", other),
        }
    }
    println!("rolls = {:?}", rolls);

    let dist = binomial(args.flips, "flips");
    for (k, p) in dist.freqs().iter().enumerate() {
        println!("Pr({} heads out of {}) = {}", k, args.flips, p);
    }

    let total = time_total.elapsed();
    println!("Done in {:.2} s", total.as_secs_f64());

    Ok(())
}
