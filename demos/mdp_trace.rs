use clap::Parser;
use log::info;

use coins_rs::circuit::{from_int, to_int, Assignment};
use coins_rs::distribution::{coin, Distribution};
use coins_rs::expr::BvExpr;
use coins_rs::mdp::{Mdp, VALID_ID};
use coins_rs::solver::Solver;
use coins_rs::utils::ratio;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Number of steps in the trace.
    #[arg(value_name = "INT", default_value = "5")]
    steps: usize,

    /// Probability that a requested move slips, as `NUM/DEN`.
    #[clap(long, value_name = "INT", default_value = "1")]
    slip_num: i64,

    #[clap(long, value_name = "INT", default_value = "4")]
    slip_den: i64,

    /// Solver memo size (in bits, so the actual size is `2^size` queries).
    #[clap(long, value_name = "INT", default_value = "12")]
    cache: usize,
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

    // A 2-bit position that advances when the agent moves and the move does
    // not slip.
    let pos = BvExpr::atom(2, "pos");
    let go = BvExpr::atom(1, "go");
    let slip = BvExpr::atom(1, "slip");
    let step = &go & &!&slip;
    let next = BvExpr::ite(&step, &(&pos + &BvExpr::constant(2, 1)), &pos).with_output("pos_next");

    let world = Mdp::from(next).feedback(&["pos"], &["pos_next"], None, Some(&["pos_prev"]), true);
    let slip = Distribution::from(coin(&ratio(args.slip_num, args.slip_den), "slip"));
    let world = world << slip;
    println!("system inputs = {:?}", world.inputs());
    println!("environment inputs = {:?}", world.env_inputs());
    println!("outputs = {:?}", world.outputs());

    // The agent always moves; every other move slips.
    let actions: Vec<Assignment> = (0..args.steps)
        .map(|_| Assignment::from([("go".to_string(), vec![true])]))
        .collect();
    let states: Vec<Assignment> = (0..args.steps)
        .map(|t| Assignment::from([("pos_next".to_string(), from_int(((t + 1) / 2) as u64 % 4, 2))]))
        .collect();

    let solver = Solver::new(args.cache);
    let coin_actions = world.encode_trc(&solver, &actions, &states)?;
    for (t, action) in coin_actions.iter().enumerate() {
        let flips: Vec<_> = action
            .iter()
            .filter(|(name, _)| !world.inputs().contains(*name))
            .map(|(name, bits)| format!("{}={}", name, to_int(bits)))
            .collect();
        println!("step {}: coins {}", t, flips.join(", "));
    }

    let (sys_actions, decoded) = world.decode_trc(&coin_actions)?;
    assert_eq!(sys_actions, actions);
    assert_eq!(decoded, states);
    info!("decoded trace matches, valid output '{}' held on every step", VALID_ID);
    println!("solver = {:?}", solver);

    let total = time_total.elapsed();
    println!("Done in {:.2} s", total.as_secs_f64());

    Ok(())
}
