//! Dice Rig entry point
//!
//! Runs a headless AI-vs-AI match at the fixed simulation rate and prints the
//! notable events. Pass a seed as the first argument to reproduce a match.

use std::path::Path;

use dice_rig::consts::SIM_DT;
use dice_rig::sim::{DiceGame, GameEvent, GamePhase, Side, TickInput};
use dice_rig::{GameConfig, MatchHistory, MatchRecord};

const HISTORY_PATH: &str = "match_history.json";
const MAX_MATCH_TICKS: u32 = 600_000;

fn main() {
    env_logger::init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(0xD1CE);
    let config = GameConfig::default();
    log::info!("Dice Rig starting, seed {seed}");

    let mut game = DiceGame::standard(config, seed);
    let mut input = TickInput {
        start: true,
        idle_mode: true,
        ..Default::default()
    };

    let mut ticks = 0;
    while game.phase() != GamePhase::GameEnd && ticks < MAX_MATCH_TICKS {
        game.tick(&input, SIM_DT);
        input.start = false;
        ticks += 1;
        let round = game.round();
        for event in game.events.drain(..) {
            print_event(&event, round);
        }
    }

    if game.phase() != GamePhase::GameEnd {
        log::error!("match did not finish within {MAX_MATCH_TICKS} ticks");
        return;
    }

    let (white_total, black_total) = game.totals();
    let winner = match white_total.cmp(&black_total) {
        std::cmp::Ordering::Greater => Some(Side::White),
        std::cmp::Ordering::Less => Some(Side::Black),
        std::cmp::Ordering::Equal => None,
    };
    println!(
        "\nfinal: white {white_total}, black {black_total} ({})",
        match winner {
            Some(side) => format!("{} wins", side.name()),
            None => "draw".to_string(),
        }
    );

    let path = Path::new(HISTORY_PATH);
    let mut history = MatchHistory::load(path);
    history.add(MatchRecord {
        winner,
        white_total,
        black_total,
        rounds: game.round(),
        seed,
    });
    if let Err(err) = history.save(path) {
        log::warn!("could not save match history: {err}");
    }
}

fn print_event(event: &GameEvent, round: u32) {
    match event {
        GameEvent::StateChanged { to, .. } => {
            println!("[round {round}] phase: {to:?}");
        }
        GameEvent::DiceThrown { side, dice } => {
            println!("[round {round}] {} throws {} dice", side.name(), dice.len());
        }
        GameEvent::DieRigged { die, natural, rigged } => {
            println!(
                "[round {round}] die {} steered {:?} -> {:?}",
                die.0, natural, rigged
            );
        }
        GameEvent::DieDestroyed { die, side } => {
            println!("[round {round}] {} die {} destroyed", side.name(), die.0);
        }
        GameEvent::ThrowResolved {
            side,
            white_total,
            black_total,
        } => {
            println!(
                "[round {round}] {} settles: white {white_total}, black {black_total}",
                side.name()
            );
        }
        GameEvent::GameEnded { winner } => {
            println!("[round {round}] match over, winner: {winner:?}");
        }
    }
}
