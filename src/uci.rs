//! UCI protocol adapter.
//!
//! Thin, line-oriented layer over the engine façade. Searches run on a
//! worker thread that the engine value moves into; `stop`, `isready` and
//! `quit` join the worker and recover it. Malformed input is logged on the
//! error channel and ignored — the loop itself never fails.

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::config::{EngineConfig, MAX_TT_MB};
use crate::engine::Engine;
use crate::search::format_score;
use crate::time::ClockReport;
use crate::types::MAX_PLY;

pub fn run(config: EngineConfig) {
    let stdin = io::stdin();

    let new_engine = Engine::new(config);
    let stop_flag: Arc<AtomicBool> = new_engine.stop_handle();
    let mut engine: Option<Engine> = Some(new_engine);
    let mut search_thread: Option<thread::JoinHandle<Engine>> = None;

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        match tokens[0] {
            "uci" => {
                println!("id name basalt {}", env!("CARGO_PKG_VERSION"));
                println!("id author basalt authors");
                println!(
                    "option name Hash type spin default 128 min 1 max {}",
                    MAX_TT_MB
                );
                println!(
                    "option name MaxDepth type spin default 6 min 1 max {}",
                    MAX_PLY
                );
                println!("option name MoveTime type spin default 1000 min 1 max 600000");
                println!("option name Quiescence type check default true");
                println!("uciok");
            }
            "isready" => {
                wait_for_search(&mut search_thread, &mut engine);
                println!("readyok");
            }
            "ucinewgame" => {
                wait_for_search(&mut search_thread, &mut engine);
                if let Some(engine) = engine.as_mut() {
                    engine.new_game();
                }
            }
            "position" => {
                wait_for_search(&mut search_thread, &mut engine);
                if let Some(engine) = engine.as_mut() {
                    handle_position(&tokens, engine);
                }
            }
            "go" => {
                wait_for_search(&mut search_thread, &mut engine);
                let clock = parse_go(&tokens);
                let mut engine = match engine.take() {
                    Some(engine) => engine,
                    None => continue,
                };

                search_thread = Some(thread::spawn(move || {
                    let report = engine.choose_move(&clock);

                    let stats = report.stats;
                    let total = stats.nodes + stats.qnodes;
                    let elapsed = stats.elapsed_ms.max(1);
                    println!(
                        "info depth {} seldepth {} {} nodes {} time {} nps {}",
                        stats.depth_reached,
                        stats.seldepth.max(stats.depth_reached as usize),
                        format_score(report.score),
                        total,
                        elapsed,
                        total * 1000 / elapsed,
                    );

                    match report.best_move {
                        Some(mv) => println!("bestmove {}", mv),
                        None => println!("bestmove 0000"),
                    }

                    engine
                }));
            }
            "stop" => {
                stop_flag.store(true, Ordering::SeqCst);
                wait_for_search(&mut search_thread, &mut engine);
            }
            "setoption" => {
                wait_for_search(&mut search_thread, &mut engine);
                if let Some(engine) = engine.as_mut() {
                    handle_setoption(&tokens, engine);
                }
            }
            "quit" => {
                stop_flag.store(true, Ordering::SeqCst);
                wait_for_search(&mut search_thread, &mut engine);
                break;
            }
            other => {
                log::warn!("unknown command: {}", other);
            }
        }
    }
}

/// Join a running search and recover the engine it owns.
fn wait_for_search(handle: &mut Option<thread::JoinHandle<Engine>>, engine: &mut Option<Engine>) {
    if let Some(handle) = handle.take() {
        match handle.join() {
            Ok(recovered) => *engine = Some(recovered),
            Err(_) => {
                log::error!("search thread panicked; starting a fresh engine");
                *engine = Some(Engine::new(EngineConfig::default()));
            }
        }
    }
}

/// `position [startpos | fen <FEN>] [moves <m1> <m2> ...]`
///
/// An invalid FEN or illegal move aborts the whole command; the engine
/// keeps its previous position.
fn handle_position(tokens: &[&str], engine: &mut Engine) {
    if tokens.len() < 2 {
        return;
    }

    let mut idx = 1;
    let fen: Option<String> = match tokens[idx] {
        "startpos" => {
            idx += 1;
            None
        }
        "fen" => {
            idx += 1;
            let mut fields: Vec<&str> = Vec::new();
            while idx < tokens.len() && tokens[idx] != "moves" && fields.len() < 6 {
                fields.push(tokens[idx]);
                idx += 1;
            }
            Some(fields.join(" "))
        }
        other => {
            log::warn!("malformed position command: unexpected `{}`", other);
            return;
        }
    };

    let moves: &[&str] = if idx < tokens.len() && tokens[idx] == "moves" {
        &tokens[idx + 1..]
    } else {
        &[]
    };

    if let Err(err) = engine.set_position(fen.as_deref(), moves) {
        log::warn!("position command rejected: {}", err);
    }
}

/// `go [wtime N] [btime N] [winc N] [binc N] [movestogo N] [movetime N]
/// [depth N] [infinite]`
fn parse_go(tokens: &[&str]) -> ClockReport {
    let mut clock = ClockReport::default();
    let mut i = 1;

    while i < tokens.len() {
        match tokens[i] {
            "wtime" => {
                i += 1;
                clock.wtime_ms = tokens.get(i).and_then(|t| t.parse().ok());
            }
            "btime" => {
                i += 1;
                clock.btime_ms = tokens.get(i).and_then(|t| t.parse().ok());
            }
            "winc" => {
                i += 1;
                clock.winc_ms = tokens.get(i).and_then(|t| t.parse().ok());
            }
            "binc" => {
                i += 1;
                clock.binc_ms = tokens.get(i).and_then(|t| t.parse().ok());
            }
            "movestogo" => {
                i += 1;
                clock.movestogo = tokens.get(i).and_then(|t| t.parse().ok());
            }
            "movetime" => {
                i += 1;
                clock.movetime_ms = tokens.get(i).and_then(|t| t.parse().ok());
            }
            "depth" => {
                i += 1;
                clock.fixed_depth = tokens.get(i).and_then(|t| t.parse().ok());
            }
            "infinite" => {
                clock.infinite = true;
            }
            other => {
                log::warn!("ignoring unknown go parameter `{}`", other);
            }
        }
        i += 1;
    }

    clock
}

/// `setoption name <Name> [value <Value>]`
fn handle_setoption(tokens: &[&str], engine: &mut Engine) {
    let name_idx = tokens.iter().position(|&t| t == "name");
    let value_idx = tokens.iter().position(|&t| t == "value");

    let (name, value) = match (name_idx, value_idx) {
        (Some(n), Some(v)) if n + 1 <= v => (tokens[n + 1..v].join(" "), tokens[v + 1..].join(" ")),
        _ => {
            log::warn!("malformed setoption command");
            return;
        }
    };

    match name.to_lowercase().as_str() {
        "hash" => match value.parse::<usize>() {
            Ok(mb) => {
                let mb = mb.clamp(1, MAX_TT_MB);
                engine.config.search.tt_mb = mb;
                engine.state.resize_tt(mb);
            }
            Err(_) => log::warn!("invalid Hash value `{}`", value),
        },
        "maxdepth" => match value.parse::<u8>() {
            Ok(depth) => engine.config.search.max_depth = depth.clamp(1, MAX_PLY as u8),
            Err(_) => log::warn!("invalid MaxDepth value `{}`", value),
        },
        "movetime" => match value.parse::<u64>() {
            Ok(ms) => engine.config.search.time_ms = ms.max(1),
            Err(_) => log::warn!("invalid MoveTime value `{}`", value),
        },
        "quiescence" => match value.parse::<bool>() {
            Ok(enabled) => engine.config.search.quiescence = enabled,
            Err(_) => log::warn!("invalid Quiescence value `{}`", value),
        },
        other => log::warn!("unknown option `{}`", other),
    }
}
