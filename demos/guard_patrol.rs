//! Guard Patrol State Machine
//!
//! This example drives a guard that patrols, spots an intruder, chases it
//! and is interrupted by a radio call pushed on top of the chase.
//!
//! Key concepts:
//! - Labels as tick-driven routines that suspend between ticks
//! - Goto replacing the top of the stack
//! - Push suspending the caller until the pushed state pops
//! - A global state running beside the stack
//!
//! Run with: RUST_LOG=debug cargo run --example guard_patrol

use stackmind::core::StateId;
use stackmind::labels::LabelCallback;
use stackmind::machine::StateMachineBuilder;
use stackmind::state::StateSpec;
use tracing_subscriber::EnvFilter;

const PATROLLING: StateId = StateId::from_static("Patrolling");
const CHASING: StateId = StateId::from_static("Chasing");
const RADIO: StateId = StateId::from_static("Radio");
const NOISE: StateId = StateId::from_static("Noise");

stackmind::label_tags! {
    const WALK = "Walk";
    const PURSUE = "Pursue";
    const ANSWER = "Answer";
    const HUM = "Hum";
}

#[derive(Default)]
struct Route {
    waypoint: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    println!("=== Guard Patrol State Machine ===\n");

    let machine = StateMachineBuilder::new()
        .state(
            PATROLLING,
            StateSpec::new().data::<Route>().label(
                WALK,
                LabelCallback::new(|cx| async move {
                    loop {
                        let waypoint = match cx.data_mut::<Route>() {
                            Some(mut route) => {
                                route.waypoint += 1;
                                route.waypoint
                            }
                            None => 0,
                        };
                        println!("  [{:>4.2}s] walking to waypoint {}", cx.time(), waypoint);
                        if waypoint == 3 {
                            println!("  [{:>4.2}s] intruder spotted!", cx.time());
                            cx.goto_state(CHASING, PURSUE)?;
                            return Ok(());
                        }
                        cx.delay(0.5).await;
                    }
                }),
            ),
        )
        .state(
            CHASING,
            StateSpec::new()
                .label(
                    PURSUE,
                    LabelCallback::new(|cx| async move {
                        println!("  [{:>4.2}s] chasing, calling it in", cx.time());
                        cx.push_state(RADIO, ANSWER).await?;
                        println!("  [{:>4.2}s] radio done, back on the trail", cx.time());
                        cx.wait_ticks(2).await;
                        println!("  [{:>4.2}s] lost the intruder", cx.time());
                        Ok(())
                    }),
                )
                .on_paused(|state| println!("  {} paused", state.id()))
                .on_resumed(|state| println!("  {} resumed", state.id())),
        )
        .state(
            RADIO,
            StateSpec::new().label(
                ANSWER,
                LabelCallback::new(|cx| async move {
                    println!("  [{:>4.2}s] radio: copy that", cx.time());
                    cx.wait_ticks(3).await;
                    cx.pop_state()?;
                    Ok(())
                }),
            ),
        )
        .global(
            NOISE,
            StateSpec::new().label(
                HUM,
                LabelCallback::new(|cx| async move {
                    for _ in 0..8 {
                        cx.wait_ticks(4).await;
                        println!("  [{:>4.2}s] (the lights hum)", cx.time());
                    }
                    Ok(())
                }),
            ),
        )
        .initial_with_label(PATROLLING, WALK)
        .build()
        .expect("guard machine is well formed");

    if let Some(noise) = machine.state(&NOISE) {
        let _ = noise.goto_label(HUM);
    }

    for _ in 0..16 {
        machine.tick(0.25);
    }

    println!("\nFinal stack: {:?}", machine.stack());
    println!("Path: {:?}", machine.history().get_path());
    match machine.snapshot().to_json() {
        Ok(json) => println!("\nSnapshot:\n{json}"),
        Err(error) => println!("\nSnapshot failed: {error}"),
    }

    println!("\n=== Example Complete ===");
}
