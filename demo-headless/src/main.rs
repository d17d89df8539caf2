use std::sync::Arc;
use std::time::Duration;

use caster_sim_core::{LumpedCoolingStepper, SliceInfo, Snapshot, StaticSteelCatalog, VerticalMap};
use caster_sim_session::{Hub, HubConfig, Msg, SessionError, TailPolicy};
use clap::Parser;
use serde_json::json;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Strand temperature field demo running one in-process session
#[derive(Parser, Debug)]
#[command(name = "caster-sim-demo")]
#[command(about = "Continuous casting strand temperature field demo", long_about = None)]
struct Args {
    /// Full cross-section length (wide face) in mm
    #[arg(long, default_value_t = 420)]
    length: usize,

    /// Full cross-section width (narrow face) in mm
    #[arg(long, default_value_t = 250)]
    width: usize,

    /// Strand length in mm
    #[arg(long, default_value_t = 4000)]
    z_length: usize,

    /// Sample spacing along the length in mm
    #[arg(long, default_value_t = 10)]
    x_step: usize,

    /// Sample spacing along the width in mm
    #[arg(long, default_value_t = 10)]
    y_step: usize,

    /// Slice spacing along the casting direction in mm
    #[arg(long, default_value_t = 20)]
    z_step: usize,

    /// Pouring temperature in °C
    #[arg(short, long, default_value_t = 1550.0)]
    temperature: f32,

    /// Casting speed in m/min
    #[arg(short, long, default_value_t = 1.2)]
    speed: f32,

    /// Snapshots to receive before switching to tail casting
    #[arg(short = 'n', long, default_value_t = 250)]
    snapshots: usize,

    /// Print every n-th snapshot
    #[arg(short, long, default_value_t = 25)]
    report_interval: usize,

    /// Apply tail immediately instead of at the next step
    #[arg(long)]
    immediate_tail: bool,
}

const STEEL_GRADE: i32 = 1;

/// Where the demo is in its script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Normal casting until enough snapshots arrived
    Casting { stop_sent: bool },
    /// Tail casting until the field is empty
    Draining,
}

fn request(kind: &str, content: impl Into<String>) -> Msg {
    Msg::new(kind, content)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if let Err(err) = run(&args).await {
        eprintln!("Session failed: {err}");
        std::process::exit(1);
    }
}

async fn run(args: &Args) -> Result<(), SessionError> {
    println!("=== Strand Temperature Field Demo ===\n");

    let policy = if args.immediate_tail {
        TailPolicy::Immediate
    } else {
        TailPolicy::NextStep
    };
    let config = HubConfig::default().with_tail_policy(policy);
    let catalog = Arc::new(StaticSteelCatalog::new().with_grade(STEEL_GRADE, 1465.0, 1518.0));

    let (inbound_tx, inbound_rx) = mpsc::channel(config.queue_capacity);
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Msg>(64);
    let hub = Hub::new(config, outbound_tx, Box::new(LumpedCoolingStepper::default()), catalog);
    let session = tokio::spawn(hub.run(inbound_rx));

    let env = json!({
        "coordinate": {
            "length": args.length,
            "width": args.width,
            "z_length": args.z_length,
            "x_step": args.x_step,
            "y_step": args.y_step,
            "z_step": args.z_step,
        },
        "steel_value": STEEL_GRADE,
        "drag_speed": args.speed,
        "start_temperature": args.temperature,
    });
    println!(
        "Strand {}x{}x{} mm, steps {}/{}/{} mm, pouring at {:.0}°C, {:.2} m/min\n",
        args.length, args.width, args.z_length, args.x_step, args.y_step, args.z_step, args.temperature, args.speed
    );

    let send = |msg: Msg| {
        let tx = inbound_tx.clone();
        async move { tx.send(msg).await.is_ok() }
    };

    send(request("env", env.to_string())).await;
    send(request("start", "")).await;

    println!("  Push |  Start |    End | Full | Tail | Up centre (°C) | Down centre (°C)");
    println!("-------|--------|--------|------|------|----------------|-----------------");

    let mut pushes = 0usize;
    let mut stage = Stage::Casting { stop_sent: false };
    while let Some(msg) = outbound_rx.recv().await {
        match (msg.kind.as_str(), stage) {
            ("data_push", _) => {
                pushes += 1;
                let Ok(snapshot) = serde_json::from_str::<Snapshot>(&msg.content) else {
                    continue;
                };
                if pushes % args.report_interval.max(1) == 0 {
                    print_snapshot(pushes, &snapshot);
                }
                if stage == (Stage::Casting { stop_sent: false }) && pushes >= args.snapshots {
                    stage = Stage::Casting { stop_sent: true };
                    send(request("stop", "")).await;
                }
            }
            ("stopped", Stage::Casting { .. }) => {
                query_field(&send).await;
                if !report_queries(&mut outbound_rx).await {
                    break;
                }
                println!("\nTail casting...");
                send(request("tail", "")).await;
                send(request("start", "")).await;
                stage = Stage::Draining;
                pushes = 0;
            }
            ("stopped", Stage::Draining) => {
                println!("\nField drained after {} more snapshots", pushes);
                break;
            }
            ("error", _) => println!("Error reply: {}", msg.content),
            (other, _) => tracing::debug!("Reply '{}': {}", other, msg.content),
        }
    }

    let _ = send;
    drop(inbound_tx);
    let result = session.await.map_err(|e| SessionError::Worker(e.to_string()))?;

    println!("\n=== Demo Complete ===");
    result
}

fn print_snapshot(push: usize, snapshot: &Snapshot) {
    let centre = |face: &Vec<Vec<f32>>| {
        face.get(face.len() / 2)
            .and_then(|row| row.get(row.len() / 2))
            .copied()
            .unwrap_or(f32::NAN)
    };
    println!(
        "{:6} | {:6} | {:6} | {:4} | {:4} | {:14.1} | {:15.1}",
        push,
        snapshot.start,
        snapshot.end,
        if snapshot.is_full { "yes" } else { "no" },
        if snapshot.is_tail { "yes" } else { "no" },
        centre(&snapshot.sides.up),
        centre(&snapshot.sides.down)
    );
}

async fn query_field<F, Fut>(send: &F)
where
    F: Fn(Msg) -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    send(request("generate_slice", "0")).await;
    send(request("generate_vertical_slice1", "")).await;
    send(request("generate_vertical_slice2", json!({"index": 0, "z_scale": 1}).to_string())).await;
}

/// Print the three query replies; returns false if the session went away.
async fn report_queries(outbound_rx: &mut mpsc::Receiver<Msg>) -> bool {
    let mut pending = 3;
    while pending > 0 {
        let Ok(Some(msg)) = tokio::time::timeout(Duration::from_secs(10), outbound_rx.recv()).await else {
            return false;
        };
        match msg.kind.as_str() {
            "slice_generated" => {
                pending -= 1;
                if let Ok(info) = serde_json::from_str::<SliceInfo>(&msg.content) {
                    println!("\nNewest slice ({} slices in field):", info.length);
                    println!(
                        "  Shell thickness  solid {:.1} / {:.1} mm, liquid {:.1} / {:.1} mm",
                        info.vertical_solid_thickness,
                        info.horizontal_solid_thickness,
                        info.vertical_liquid_thickness,
                        info.horizontal_liquid_thickness
                    );
                }
            }
            "vertical_slice1_generated" => {
                pending -= 1;
                println!("  Longitudinal curves: {} bytes", msg.content.len());
            }
            "vertical_slice2_generated" => {
                pending -= 1;
                if let Ok(map) = serde_json::from_str::<VerticalMap>(&msg.content) {
                    println!(
                        "  Narrow face map: solid join {:?}, liquid join {:?}",
                        map.solid_join, map.liquid_join
                    );
                }
            }
            "error" => {
                pending -= 1;
                println!("  Query failed: {}", msg.content);
            }
            _ => {}
        }
    }
    true
}
