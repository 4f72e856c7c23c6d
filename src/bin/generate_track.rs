//! Headless track generator: builds a track and walks a viewer along it.
//!
//! Usage: cargo run --release --bin generate_track -- [OPTIONS]
//!
//! Options:
//!   --seed <SEED>         Random seed (default: 12345)
//!   --segments <N>        Segments the viewer walks through (default: 20)
//!   --strategy <NAME>     fixed | random | spiral | wavy (default: random)
//!   --config <PATH>       Generator config JSON (default: built-in)
//!   --ticks <N>           Tick budget before giving up (default: 100000)

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use trackforge::core::{Randomizer, RandomizerConfig};
use trackforge::generator::{GeneratorConfig, TrackEvent, TrackGenerator};
use trackforge::path::{PathGenerator, PathStrategy, RandomPath, SpiralPath, WavyPath};
use trackforge::segment::SegmentTemplate;
use trackforge::sequence::{Level, SegmentDefinition, SegmentSequence, SelectionPolicy};

const DT: f32 = 1.0 / 60.0;

fn main() {
    trackforge::core::logging::init();

    let args: Vec<String> = std::env::args().collect();
    let seed = parse_arg::<u64>(&args, "--seed").unwrap_or(12345);
    let walk = parse_arg::<usize>(&args, "--segments").unwrap_or(20);
    let strategy_name = parse_arg::<String>(&args, "--strategy").unwrap_or_else(|| "random".to_string());
    let config_path = parse_arg::<PathBuf>(&args, "--config");
    let max_ticks = parse_arg::<usize>(&args, "--ticks").unwrap_or(100_000);

    let mut config = match &config_path {
        Some(path) => match GeneratorConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => GeneratorConfig::default(),
    };
    config.level_randomizer = RandomizerConfig::Seeded(seed);
    config.generation_randomizer = RandomizerConfig::Seeded(seed.wrapping_add(1));

    let Some(strategy) = strategy(&strategy_name, seed) else {
        eprintln!("Unknown strategy '{}'; expected fixed, random, spiral or wavy", strategy_name);
        std::process::exit(1);
    };

    println!("=== Trackforge Track Generator ===");
    println!("Seed:     {}", seed);
    println!("Strategy: {}", strategy.name());
    println!("Walk:     {} segments", walk);
    println!(
        "Window:   {} ahead, {} max, multithreaded: {}",
        config.generate_ahead, config.max_segments, config.multithreaded
    );
    println!();

    let mut generator = TrackGenerator::new(config, vec![demo_level(seed)], Some(PathGenerator::new(strategy)));
    let (_, events) = generator.subscribe();
    if let Err(e) = generator.start_generation() {
        eprintln!("Failed to start generation: {}", e);
        std::process::exit(1);
    }

    let start = Instant::now();
    let mut ticks = 0;
    let mut walked = 0;
    let mut created = 0;
    let mut extruded = 0;
    let mut depleted = false;
    while ticks < max_ticks && walked < walk {
        generator.tick(DT);
        ticks += 1;

        for event in events.try_iter() {
            match event {
                TrackEvent::SegmentCreated(_) => created += 1,
                TrackEvent::SegmentExtruded(_) => extruded += 1,
                TrackEvent::SegmentEntered(index) => log::debug!("Entered segment {}", index),
                TrackEvent::LevelsDepleted => depleted = true,
                _ => {}
            }
        }

        if !generator.is_ready() || generator.is_busy() {
            continue;
        }
        let next = generator.entered_segment().map_or(0, |i| i + 1);
        if generator.segment(next).is_some() {
            generator.enter_segment(next);
            walked += 1;
        } else if depleted {
            break;
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    println!("Ticks:     {} ({:.2}s)", ticks, elapsed);
    println!("Created:   {}", created);
    println!("Extruded:  {}", extruded);
    println!("Walked:    {}", walked);
    println!("Live:      {}", generator.segments().len());
    println!("Length:    {:.1}", generator.calculate_length(0.0, 1.0));
    println!();
    for segment in generator.segments() {
        let end = segment.end_sample().map(|s| s.position).unwrap_or_default();
        println!(
            "  #{:<4} {:<8} len {:>6.2}  end ({:>8.2}, {:>8.2}, {:>8.2})",
            segment.index,
            segment.name(),
            segment.length(),
            end.x,
            end.y,
            end.z
        );
    }
    if walked < walk && !depleted {
        eprintln!("Tick budget exhausted after {} segments", walked);
        std::process::exit(2);
    }
}

fn strategy(name: &str, seed: u64) -> Option<PathStrategy> {
    match name {
        "fixed" => Some(PathStrategy::Fixed),
        "random" => Some(PathStrategy::Random(RandomPath::winding(Randomizer::seeded(seed), 45.0, 15.0, 5.0))),
        "spiral" => Some(PathStrategy::Spiral(SpiralPath::default())),
        "wavy" => Some(PathStrategy::Wavy(WavyPath::new(45.0, 5.0))),
        _ => None,
    }
}

/// Endless level alternating three straight pieces
fn demo_level(seed: u64) -> Level {
    let definitions = [("road", 4.0, 20.0), ("bridge", 3.0, 30.0), ("ramp", 4.0, 12.0)]
        .into_iter()
        .map(|(name, width, length)| {
            SegmentDefinition::new(Arc::new(SegmentTemplate::straight(name, width, length))).with_pool(4)
        })
        .collect();
    let sequence = SegmentSequence::new("demo", SelectionPolicy::Random { prevent_repeat: true })
        .with_definitions(definitions)
        .with_randomizer(Randomizer::seeded(seed))
        .with_spawn_count(0);
    Level::new("demo", vec![sequence])
}

fn parse_arg<T: FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}
