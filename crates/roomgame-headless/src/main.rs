use std::path::PathBuf;
use std::process;

use roomgame_game::GameConfig;
use roomgame_headless::report;
use roomgame_headless::runner::SceneRunner;
use roomgame_headless::scenes;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut frame_count = 600u32;
    let mut frame_dt = 1.0f32 / 60.0;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                config_path = Some(PathBuf::from(arg_value(&args, i)));
                i += 1;
            }
            "--output" => {
                output_path = Some(PathBuf::from(arg_value(&args, i)));
                i += 1;
            }
            "--frames" => {
                frame_count = parse_or_exit(arg_value(&args, i), "--frames");
                i += 1;
            }
            "--dt" => {
                frame_dt = parse_or_exit(arg_value(&args, i), "--dt");
                i += 1;
            }
            "--help" | "-h" => {
                eprintln!("Usage: roomgame-headless [OPTIONS]");
                eprintln!("  --config <path>   Game config RON (default: built-in defaults)");
                eprintln!("  --output <path>   Save results as JSON");
                eprintln!("  --frames <n>      Frames per scene after its script (default: 600)");
                eprintln!("  --dt <seconds>    Frame delta (default: 1/60)");
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    let config = match &config_path {
        Some(path) => {
            let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("Failed to read {}: {}", path.display(), e);
                process::exit(1);
            });
            GameConfig::from_ron_str(&text).unwrap_or_else(|e| {
                eprintln!("{}: {}", path.display(), e);
                process::exit(1);
            })
        }
        None => GameConfig::default(),
    };

    let runner = SceneRunner::new(config.clone(), frame_count, frame_dt);
    let mut results = Vec::new();
    for scene in &scenes::standard_scenes() {
        match runner.run_scene(scene) {
            Ok(result) => results.push(result),
            Err(e) => {
                log::error!("Scene '{}' failed: {}", scene.name, e);
                process::exit(1);
            }
        }
    }

    println!("\n## Roomgame Headless Results\n");
    println!("{}", report::format_markdown(&results));

    if let Some(ref path) = output_path {
        let report = report::Report {
            label: format!("headless-{}", process::id()),
            columns: config.columns,
            rows: config.rows,
            results,
        };
        if let Err(e) = report::save_report(path, &report) {
            log::error!("Failed to save report to {}: {}", path.display(), e);
            process::exit(1);
        }
        log::info!("Saved report to {}", path.display());
    }

    log::info!("Headless run complete.");
}

fn arg_value(args: &[String], i: usize) -> &str {
    match args.get(i + 1) {
        Some(v) => v,
        None => {
            eprintln!("Missing value for {}", args[i]);
            process::exit(1);
        }
    }
}

fn parse_or_exit<T: std::str::FromStr>(value: &str, flag: &str) -> T {
    value.parse().unwrap_or_else(|_| {
        eprintln!("Invalid {} value: {}", flag, value);
        process::exit(1);
    })
}
