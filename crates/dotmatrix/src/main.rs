use std::path::PathBuf;
use std::process::exit;

use dotmatrix::{run_dump, DumpOptions};
use dotmatrix_common::key::Key;
use dotmatrix_gb::{CYCLES_PER_SECOND, SCREEN_HEIGHT, SCREEN_WIDTH};

const USAGE: &str =
    "Usage: dotmatrix <rom_path> <out_rgb24_path> [frames] [--boot <boot_rom>] [--press <key>]...";

fn usage_error(message: &str) -> ! {
    eprintln!("{message}");
    eprintln!("{USAGE}");
    exit(2);
}

fn main() {
    env_logger::init();

    let mut positional = Vec::new();
    let mut boot_rom = None;
    let mut held_keys = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--boot" => match args.next() {
                Some(path) => boot_rom = Some(PathBuf::from(path)),
                None => usage_error("--boot needs a path"),
            },
            "--press" => {
                let name = args.next().unwrap_or_else(|| usage_error("--press needs a key"));
                match Key::from_name(&name) {
                    Some(key) => held_keys.push(key),
                    None => usage_error(&format!("Unknown key '{name}'.")),
                }
            }
            "-h" | "--help" => {
                println!("{USAGE}");
                return;
            }
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let (Some(rom), Some(out)) = (positional.next(), positional.next()) else {
        usage_error("Missing ROM or output path.");
    };
    let frames: u32 = match positional.next() {
        Some(frames) => frames
            .parse()
            .unwrap_or_else(|_| usage_error("Invalid frames; expected an integer.")),
        None => 60,
    };
    if positional.next().is_some() {
        usage_error("Too many arguments.");
    }

    let options = DumpOptions::builder()
        .rom(rom)
        .out(out)
        .boot_rom(boot_rom)
        .frames(frames)
        .held_keys(held_keys)
        .build();

    match run_dump(&options) {
        Ok(buffer) => {
            let seconds = f64::from(options.frames) * dotmatrix_gb::lcd::FRAME_CYCLES as f64
                / CYCLES_PER_SECOND as f64;
            println!(
                "Wrote {} bytes ({}x{} rgb24) after {} frames ({seconds:.2}s emulated) to '{}'",
                buffer.len(),
                SCREEN_WIDTH,
                SCREEN_HEIGHT,
                options.frames,
                options.out.display()
            );
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            exit(1);
        }
    }
}
