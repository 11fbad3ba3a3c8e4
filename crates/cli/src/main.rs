//! Tube emulation diagnostic CLI.
//!
//! This binary inspects tube configuration, boot ROMs and saved ULA state. It performs:
//! 1. **List:** Print the effective tube list from settings or the built-in defaults.
//! 2. **Probe:** Resolve and read one tube's boot ROM, reporting the path and size or the failure.
//! 3. **State:** Decode a saved ULA state in either layout and print its registers.
//! 4. **Defaults:** Print the built-in tube list as a settings document.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tubesim_core::config::{TubeSections, TubeSettings};
use tubesim_core::sim::BootRomLoader;
use tubesim_core::state::{self, StateLayout};
use tubesim_core::ula::flags::Control;
use tubesim_core::{TubeConfigs, TubeUla};

#[derive(Parser, Debug)]
#[command(
    name = "tubesim",
    version,
    about = "Tube coprocessor interface diagnostics",
    long_about = "Inspect tube configuration, boot ROMs and saved Tube ULA state.\n\nSettings are JSON; without a settings file the built-in tube list is used.\n\nExamples:\n  tubesim list\n  tubesim probe \"6502 External\" --settings tubes.json\n  tubesim state tube.state\n  tubesim defaults > tubes.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the effective tube list.
    List {
        /// Settings file (JSON).
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },

    /// Resolve and read a tube's boot ROM.
    Probe {
        /// Tube index or display name.
        tube: String,

        /// Settings file (JSON).
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },

    /// Decode a saved Tube ULA state.
    State {
        /// State file.
        file: PathBuf,
    },

    /// Print the built-in tube list as settings JSON.
    Defaults,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::List { settings } => cmd_list(settings.as_deref()),
        Commands::Probe { tube, settings } => cmd_probe(&tube, settings.as_deref()),
        Commands::State { file } => cmd_state(&file),
        Commands::Defaults => cmd_defaults(),
    }
}

/// Reads settings from `path`, or returns the defaults. Exits on error.
fn load_settings(path: Option<&Path>) -> TubeSettings {
    let Some(path) = path else {
        return TubeSettings::default();
    };
    let text = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading settings {}: {e}", path.display());
        process::exit(1);
    });
    TubeSettings::from_json(&text).unwrap_or_else(|e| {
        eprintln!("Error in settings {}: {e}", path.display());
        process::exit(1);
    })
}

/// Builds the tube list from settings. Exits on error.
fn load_configs(settings: &TubeSettings) -> TubeConfigs {
    TubeConfigs::load(settings).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    })
}

/// Prints one line per tube slot.
fn cmd_list(settings: Option<&Path>) {
    let settings = load_settings(settings);
    let configs = load_configs(&settings);

    println!(
        "{:>3}  {:<16} {:<12} {:>8}  {:<16} {:>5}",
        "#", "Name", "CPU", "ROM", "Boot ROM", "Speed"
    );
    for (i, tube) in configs.iter().enumerate() {
        let cpu = tube.cpu.map_or("(none)", |cpu| cpu.name());
        let rom = if tube.rom_size == 0 {
            "-".to_string()
        } else {
            format!("{:#X}", tube.rom_size)
        };
        println!(
            "{i:>3}  {:<16} {cpu:<12} {rom:>8}  {:<16} {:>5}",
            tube.name, tube.boot_rom, tube.speed_multiplier
        );
    }
}

/// Resolves a tube by index or name and reads its boot ROM.
fn cmd_probe(tube: &str, settings: Option<&Path>) {
    let settings = load_settings(settings);
    let configs = load_configs(&settings);
    let loader = BootRomLoader::from_settings(&settings);

    let index = configs.lookup(tube).unwrap_or_else(|| {
        eprintln!("Error: no tube '{tube}'");
        process::exit(1);
    });
    let config = configs.select(index).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });

    println!("[*] Tube #{index}: {}", config.name);
    if !config.needs_boot_rom() {
        println!("    no boot ROM needed");
        return;
    }
    match loader.resolve(config) {
        Ok(path) => println!("    path={}", path.display()),
        Err(e) => {
            eprintln!("[!] {e}");
            process::exit(1);
        }
    }
    match loader.load_boot_image(config) {
        Ok(Some(image)) => println!("    size={:#X}", image.len()),
        Ok(None) => println!("    no boot ROM needed"),
        Err(e) => {
            eprintln!("[!] {e}");
            process::exit(1);
        }
    }
}

/// Decodes a state file and prints its registers.
fn cmd_state(file: &Path) {
    let handle = File::open(file).unwrap_or_else(|e| {
        eprintln!("Error opening {}: {e}", file.display());
        process::exit(1);
    });
    let persisted = state::read_state(&mut BufReader::new(handle)).unwrap_or_else(|e| {
        eprintln!("Error decoding {}: {e}", file.display());
        process::exit(1);
    });

    let mut ula = TubeUla::new();
    let lines = ula.restore(&persisted.registers).unwrap_or_else(|e| {
        eprintln!("Error restoring {}: {e}", file.display());
        process::exit(1);
    });
    let regs = &persisted.registers;
    let layout = match persisted.layout {
        StateLayout::Current => "current (version 2)",
        StateLayout::Legacy => "legacy",
    };

    println!("Layout:      {layout}");
    println!("ROM overlay: {}", persisted.rom_overlay);
    println!("Control:     {:#04X} {:?}", regs.r1stat, Control::mask_of(regs.r1stat));
    println!("Host status:     {:02X?}", regs.hstat);
    println!("Parasite status: {:02X?}", regs.pstat);
    println!("R1 FIFO:     {} byte(s) waiting", ula.r1_fifo_len());
    let (ph3, hp3) = ula.r3_occupancy();
    println!("R3 buffers:  {ph3} to host, {hp3} to parasite");
    if let Some((hpl, phl)) = regs.latches {
        println!("Latches:     host {hpl:#04X}, parasite {phl:#04X}");
    }
    println!(
        "Interrupts:  host IRQ {}, parasite IRQ {}, parasite NMI {}",
        lines.host_irq, lines.parasite_irq, lines.parasite_nmi
    );
}

/// Prints the built-in tube list as settings JSON.
fn cmd_defaults() {
    let settings = TubeSettings {
        tubes: TubeSections::Numbered(TubeConfigs::builtin().to_sections()),
        ..TubeSettings::default()
    };
    match serde_json::to_string_pretty(&settings) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
