//! gls29ee512 CLI - Command-line programmer for GLS29EE512 parallel EEPROMs.
//!
//! ## Features
//!
//! - Dump the chip contents to a file
//! - Write a 64 KiB image to the chip (with automatic verification)
//! - Verify the chip contents against an image
//! - Serial device auto-detection
//! - Shell completion generation
//! - Environment variable support

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use console::style;
use env_logger::Env;
use gls29ee512::{
    Error, Link, LinkConfig, ROM_SIZE, RomImage, SerialLink, TransferSession, auto_detect_device,
    create_dump_file, detect_ports,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use std::io::{self, BufWriter, Write as _};
use std::path::{Path, PathBuf};

/// Whether stderr is a terminal (set once at startup).
static STDERR_IS_TTY: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

/// Check if progress animations should be used (TTY and colors enabled).
fn use_fancy_output() -> bool {
    STDERR_IS_TTY.load(std::sync::atomic::Ordering::Relaxed) && console::colors_enabled_stderr()
}

/// gls29ee512 - programmer for GLS29EE512 parallel EEPROMs over a serial bridge.
///
/// Environment variables:
///   GLS29EE512_PORT   - Default serial device
///   GLS29EE512_BAUD   - Default baud rate (default: 500000)
#[derive(Parser)]
#[command(name = "gls29ee512")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Serial device to open (auto-detected if not specified).
    #[arg(short, long, global = true, env = "GLS29EE512_PORT")]
    device: Option<String>,

    /// Baud rate; non-default values must match the bridge firmware build.
    #[arg(
        short,
        long,
        global = true,
        default_value = "500000",
        env = "GLS29EE512_BAUD"
    )]
    baud: u32,

    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Dump the EEPROM contents to a file (refuses to overwrite).
    Dump {
        /// Output file for the 65536-byte image.
        file: PathBuf,
    },

    /// Write an image to the EEPROM, then verify it.
    Write {
        /// Input file; must be exactly 65536 bytes.
        file: PathBuf,

        /// Skip the verification pass after writing.
        #[arg(long)]
        no_verify: bool,
    },

    /// Verify the EEPROM contents against an image.
    Verify {
        /// Input file; must be exactly 65536 bytes.
        file: PathBuf,
    },

    /// List available serial ports.
    ListPorts {
        /// Output port list as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type for completions.
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(None)
        .init();

    let stderr_is_tty = console::Term::stderr().is_term();
    STDERR_IS_TTY.store(stderr_is_tty, std::sync::atomic::Ordering::Relaxed);
    if std::env::var("NO_COLOR").is_ok() || !stderr_is_tty {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    debug!("gls29ee512 v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&cli) {
        eprintln!("{} {e:#}", style("Error:").red().bold());
        std::process::exit(exit_code_for(&e));
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Dump { file } => cmd_dump(cli, file),
        Commands::Write { file, no_verify } => cmd_write(cli, file, *no_verify),
        Commands::Verify { file } => cmd_verify(cli, file),
        Commands::ListPorts { json } => {
            cmd_list_ports(*json);
            Ok(())
        },
        Commands::Completions { shell } => {
            cmd_completions(*shell);
            Ok(())
        },
    }
}

/// Map configuration errors (detected before any device I/O) to exit code 2,
/// runtime/protocol failures to exit code 1.
fn exit_code_for(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<Error>() {
        Some(
            Error::ImageSize { .. }
            | Error::DumpTargetExists(_)
            | Error::DeviceNotFound
            | Error::AmbiguousDevice(_),
        ) => 2,
        _ => 1,
    }
}

/// Resolve the serial device from CLI args or auto-detection.
fn resolve_device(cli: &Cli) -> Result<String> {
    if let Some(device) = &cli.device {
        return Ok(device.clone());
    }
    let port = auto_detect_device().context("No serial device given and auto-detection failed")?;
    Ok(port.name)
}

/// Open the link and run the advisory idle-prompt probe.
fn open_session(cli: &Cli, device: &str) -> Result<TransferSession<SerialLink>> {
    let config = LinkConfig::new(device).with_baud(cli.baud);
    let link = SerialLink::open(&config).with_context(|| format!("Failed to open {device}"))?;

    if !cli.quiet {
        eprintln!(
            "{} Using device {} at {} baud",
            style("🔌").cyan(),
            style(link.name()).green(),
            link.baud_rate()
        );
    }

    let mut session = TransferSession::new(link);
    session.probe_idle();
    Ok(session)
}

/// Build the byte-scaled progress bar for one pass over the chip.
fn progress_bar(quiet: bool, message: &str) -> ProgressBar {
    if quiet || !use_fancy_output() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(ROM_SIZE as u64);
    #[allow(clippy::unwrap_used)] // Static template string
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:9} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
    pb.set_message(message.to_string());
    pb
}

/// Dump command implementation.
fn cmd_dump(cli: &Cli, file: &Path) -> Result<()> {
    // Output target is claimed before any device I/O; an existing file is
    // never overwritten.
    let out = create_dump_file(file)?;
    let mut out = BufWriter::new(out);

    let device = resolve_device(cli)?;
    let mut session = open_session(cli, &device)?;

    let pb = progress_bar(cli.quiet, "Reading");
    let result = session.dump(&mut out, |done, _total| {
        pb.set_position(done as u64);
    });
    out.flush()?;

    // A partial file stays on disk on failure so the operator can inspect
    // how far the transfer progressed.
    result?;
    pb.finish();

    if !cli.quiet {
        eprintln!(
            "{} Dumped {} bytes to {}",
            style("✓").green(),
            ROM_SIZE,
            file.display()
        );
    }
    Ok(())
}

/// Write command implementation: write pass, then verify pass.
fn cmd_write(cli: &Cli, file: &Path, no_verify: bool) -> Result<()> {
    let image = RomImage::from_file(file)
        .with_context(|| format!("Failed to load image {}", file.display()))?;

    let device = resolve_device(cli)?;
    let mut session = open_session(cli, &device)?;

    let pb = progress_bar(cli.quiet, "Writing");
    session.write_image(&image, |done, _total| {
        pb.set_position(done as u64);
    })?;
    pb.finish();

    if !no_verify {
        let pb = progress_bar(cli.quiet, "Verifying");
        session.verify_image(&image, |done, _total| {
            pb.set_position(done as u64);
        })?;
        pb.finish();
    }

    if !cli.quiet {
        eprintln!("{} Write complete", style("✓").green());
    }
    Ok(())
}

/// Verify command implementation.
fn cmd_verify(cli: &Cli, file: &Path) -> Result<()> {
    let image = RomImage::from_file(file)
        .with_context(|| format!("Failed to load image {}", file.display()))?;

    let device = resolve_device(cli)?;
    let mut session = open_session(cli, &device)?;

    let pb = progress_bar(cli.quiet, "Verifying");
    session.verify_image(&image, |done, _total| {
        pb.set_position(done as u64);
    })?;
    pb.finish();

    if !cli.quiet {
        eprintln!("{} Verification passed", style("✓").green());
    }
    Ok(())
}

/// List ports command implementation.
fn cmd_list_ports(json: bool) {
    let detected = detect_ports();

    if json {
        let ports: Vec<serde_json::Value> = detected
            .iter()
            .map(|p| {
                serde_json::json!({
                    "name": p.name,
                    "usb": p.is_usb(),
                    "vid": p.vid,
                    "pid": p.pid,
                    "manufacturer": p.manufacturer,
                    "product": p.product,
                    "serial": p.serial,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&ports).unwrap_or_default()
        );
        return;
    }

    eprintln!("{}", style("Available serial ports:").bold().underlined());

    if detected.is_empty() {
        eprintln!("  {}", style("(none found)").dim());
        return;
    }

    for port in &detected {
        let vid_pid = if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
            format!(" ({vid:04X}:{pid:04X})")
        } else {
            String::new()
        };
        let product = port
            .product
            .as_deref()
            .map(|p| format!(" - {}", style(p).dim()))
            .unwrap_or_default();

        eprintln!(
            "  {} {}{}{}",
            style("•").green(),
            style(&port.name).cyan(),
            vid_pid,
            product
        );
    }

    if let Ok(auto) = auto_detect_device() {
        eprintln!(
            "\n{} Would auto-select: {}",
            style("→").green().bold(),
            style(&auto.name).cyan().bold()
        );
    }
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

#[cfg(test)]
mod cli_tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_command_is_valid() {
        // Verifies that all derive macros produce a valid clap Command
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parse_dump() {
        let cli = Cli::try_parse_from(["gls29ee512", "dump", "out.bin"]).unwrap();
        if let Commands::Dump { file } = cli.command {
            assert_eq!(file.to_str().unwrap(), "out.bin");
        } else {
            panic!("Expected Dump command");
        }
    }

    #[test]
    fn test_cli_parse_write_with_options() {
        let cli = Cli::try_parse_from([
            "gls29ee512",
            "--device",
            "/dev/ttyACM0",
            "--baud",
            "115200",
            "write",
            "rom.bin",
            "--no-verify",
        ])
        .unwrap();
        assert_eq!(cli.device.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(cli.baud, 115200);
        if let Commands::Write { file, no_verify } = cli.command {
            assert_eq!(file.to_str().unwrap(), "rom.bin");
            assert!(no_verify);
        } else {
            panic!("Expected Write command");
        }
    }

    #[test]
    fn test_cli_parse_verify() {
        let cli = Cli::try_parse_from(["gls29ee512", "verify", "rom.bin"]).unwrap();
        assert!(matches!(cli.command, Commands::Verify { .. }));
    }

    #[test]
    fn test_cli_parse_list_ports_json() {
        let cli = Cli::try_parse_from(["gls29ee512", "list-ports", "--json"]).unwrap();
        if let Commands::ListPorts { json } = cli.command {
            assert!(json);
        } else {
            panic!("Expected ListPorts command");
        }
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::try_parse_from(["gls29ee512", "list-ports"]).unwrap();
        assert_eq!(cli.baud, 500000);
        assert!(cli.device.is_none());
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_cli_missing_subcommand() {
        assert!(Cli::try_parse_from(["gls29ee512"]).is_err());
    }

    #[test]
    fn test_exit_code_mapping() {
        let usage: anyhow::Error = Error::ImageSize {
            expected: ROM_SIZE,
            actual: 3,
        }
        .into();
        assert_eq!(exit_code_for(&usage), 2);

        let usage: anyhow::Error = Error::DumpTargetExists(PathBuf::from("x.bin")).into();
        assert_eq!(exit_code_for(&usage), 2);

        let runtime: anyhow::Error = Error::ShortRead {
            page: 2,
            received: 100,
        }
        .into();
        assert_eq!(exit_code_for(&runtime), 1);

        let runtime: anyhow::Error = Error::Timeout {
            expected: "\">\"".into(),
            buffer: Vec::new(),
        }
        .into();
        assert_eq!(exit_code_for(&runtime), 1);
    }
}
