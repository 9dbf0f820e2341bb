//! metabeam command-line front end
//!
//! ```text
//! metabeam steer --bits 2 --theta-steer 30 --nx 16 --ny 16
//! metabeam pattern checkerboard_2x2 --bits 1
//! metabeam patterns
//! metabeam serve < requests.jsonl
//! ```
//!
//! Results are JSON on stdout; logs go to stderr.

use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueHint};
use metabeam_core::coding_pattern::PatternKind;
use metabeam_core::{
    init_logging, LogLevel, PatternParams, SimConfig, SimRequest, SimResponse, SimResult,
    SimService, SteerParams,
};

#[derive(Parser, Debug)]
#[command(
    name = "metabeam",
    author,
    version,
    about = "Phased reflective metasurface beam-steering simulator"
)]
struct Cli {
    /// Configuration file; the standard search path is used when omitted
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Override the configured log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Pretty-print JSON results
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Steer the reflected beam to a target direction
    Steer(SteerArgs),

    /// Evaluate a canonical coding pattern
    Pattern(PatternArgs),

    /// List canonical coding-pattern identifiers
    Patterns,

    /// Answer newline-delimited JSON requests from stdin
    Serve,
}

#[derive(Args, Debug)]
struct SteerArgs {
    /// Phase resolution in bits
    #[arg(long = "bits", default_value_t = 1)]
    n_bits: u32,

    /// Target polar angle in degrees
    #[arg(long, default_value_t = 30.0, allow_negative_numbers = true)]
    theta_steer: f64,

    /// Target azimuth in degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    phi_steer: f64,

    /// Incident polar angle in degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    theta_inc: f64,

    /// Incident azimuth in degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    phi_inc: f64,

    /// Elements along x
    #[arg(long, default_value_t = 16)]
    nx: usize,

    /// Elements along y
    #[arg(long, default_value_t = 16)]
    ny: usize,
}

impl From<&SteerArgs> for SteerParams {
    fn from(args: &SteerArgs) -> Self {
        SteerParams {
            n_bits: args.n_bits,
            theta_steer: args.theta_steer,
            phi_steer: args.phi_steer,
            theta_inc: args.theta_inc,
            phi_inc: args.phi_inc,
            nx: args.nx,
            ny: args.ny,
        }
    }
}

#[derive(Args, Debug)]
struct PatternArgs {
    /// Pattern identifier, see `metabeam patterns`
    pattern_type: String,

    /// Phase resolution in bits
    #[arg(long = "bits", default_value_t = 1)]
    n_bits: u32,

    /// Incident polar angle in degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    theta_inc: f64,

    /// Incident azimuth in degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    phi_inc: f64,

    /// Elements along x
    #[arg(long, default_value_t = 16)]
    nx: usize,

    /// Elements along y
    #[arg(long, default_value_t = 16)]
    ny: usize,
}

impl From<&PatternArgs> for PatternParams {
    fn from(args: &PatternArgs) -> Self {
        PatternParams {
            n_bits: args.n_bits,
            pattern_type: args.pattern_type.clone(),
            theta_inc: args.theta_inc,
            phi_inc: args.phi_inc,
            nx: args.nx,
            ny: args.ny,
        }
    }
}

fn load_config(cli: &Cli) -> SimResult<SimConfig> {
    let mut config = match &cli.config {
        Some(path) => SimConfig::load_from(path)?,
        None => SimConfig::load()?,
    };
    config.validate()?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
        config.logging.filter = None;
    }
    Ok(config)
}

fn emit(response: &SimResponse, pretty: bool) -> SimResult<ExitCode> {
    let text = if pretty {
        serde_json::to_string_pretty(response)?
    } else {
        response.to_line()
    };
    println!("{}", text);
    Ok(if response.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn run(cli: Cli) -> SimResult<ExitCode> {
    let config = load_config(&cli)?;
    init_logging(&config.logging);

    let service = SimService::from_config(&config);
    tracing::debug!(backends = ?service.chain().names(), "Service ready");

    match &cli.command {
        Command::Steer(args) => {
            let request = SimRequest::Simulate(args.into());
            let response = service.handle(&request);
            tracing::info!(op = request.op(), failed = response.is_error(), "Request complete");
            emit(&response, cli.pretty)
        }
        Command::Pattern(args) => {
            let request = SimRequest::SimulatePattern(args.into());
            let response = service.handle(&request);
            tracing::info!(op = request.op(), failed = response.is_error(), "Request complete");
            emit(&response, cli.pretty)
        }
        Command::Patterns => {
            for name in PatternKind::catalog() {
                println!("{}", name);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Serve => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            let answered = service.serve(stdin.lock(), BufWriter::new(stdout.lock()))?;
            tracing::info!(answered, "Input closed");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steer_defaults() {
        let cli = Cli::try_parse_from(["metabeam", "steer"]).unwrap();
        match cli.command {
            Command::Steer(args) => {
                let params = SteerParams::from(&args);
                assert_eq!(params.n_bits, 1);
                assert_eq!(params.theta_steer, 30.0);
                assert_eq!(params.nx, 16);
                assert_eq!(params.ny, 16);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_steer_negative_angles() {
        let cli = Cli::try_parse_from([
            "metabeam",
            "steer",
            "--bits",
            "3",
            "--theta-steer",
            "-20",
            "--theta-inc",
            "-30",
            "--nx",
            "8",
        ])
        .unwrap();
        match cli.command {
            Command::Steer(args) => {
                assert_eq!(args.n_bits, 3);
                assert_eq!(args.theta_steer, -20.0);
                assert_eq!(args.theta_inc, -30.0);
                assert_eq!(args.nx, 8);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_pattern_requires_name() {
        assert!(Cli::try_parse_from(["metabeam", "pattern"]).is_err());
        let cli = Cli::try_parse_from(["metabeam", "pattern", "gradient_x", "--bits", "2"]).unwrap();
        match cli.command {
            Command::Pattern(args) => {
                let params = PatternParams::from(&args);
                assert_eq!(params.pattern_type, "gradient_x");
                assert_eq!(params.n_bits, 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "metabeam",
            "serve",
            "--log-level",
            "debug",
            "--config",
            "/tmp/metabeam.yaml",
            "--pretty",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Serve));
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/metabeam.yaml")));
        assert!(cli.pretty);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Cli::try_parse_from(["metabeam", "steer", "--bits", "two"]).is_err());
        assert!(Cli::try_parse_from(["metabeam", "serve", "--log-level", "loud"]).is_err());
        assert!(Cli::try_parse_from(["metabeam"]).is_err());
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
