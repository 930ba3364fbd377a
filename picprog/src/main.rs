mod menu;
mod util;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use picprog_common::Device;

/// Turns a PIC firmware HEX file into a self-programming loader executable.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Intel HEX firmware, asked for when missing
    input: Option<PathBuf>,

    /// Output executable, defaults to the input name with a .COM extension
    output: Option<PathBuf>,

    /// Target device by menu number or name, e.g. 3 or PIC16F1847
    #[clap(short, long)]
    device: Option<Device>,

    /// Loader the script is appended to
    #[clap(short, long, default_value = "PICPROG.COM")]
    loader: PathBuf,

    /// Log per-pass details, RUST_LOG=trace adds every record
    #[clap(short, long)]
    verbose: bool,
}

fn run(args: Args) -> Result<(), util::Error> {
    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout();

    let input = match args.input {
        Some(v) => v,
        None => menu::ask_input(&mut stdin, &mut stdout).map_err(util::Error::Prompt)?,
    };
    let output = args
        .output
        .unwrap_or_else(|| util::default_output(&input));
    let device = match args.device {
        Some(v) => v,
        None => menu::select_device(&mut stdin, &mut stdout).map_err(util::Error::Prompt)?,
    };

    util::convert(&input, &output, &args.loader, device).map(|_| ())
}

fn log_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let env = env_logger::Env::default().default_filter_or(log_filter(args.verbose));
    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .init();
    log::debug!("{:?}", args);

    match run(args) {
        Ok(()) => {
            log::info!("Ok.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
