use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::Parser;
use meter_reader::{ApplyOutcome, ScanSession, ScanState};

#[derive(Parser, Debug)]
#[command(
    name = "meter-reader",
    version,
    about = "Read the register of a utility meter from a photo"
)]
struct Cli {
    /// Photo of the meter (repeat for several frames)
    #[arg(short = 'i', long = "image")]
    image: Vec<PathBuf>,

    /// Number of digits on the meter register
    #[arg(short = 'd', long = "digits", default_value_t = 6)]
    digits: usize,

    /// Meter identifier used in reports and accepted readings
    #[arg(short = 'm', long = "meter-id", default_value = "meter")]
    meter_id: String,

    /// The last register digit is a decimal fraction
    #[arg(long = "decimal")]
    decimal: bool,

    /// Last accepted reading, used to rule out implausible values
    #[arg(short = 'l', long = "last")]
    last: Option<f64>,

    /// Serve recognizer output from a JSON fixture instead of tesseract
    #[arg(long = "fixture")]
    fixture: Option<PathBuf>,

    /// Require the same reading on consecutive frames
    #[arg(long = "consensus")]
    consensus: bool,

    /// Accept a reading: best, alt:N or the digits to enter manually
    #[arg(short = 'a', long = "accept")]
    accept: Option<String>,

    /// Print JSON instead of the text report
    #[arg(long = "json")]
    json: bool,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Show installed tesseract languages and exit
    #[arg(long = "show-languages")]
    show_languages: bool,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,

    /// Interactive scan session
    #[arg(long = "interactive")]
    interactive: bool,
}

impl Cli {
    fn config(&self) -> meter_reader::Config {
        meter_reader::Config {
            images: self.image.clone(),
            meter_id: self.meter_id.clone(),
            digits: self.digits,
            decimal: self.decimal,
            last: self.last,
            fixture: self.fixture.clone(),
            consensus: self.consensus,
            accept: self.accept.clone(),
            json: self.json,
            settings_path: self.read_settings.clone(),
            show_languages: self.show_languages,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    meter_reader::logging::init(cli.verbose)?;
    if cli.interactive {
        return run_interactive(cli).await;
    }

    let output = meter_reader::run(cli.config()).await?;
    println!("{}", output);
    Ok(())
}

struct InteractiveState {
    config: meter_reader::Config,
    reader: meter_reader::DynReader,
    session: ScanSession,
}

async fn run_interactive(cli: Cli) -> Result<()> {
    let config = cli.config();
    config.profile()?;
    let reader = meter_reader::build_reader(&config).await?;
    let mut state = InteractiveState {
        config,
        reader,
        session: ScanSession::new(),
    };
    println!("Interactive scan. Use /quit or /exit to finish.");
    println!("Type /help to see available commands.");

    let mut line = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();
    loop {
        line.clear();
        print!("[{}] > ", state.session.state());
        io::stdout().flush()?;
        if stdin_lock.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        match handle_interactive_command(input, &mut state).await {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => eprintln!("error: {}", err),
        }
    }
    Ok(())
}

async fn handle_interactive_command(input: &str, state: &mut InteractiveState) -> Result<bool> {
    let trimmed = input.trim();
    if matches!(trimmed, "/quit" | "/exit") {
        return Ok(true);
    }
    if trimmed == "/help" {
        print_interactive_help();
        return Ok(false);
    }
    if trimmed == "/state" {
        println!("{}", state.session.state());
        return Ok(false);
    }
    if trimmed == "/retry" {
        state.session.retry()?;
        println!("ready for a new capture");
        return Ok(false);
    }
    if trimmed == "/dismiss" {
        state.session.dismiss();
        return Ok(true);
    }
    if let Some(arg) = trimmed.strip_prefix("/last") {
        let value = arg.trim();
        if value.is_empty() {
            match state.config.last {
                Some(last) => println!("last: {}", last),
                None => println!("last: (none)"),
            }
        } else if value == "clear" {
            state.config.last = None;
            println!("last cleared");
        } else {
            let parsed = value
                .parse::<f64>()
                .map_err(|_| anyhow!("expected a number or 'clear'"))?;
            state.config.last = Some(parsed);
            println!("last set to {}", parsed);
        }
        return Ok(false);
    }
    if let Some(arg) = trimmed.strip_prefix("/accept") {
        let selection = meter_reader::parse_selection(arg)?;
        let reading = state.session.accept(selection)?;
        state.session.confirm(reading.clone())?;
        println!("{}", serde_json::to_string_pretty(&reading)?);
        return Ok(state.session.state() == ScanState::Confirmed);
    }

    let path = trimmed.strip_prefix("/capture").unwrap_or(trimmed).trim();
    if path.is_empty() {
        return Err(anyhow!("usage: /capture <path>"));
    }
    let capture = meter_reader::read_capture(Path::new(path))?;
    let profile = state.config.profile()?;
    let last = state.config.last_reading();
    let outcome = state
        .session
        .capture(&state.reader, capture, profile.clone(), last.as_ref())
        .await?;
    if outcome == ApplyOutcome::Applied {
        if let Some(result) = state.session.result() {
            println!("{}", meter_reader::render_report(result, &profile));
        }
    }
    Ok(false)
}

fn print_interactive_help() {
    println!("Commands:");
    println!("  <path>, /capture <path>      Recognize a photo");
    println!("  /accept best|alt:N|<digits>  Accept a reading and finish");
    println!("  /retry                       Discard the result and capture again");
    println!("  /dismiss                     Leave without a reading");
    println!("  /last <value|clear>          Set last known reading (or show current)");
    println!("  /state                       Show session state");
    println!("  /quit, /exit                 Exit interactive mode");
}
