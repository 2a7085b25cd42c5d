//! Beat Blocks — terminal player for beat block charts.
//!
//! `play` runs a chart against the default audio device with keyboard input,
//! `schedule` prints a chart's timing table, `calibrate` measures input
//! latency and stores it as the offset in the settings file.

use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal;

use beatblocks::audio::{AudioClock, AudioEngine, CueSink};
use beatblocks::calibration::Calibration;
use beatblocks::chart::SongFile;
use beatblocks::config::{default_config_path, AppConfig};
use beatblocks::input::{Action, KeyMap};
use beatblocks::judge::DotRef;
use beatblocks::playback::{FrameStatus, Judgement, RenderTarget, Session};
use beatblocks::timing::{Conductor, TimingTableBuilder};

/// Input poll timeout, roughly one display frame.
const FRAME: Duration = Duration::from_millis(16);

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "beatblocks", version, about = "Rhythm game timing engine")]
struct Cli {
    /// Config file (defaults to ~/.beatblocks/config.yaml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play a chart with keyboard input.
    Play {
        /// Chart JSON file. Plays the default chart when omitted.
        chart: Option<PathBuf>,
        /// Block to start from. Defaults to the chart's startPos.
        #[arg(long)]
        start: Option<usize>,
        /// Judge every pip automatically.
        #[arg(long)]
        listen: bool,
    },
    /// Print the timing table of a chart.
    Schedule {
        chart: Option<PathBuf>,
        /// Override the chart's tempo.
        #[arg(long)]
        bpm: Option<f64>,
    },
    /// Measure input latency and save it as the offset.
    Calibrate,
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_config_path);

    let result = match cli.command {
        Command::Play {
            chart,
            start,
            listen,
        } => play(&config_path, chart.as_deref(), start, listen),
        Command::Schedule { chart, bpm } => schedule(chart.as_deref(), bpm),
        Command::Calibrate => calibrate(&config_path),
    };

    if let Err(e) = result {
        eprintln!("beatblocks: {e}");
        std::process::exit(1);
    }
}

/// Log lines end in `\r\n` so they stay readable in raw mode.
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}\r",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

fn load_song(path: Option<&Path>) -> Result<SongFile, Box<dyn Error>> {
    match path {
        Some(path) => Ok(SongFile::load(path)?),
        None => Ok(SongFile::default()),
    }
}

/// Puts the terminal in raw mode until dropped.
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Install a Ctrl-C handler that raises the returned flag.
fn quit_flag() -> Result<Arc<AtomicBool>, Box<dyn Error>> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))?;
    Ok(flag)
}

/// Prints playback events as terminal lines.
struct TerminalView {
    show_offset: bool,
    block: Option<usize>,
}

impl TerminalView {
    fn line(&self, text: &str) {
        print!("{text}\r\n");
        let _ = io::stdout().flush();
    }
}

impl RenderTarget for TerminalView {
    fn activate_pip(&mut self, _dot: DotRef) {}

    fn apply_face(&mut self, block: usize, value: u8) {
        if self.block != Some(block) {
            self.block = Some(block);
            self.line(&format!("  block {block:>3} [{}]", "o".repeat(value as usize)));
        }
    }

    fn flash_pip(&mut self, dot: DotRef) {
        self.line(&format!("  ~ silent pip {} of block {}", dot.pip, dot.block));
    }

    fn show_judgement(&mut self, judgement: Judgement) {
        if self.show_offset {
            self.line(&format!("  {:+} ms", judgement.delta_ms()));
        } else {
            self.line(&format!("  {}", judgement.tier.label()));
        }
    }

    fn beat_missed(&mut self, dot: DotRef) {
        self.line(&format!("  missed block {}", dot.block));
    }

    fn tempo_changed(&mut self, bpm: f64) {
        self.line(&format!("  tempo {bpm} bpm"));
    }
}

fn play(
    config_path: &Path,
    chart: Option<&Path>,
    start: Option<usize>,
    listen: bool,
) -> CliResult {
    let config = AppConfig::load_or_default(config_path);
    let song = load_song(chart)?;
    let title = song.title.clone();
    let start = song.playback_start(start);

    let engine = AudioEngine::new()?;
    let clock: Arc<dyn AudioClock> = Arc::new(engine.clock());
    let sink: Arc<dyn CueSink> = Arc::new(engine.sink());

    let keys = KeyMap::new(&config.settings.keybinds);
    let mut view = TerminalView {
        show_offset: config.settings.show_offset,
        block: None,
    };
    let mut session = Session::from_song(
        song,
        config.engine.clone(),
        config.settings.clone(),
        Arc::clone(&clock),
        sink,
    )?;
    if listen {
        session.set_listening(true);
    }

    let quit = quit_flag()?;
    let _raw = RawMode::enable()?;
    view.line(&format!(
        "{title}: {} keys hit, enter restarts, r stops, l toggles listen, q quits",
        config.settings.keybinds.join("/")
    ));
    session.start(start)?;
    let mut announced = false;

    while !quit.load(Ordering::SeqCst) {
        if event::poll(FRAME)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match keys.map(key) {
                        Some(Action::Hit) => session.judge_hit(clock.now())?,
                        Some(Action::Start) => {
                            view.block = None;
                            announced = false;
                            session.start(start)?;
                        }
                        Some(Action::Reset) => {
                            session.reset();
                            view.line("stopped");
                        }
                        Some(Action::ToggleListen) => {
                            let listening = !session.is_listening();
                            session.set_listening(listening);
                            view.line(if listening { "listening" } else { "playing" });
                        }
                        Some(Action::Quit) => break,
                        None => {}
                    }
                }
            }
        }

        if session.frame(&mut view) == FrameStatus::Finished && !announced {
            announced = true;
            view.line("finished: enter to replay, q to quit");
        }
    }

    session.reset();
    Ok(())
}

fn schedule(chart: Option<&Path>, bpm: Option<f64>) -> CliResult {
    let mut song = load_song(chart)?;
    let conductor = Conductor::new(bpm.unwrap_or(song.bpm))?;
    song.chart.normalise();
    let table = TimingTableBuilder::new(conductor.beat_duration()).build(&song.chart, 0.0);

    println!(
        "{}: {} bpm, {} subdivisions, {} input beats",
        song.title,
        conductor.bpm(),
        table.len(),
        table.actual_beats().len()
    );
    println!("{:>5} {:>9} {:>5} {:>3} {:>3} {:>4}", "idx", "time", "block", "pip", "vol", "auto");
    for (index, entry) in table.entries().iter().enumerate() {
        println!(
            "{:>5} {:>9.4} {:>5} {:>3} {:>3} {:>4}",
            index,
            entry.timestamp,
            entry.block,
            entry.pip,
            entry.volume,
            if entry.is_auto { "yes" } else { "" }
        );
    }
    Ok(())
}

fn calibrate(config_path: &Path) -> CliResult {
    let mut config = AppConfig::load_or_default(config_path);
    let engine = AudioEngine::new()?;
    let clock = engine.clock();
    let sink = engine.sink();
    let mut calibration = Calibration::new(config.settings.offset_ms);
    let controls = KeyMap::new::<&str>(&[]);

    let quit = quit_flag()?;
    let _raw = RawMode::enable()?;
    print!("Press any key on the 3rd beat of each sequence (q to cancel)\r\n");

    let mut next_start = clock.now() + 1.0;
    while let Some(sequence) = calibration.begin_sequence(next_start) {
        print!("sequence {}\r\n", sequence.number);
        for cue in sequence.cues() {
            sink.play(cue);
        }
        while clock.now() < sequence.end() {
            if quit.load(Ordering::SeqCst) {
                return Ok(());
            }
            if !event::poll(FRAME)? {
                continue;
            }
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if controls.map(key) == Some(Action::Quit) {
                print!("cancelled\r\n");
                return Ok(());
            }
            if let Some(deviation) = calibration.tap(clock.now()) {
                print!("  {:+.0} ms\r\n", deviation * 1000.0);
            }
        }
        next_start = sequence.end();
    }

    match calibration.finish() {
        Some(result) => {
            config.settings.offset_ms = result.new_offset_ms;
            config.save(config_path)?;
            print!(
                "offset now {} ms (average deviation {:+} ms)\r\n",
                result.new_offset_ms, result.average_ms
            );
        }
        None => print!("no taps recorded, offset unchanged\r\n"),
    }
    Ok(())
}
