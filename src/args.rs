use crate::game_automation::MAX_SEARCH_RADIUS;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    /// Run a bot (the default)
    Run,
    /// Print the bot registry and exit
    List,
    /// Print the effective configuration and exit
    PrintConfig,
    /// Report where one template is found in every replayed frame
    Probe { template: String, radius: u32 },
    /// Child process drawing ROI overlays
    Visualize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub mode: Mode,
    pub bot: Option<String>,
    pub config: Option<PathBuf>,
    pub frames: Option<PathBuf>,
    pub debug_mode: bool,
    pub timeout_secs: Option<u64>,
}

/// Result of parsing that is not a run: help, version or a bad flag
#[derive(Debug, Clone, PartialEq)]
pub enum Exit {
    Help,
    Version,
    Invalid(String),
}

impl Args {
    /// Parse the process arguments. Prints help, version or the error and
    /// returns `None` when there is nothing to run.
    pub fn parse() -> Option<Self> {
        match Self::parse_from(env::args().skip(1)) {
            Ok(args) => Some(args),
            Err(Exit::Help) => {
                print_help();
                None
            }
            Err(Exit::Version) => {
                println!(
                    "Game Bot Run v{} (built {})",
                    env!("BOT_VERSION_DISPLAY"),
                    env!("BOT_BUILD_YEAR")
                );
                None
            }
            Err(Exit::Invalid(message)) => {
                eprintln!("❌ {message}");
                print_help();
                None
            }
        }
    }

    pub fn parse_from<I, S>(args: I) -> Result<Self, Exit>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = false;
        let mut print_config = false;
        let mut visualize = false;
        let mut probe: Option<String> = None;
        let mut radius: u32 = 0;
        let mut bot = None;
        let mut config = None;
        let mut frames = None;
        let mut debug_mode = false;
        let mut timeout_secs = None;

        for arg in args {
            let arg = arg.as_ref();
            if arg == "--help" || arg == "-h" {
                return Err(Exit::Help);
            } else if arg == "--version" || arg == "-v" {
                return Err(Exit::Version);
            } else if arg == "--debug" {
                debug_mode = true;
            } else if arg == "--list" {
                list = true;
            } else if arg == "--print-config" {
                print_config = true;
            } else if arg == "--visualize" {
                visualize = true;
            } else if let Some(val) = arg.strip_prefix("--bot=") {
                bot = Some(non_empty("--bot", val)?);
            } else if let Some(val) = arg.strip_prefix("--config=") {
                config = Some(PathBuf::from(non_empty("--config", val)?));
            } else if let Some(val) = arg.strip_prefix("--frames=") {
                frames = Some(PathBuf::from(non_empty("--frames", val)?));
            } else if let Some(val) = arg.strip_prefix("--probe=") {
                probe = Some(non_empty("--probe", val)?);
            } else if let Some(val) = arg.strip_prefix("--radius=") {
                radius = val
                    .parse::<u32>()
                    .ok()
                    .filter(|r| *r <= MAX_SEARCH_RADIUS)
                    .ok_or_else(|| {
                        Exit::Invalid(format!(
                            "Invalid radius value: {val} (0 to {MAX_SEARCH_RADIUS})"
                        ))
                    })?;
            } else if let Some(val) = arg.strip_prefix("--timeout=") {
                let secs = val
                    .parse::<u64>()
                    .map_err(|_| Exit::Invalid(format!("Invalid timeout value: {val}")))?;
                timeout_secs = Some(secs);
            } else {
                return Err(Exit::Invalid(format!("Unknown argument: {arg}")));
            }
        }

        let mode = match (list, print_config, probe, visualize) {
            (false, false, None, false) => Mode::Run,
            (true, false, None, false) => Mode::List,
            (false, true, None, false) => Mode::PrintConfig,
            (false, false, Some(template), false) => Mode::Probe { template, radius },
            (false, false, None, true) => Mode::Visualize,
            _ => {
                return Err(Exit::Invalid(
                    "--list, --print-config, --probe and --visualize are exclusive".to_string(),
                ));
            }
        };

        Ok(Args {
            mode,
            bot,
            config,
            frames,
            debug_mode,
            timeout_secs,
        })
    }

    /// Flags a visualizer child needs to see the same screen as this process
    pub fn forwarded(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(bot) = &self.bot {
            out.push(format!("--bot={bot}"));
        }
        if let Some(config) = &self.config {
            out.push(format!("--config={}", config.display()));
        }
        if let Some(frames) = &self.frames {
            out.push(format!("--frames={}", frames.display()));
        }
        out
    }
}

fn non_empty(flag: &str, value: &str) -> Result<String, Exit> {
    if value.is_empty() {
        Err(Exit::Invalid(format!("{flag} needs a value")))
    } else {
        Ok(value.to_string())
    }
}

fn print_help() {
    println!("🤖 Game Bot Run - screen-driven game automation");
    println!();
    println!("USAGE:");
    println!("    game-bot-run [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    (no flags)          Pick a bot from the menu and run it");
    println!("    --bot=NAME          Run the named bot without showing the menu");
    println!("    --config=FILE       Load settings from a TOML file (default: bot defaults)");
    println!("    --frames=DIR        Replay screenshots from DIR as the screen");
    println!("    --debug             Log every match attempt with its confidence");
    println!("    --timeout=N         Auto-stop after N seconds");
    println!("    --list              List available bots");
    println!("    --print-config      Print the effective configuration as TOML");
    println!("    --probe=TEMPLATE    Report where TEMPLATE is found in every frame");
    println!("    --radius=N          Search radius used by --probe (default: 0)");
    println!("    --visualize         Write roi-overlay.png with every ROI outlined");
    println!("    --help, -h          Show this help message");
    println!("    --version, -v       Show version information");
    println!();
    println!("HOTKEYS (type the key, then Enter):");
    println!("    7  Pause/Resume    8  Exit    9  ROI Visualizer    0  Return to Menu");
    println!();
    println!("EXAMPLES:");
    println!("    game-bot-run --bot=fishing --frames=screenshots");
    println!("    game-bot-run --bot=fishing --print-config > fishing.toml");
    println!("    game-bot-run --frames=screenshots --probe=exclamation --radius=5 --debug");
}
