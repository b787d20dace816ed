// Console hotkeys: single-key lines typed into the terminal running the bot.
// The listener only flips ControlFlags; the control loop picks them up on its
// next iteration. Any other line is forwarded to whoever drives the menu.
use crate::bots::{self, BotDescriptor};
use crate::game_automation::{BotError, BotResult, ControlFlags};
use std::io::IsTerminal;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// How long an unattended run waits before starting on its own
pub const UNATTENDED_GRACE: Duration = Duration::from_secs(3);

const STOP_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hotkey {
    TogglePause,
    Stop,
    ToggleVisualizer,
    ReturnToMenu,
}

impl Hotkey {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "7" => Some(Hotkey::TogglePause),
            "8" => Some(Hotkey::Stop),
            "9" => Some(Hotkey::ToggleVisualizer),
            "0" => Some(Hotkey::ReturnToMenu),
            _ => None,
        }
    }

    pub fn apply(self, flags: &ControlFlags) {
        match self {
            Hotkey::TogglePause => {
                let status = if flags.toggle_pause() { "PAUSED" } else { "RUNNING" };
                log::info!("⌨️ Bot {status}");
            }
            Hotkey::Stop => {
                log::info!("⌨️ Stopping the bot...");
                flags.request_stop();
            }
            Hotkey::ToggleVisualizer => {
                if flags.toggle_visualizer() {
                    log::info!("⌨️ Opening the ROI visualizer");
                } else {
                    log::info!("⌨️ Closing the ROI visualizer");
                }
            }
            Hotkey::ReturnToMenu => {
                log::info!("⌨️ Returning to main menu...");
                flags.request_menu();
            }
        }
    }
}

pub fn usage() -> &'static str {
    "'7' + Enter (Pause/Resume), '8' (Exit), '9' (ROI Visualizer), '0' (Return to Menu)"
}

/// Console lines that were not hotkeys
pub type LineReceiver = mpsc::UnboundedReceiver<String>;

/// Start listening on stdin. Fails when stdin is not an interactive
/// terminal; the caller decides whether to continue unattended.
pub fn spawn(flags: ControlFlags) -> BotResult<(JoinHandle<()>, LineReceiver)> {
    if !std::io::stdin().is_terminal() {
        return Err(BotError::Hotkeys {
            description: "stdin is not a terminal".to_string(),
        });
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(hotkey) = Hotkey::parse(&line) {
                        hotkey.apply(&flags);
                    } else if tx.send(line).is_err() {
                        log::debug!("⌨️ Nobody is reading console input");
                    }
                }
                Ok(None) => {
                    log::debug!("⌨️ Console closed");
                    break;
                }
                Err(e) => {
                    log::warn!("⚠️ Console read failed: {e}");
                    break;
                }
            }
        }
    });

    log::info!("✅ Hotkeys registered: {}", usage());
    Ok((handle, rx))
}

/// Stop on Ctrl+C the same way the '8' hotkey does. A second Ctrl+C
/// exits without waiting for the bot.
pub fn spawn_ctrl_c(flags: ControlFlags) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::warn!("⚠️ Unable to listen for Ctrl+C: {e}");
                break;
            }
            if flags.stop_requested() {
                log::warn!("🛑 Ctrl+C again, exiting now");
                std::process::exit(130);
            }
            log::info!("🛑 Ctrl+C received, stopping (press again to force)");
            flags.request_stop();
        }
    })
}

/// Resolves once a stop has been requested
pub async fn stopped(flags: &ControlFlags) {
    while !flags.stop_requested() {
        tokio::time::sleep(STOP_POLL).await;
    }
}

/// Ask on the console which bot to run. `None` when a stop arrives first.
pub async fn choose_bot(
    lines: &mut LineReceiver,
    flags: &ControlFlags,
) -> BotResult<Option<&'static BotDescriptor>> {
    // Anything typed while the previous bot ran is not an answer
    while lines.try_recv().is_ok() {}

    print!("{}", bots::menu_text());
    println!("Select a bot (number or name):");
    loop {
        let answer = tokio::select! {
            answer = lines.recv() => answer,
            () = stopped(flags) => return Ok(None),
        };
        let Some(answer) = answer else {
            return Err(BotError::config("console closed before a bot was chosen"));
        };
        if answer.trim().is_empty() {
            continue;
        }
        match bots::select_bot(&answer) {
            Ok(descriptor) => return Ok(Some(descriptor)),
            Err(e) => println!("❌ {e}"),
        }
    }
}
