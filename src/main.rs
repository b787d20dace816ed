use game_bot_run::args::{Args, Mode};
use game_bot_run::bots::{self, BotDescriptor};
use game_bot_run::config::BotConfig;
use game_bot_run::device::{DryRunActuator, FrameSource, ImageDirSource};
use game_bot_run::game_automation::{
    BotError, BotResult, Clock, ControlFlags, ControlLoop, LoopExit, MatchEngine, SystemClock,
    TemplateLibrary,
};
use game_bot_run::hotkeys::{self, UNATTENDED_GRACE};
use game_bot_run::visualizer::{self, OVERLAY_FILE};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Bot used when none is named and there is nobody to ask
const DEFAULT_BOT: &str = "fishing";

fn main() {
    let Some(args) = Args::parse() else {
        return;
    };
    init_logging(args.debug_mode);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("❌ Failed to start tokio runtime: {e}");
            std::process::exit(1);
        }
    };
    let result = runtime.block_on(run(args));
    // The stdin reader stays blocked until the next line; don't wait for it
    runtime.shutdown_timeout(Duration::from_millis(100));

    if let Err(e) = result {
        log::error!("❌ {e}");
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

async fn run(args: Args) -> BotResult<()> {
    match &args.mode {
        Mode::List => {
            print!("{}", bots::menu_text());
            Ok(())
        }
        Mode::PrintConfig => {
            let config = load_config(&args, named_or_default(&args)?)?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Mode::Probe { template, radius } => probe(&args, template, *radius),
        Mode::Visualize => {
            let config = load_config(&args, named_or_default(&args)?)?;
            let source = open_frames(&args)?;
            visualizer::run(
                source,
                config.screen,
                config.region_table(),
                PathBuf::from(OVERLAY_FILE),
            )
            .await
        }
        Mode::Run => run_bots(&args).await,
    }
}

fn named_or_default(args: &Args) -> BotResult<&'static BotDescriptor> {
    bots::find_bot(args.bot.as_deref().unwrap_or(DEFAULT_BOT))
}

fn load_config(args: &Args, descriptor: &BotDescriptor) -> BotResult<BotConfig> {
    let defaults = (descriptor.default_config)();
    let mut config = match &args.config {
        Some(path) => BotConfig::load(path, defaults)?,
        None => {
            defaults.validate()?;
            defaults
        }
    };
    if args.debug_mode {
        config.debug_mode = true;
    }
    Ok(config)
}

fn open_frames(args: &Args) -> BotResult<Box<dyn FrameSource>> {
    let dir = args.frames.as_ref().ok_or_else(|| {
        BotError::config("no screen source: pass --frames=DIR with screenshots to replay")
    })?;
    Ok(Box::new(ImageDirSource::open(dir)?))
}

fn build_engine(config: &BotConfig) -> MatchEngine {
    let mut library = TemplateLibrary::new();
    let report = library.load(
        &config.assets_path,
        config
            .templates
            .iter()
            .map(|(name, file)| (name.as_str(), file.as_str())),
    );
    println!("{report}");
    if !report.is_complete() {
        log::warn!(
            "⚠️ Missing templates are never found: {}",
            report.missing().join(", ")
        );
    }
    MatchEngine::new(
        library,
        config.region_table(),
        config.match_config(),
        config.screen,
    )
}

/// Run `find` for one template over every replayed frame
fn probe(args: &Args, template: &str, radius: u32) -> BotResult<()> {
    let mut config = load_config(args, named_or_default(args)?)?;
    config.debug_mode = true;
    if !config.templates.contains_key(template) {
        log::info!(
            "🔍 '{template}' is not configured, scanning {}",
            config.assets_path.display()
        );
        config.declare_templates(TemplateLibrary::scan_directory(&config.assets_path)?);
    }
    let engine = build_engine(&config);
    if !engine.library().contains(template) {
        return Err(BotError::config(format!(
            "template '{template}' is not loaded"
        )));
    }

    let Some(dir) = args.frames.as_ref() else {
        return Err(BotError::config("--probe needs --frames=DIR"));
    };
    let mut source = ImageDirSource::open(dir)?;
    let total = source.len();
    let mut found = 0;
    for _ in 0..total {
        let frame = source.capture(&config.screen)?;
        let index = frame.index();
        match engine.locate(&frame, template, radius) {
            Some(hit) => {
                found += 1;
                println!(
                    "🎯 frame {index}: ({}, {}) confidence {:.3}",
                    hit.x, hit.y, hit.confidence
                );
            }
            None => println!("➖ frame {index}: not found"),
        }
    }
    println!("📊 {template}: found in {found}/{total} frames (radius {radius})");
    Ok(())
}

async fn run_bots(args: &Args) -> BotResult<()> {
    let flags = ControlFlags::new();
    let _ctrl_c = hotkeys::spawn_ctrl_c(flags.clone());

    let mut lines = match hotkeys::spawn(flags.clone()) {
        Ok((_listener, lines)) => Some(lines),
        Err(e) => {
            log::warn!(
                "⚠️ {e}. Running unattended, starting in {}s",
                UNATTENDED_GRACE.as_secs()
            );
            None
        }
    };

    let supervisor = match std::env::current_exe() {
        Ok(program) => {
            Some(visualizer::Supervisor::new(flags.clone(), program, args.forwarded()).spawn())
        }
        Err(e) => {
            log::warn!("⚠️ ROI visualizer unavailable: {e}");
            None
        }
    };

    let mut requested = args.bot.clone();
    let result = loop {
        if flags.stop_requested() {
            break Ok(());
        }
        let descriptor = match (requested.take(), lines.as_mut()) {
            (Some(name), _) => bots::find_bot(&name).map(Some),
            (None, Some(lines)) => hotkeys::choose_bot(lines, &flags).await,
            (None, None) => bots::find_bot(DEFAULT_BOT).map(Some),
        };
        let descriptor = match descriptor {
            Ok(Some(descriptor)) => descriptor,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        };

        match run_one(descriptor, args, &flags, lines.is_some()).await {
            Ok(LoopExit::ReturnToMenu) => continue,
            Ok(_) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    if let Some(supervisor) = supervisor {
        supervisor.abort();
    }
    result
}

async fn run_one(
    descriptor: &'static BotDescriptor,
    args: &Args,
    flags: &ControlFlags,
    attended: bool,
) -> BotResult<LoopExit> {
    let config = load_config(args, descriptor)?;
    let engine = build_engine(&config);
    let source = open_frames(args)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let input = Box::new(DryRunActuator::new(Arc::clone(&clock)));
    let settings = config.loop_settings(args.timeout_secs.map(Duration::from_secs));
    let bot = (descriptor.build)(&config);

    flags.reset_for_run(attended);
    if flags.stop_requested() {
        return Ok(LoopExit::Stopped);
    }
    if attended {
        log::info!("⏸️ {} bot is PAUSED. Press '7' + Enter to start", descriptor.name);
    } else {
        tokio::select! {
            () = tokio::time::sleep(UNATTENDED_GRACE) => {}
            () = hotkeys::stopped(flags) => return Ok(LoopExit::Stopped),
        }
    }

    let mut control = ControlLoop::new(bot, engine, source, input, clock, flags.clone(), settings);
    tokio::task::spawn_blocking(move || control.run()).await?
}
