/// Entry point and game loop.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;

use config::GameConfig;
use domain::scenario::Scenario;
use sim::engine::Engine;
use sim::save::{self, FileStore, KeyValueStore};
use sim::stage::Stage;
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::sound::{self as sfx, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const LOG_FILE: &str = "kamishibai.log";
const LOG_ENV: &str = "KAMISHIBAI_LOG";

fn main() {
    let config = GameConfig::load();
    init_tracing(&config);
    for warning in &config.warnings {
        tracing::warn!("config: {warning}");
    }

    let scenario = match Scenario::load(&config.scenario_path) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            eprintln!("kamishibai: {e}");
            return;
        }
    };
    tracing::info!(
        path = %config.scenario_path.display(),
        blocks = scenario.block_count(),
        "scenario loaded"
    );
    for p in &config.cast.protagonists {
        if !scenario.has_protagonist(p) {
            tracing::warn!(protagonist = %p, "protagonist missing from scenario");
        }
    }

    let store = FileStore::open_default();
    tracing::debug!(path = %store.path().display(), "clear flags opened");

    let engine = Engine::new(scenario, config.cast.clone(), config.endings.clone(), store);
    let mut stage = Stage::new(engine, Duration::from_millis(config.speed.type_interval_ms));

    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = game_loop(&mut stage, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        tracing::error!(error = %e, "game loop failed");
        eprintln!("Game error: {e}");
    }

    tracing::info!("exit");
}

/// Log to a file next to the clear flags; the terminal is busy with the
/// alternate screen. `KAMISHIBAI_LOG` overrides the configured level.
fn init_tracing(config: &GameConfig) {
    let path = save::save_dir().join(LOG_FILE);
    let file = match File::create(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: could not open log file {}: {e}", path.display());
            return;
        }
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
}

fn game_loop<S: KeyValueStore>(
    stage: &mut Stage<S>,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.speed.tick_rate_ms);

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }

        let now = Instant::now();
        let mut quit = false;
        for action in kb.actions().into_iter().chain(gp.actions().iter().copied()) {
            let outcome = stage.handle(action, now);
            if let (Some(s), Some(cue)) = (sound, sfx::pick_cue(&outcome.events)) {
                s.play_cue(cue);
            }
            if outcome.quit {
                quit = true;
                break;
            }
        }
        if quit {
            break;
        }

        if last_tick.elapsed() >= tick_rate {
            let revealed = stage.tick(Instant::now());
            if let Some(s) = sound {
                s.play_type_blip(revealed);
            }
            last_tick = Instant::now();
        }

        renderer.render(stage)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}
