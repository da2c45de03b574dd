/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
///
/// Loading happens before logging is up, so problems are collected in
/// `GameConfig::warnings` and logged by `main` once the subscriber exists.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::cast::Cast;
use crate::sim::engine::EndingCards;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub speed: SpeedConfig,
    pub cast: Cast,
    pub scenario_path: PathBuf,
    pub endings: EndingCards,
    pub gamepad: GamepadConfig,
    pub log_level: String,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct SpeedConfig {
    pub tick_rate_ms: u64,
    pub type_interval_ms: u64,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub confirm: Vec<String>,
    pub back: Vec<String>,
    pub menu: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    story: TomlStory,
    #[serde(default)]
    endings: TomlEndings,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_type_interval")]
    type_interval_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlStory {
    #[serde(default = "default_scenario")]
    scenario: String,
    #[serde(default = "default_entry_block")]
    entry_block: String,
    #[serde(default = "default_hidden_protagonist")]
    hidden_protagonist: String,
    #[serde(default = "default_hidden_entry_block")]
    hidden_entry_block: String,
    #[serde(default = "default_protagonists")]
    protagonists: Vec<String>,
}

/// Ending cards fall back field by field to the built-in English set.
#[derive(Deserialize, Debug, Default)]
struct TomlEndings {
    true_title: Option<String>,
    normal_title: Option<String>,
    bad_title: Option<String>,
    hidden_title: Option<String>,
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_back")]
    back: Vec<String>,
    #[serde(default = "default_menu")]
    menu: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_log_level")]
    log_level: String,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }
fn default_type_interval() -> u64 { 30 }

fn default_scenario() -> String { "scenario.json".into() }
fn default_entry_block() -> String { Cast::default().entry_block }
fn default_hidden_protagonist() -> String { Cast::default().hidden_protagonist }
fn default_hidden_entry_block() -> String { Cast::default().hidden_entry_block }
fn default_protagonists() -> Vec<String> { Cast::default().protagonists }

fn default_confirm() -> Vec<String> { vec!["A".into(), "Start".into()] }
fn default_back() -> Vec<String> { vec!["B".into()] }
fn default_menu() -> Vec<String> { vec!["Select".into(), "Y".into()] }
fn default_log_level() -> String { "info".into() }

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed {
            tick_rate_ms: default_tick_rate(),
            type_interval_ms: default_type_interval(),
        }
    }
}

impl Default for TomlStory {
    fn default() -> Self {
        TomlStory {
            scenario: default_scenario(),
            entry_block: default_entry_block(),
            hidden_protagonist: default_hidden_protagonist(),
            hidden_entry_block: default_hidden_entry_block(),
            protagonists: default_protagonists(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            confirm: default_confirm(),
            back: default_back(),
            menu: default_menu(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            log_level: default_log_level(),
        }
    }
}

impl TomlEndings {
    fn into_cards(self) -> EndingCards {
        let d = EndingCards::default();
        EndingCards {
            true_title: self.true_title.unwrap_or(d.true_title),
            normal_title: self.normal_title.unwrap_or(d.normal_title),
            bad_title: self.bad_title.unwrap_or(d.bad_title),
            hidden_title: self.hidden_title.unwrap_or(d.hidden_title),
            text: self.text.unwrap_or(d.text),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) XDG data home, (4) /usr/share/kamishibai.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let mut warnings = Vec::new();
        let toml_cfg = load_toml(&search_dirs, &mut warnings);
        Self::from_toml(toml_cfg, &search_dirs, warnings)
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf], warnings: Vec<String>) -> Self {
        let story = toml_cfg.story;
        let scenario_path = resolve_data_file(&story.scenario, search_dirs);

        GameConfig {
            speed: SpeedConfig {
                tick_rate_ms: toml_cfg.speed.tick_rate_ms.max(1),
                type_interval_ms: toml_cfg.speed.type_interval_ms.max(1),
            },
            cast: Cast {
                protagonists: story.protagonists,
                entry_block: story.entry_block,
                hidden_protagonist: story.hidden_protagonist,
                hidden_entry_block: story.hidden_entry_block,
            },
            scenario_path,
            endings: toml_cfg.endings.into_cards(),
            gamepad: GamepadConfig {
                confirm: toml_cfg.gamepad.confirm,
                back: toml_cfg.gamepad.back,
                menu: toml_cfg.gamepad.menu,
            },
            log_level: toml_cfg.general.log_level,
            warnings,
        }
    }
}

/// An absolute path is taken as is; a relative one is looked up in each
/// candidate directory, defaulting to the CWD-relative path.
fn resolve_data_file(name: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let path = Path::new(name);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    search_dirs
        .iter()
        .map(|d| d.join(name))
        .find(|p| p.is_file())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks so a linked binary still finds its data.
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/kamishibai)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/kamishibai");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory
    let sys = PathBuf::from("/usr/share/kamishibai");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    // 5. Fallback
    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        warnings.push(format!("{}: parse error, using defaults: {e}", path.display()));
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warnings.push(format!("could not read {}: {e}", path.display()));
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> GameConfig {
        let cfg: TomlConfig = toml::from_str(text).unwrap();
        GameConfig::from_toml(cfg, &[], Vec::new())
    }

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = parse("");
        assert_eq!(cfg.speed.tick_rate_ms, 16);
        assert_eq!(cfg.speed.type_interval_ms, 30);
        assert_eq!(cfg.cast, Cast::default());
        assert_eq!(cfg.scenario_path, PathBuf::from("scenario.json"));
        assert_eq!(cfg.endings, EndingCards::default());
        assert_eq!(cfg.gamepad.confirm, vec!["A", "Start"]);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = parse(
            r#"
            [story]
            protagonists = ["A", "B", "C"]

            [endings]
            true_title = "トゥルーエンド"

            [speed]
            type_interval_ms = 0
            "#,
        );
        assert_eq!(cfg.cast.protagonists, vec!["A", "B", "C"]);
        assert_eq!(cfg.cast.entry_block, "act1");
        assert_eq!(cfg.endings.true_title, "トゥルーエンド");
        assert_eq!(cfg.endings.bad_title, "BAD END");
        assert_eq!(cfg.speed.type_interval_ms, 1);
        assert_eq!(cfg.speed.tick_rate_ms, 16);
    }

    #[test]
    fn scenario_found_in_search_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("story.json"), "{}").unwrap();
        let dirs = vec![PathBuf::from("/nonexistent"), dir.path().to_path_buf()];
        assert_eq!(resolve_data_file("story.json", &dirs), dir.path().join("story.json"));
        assert_eq!(resolve_data_file("missing.json", &dirs), PathBuf::from("missing.json"));
    }

    #[test]
    fn broken_config_falls_back_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[speed\nnope").unwrap();
        let mut warnings = Vec::new();
        let cfg = load_toml(&[dir.path().to_path_buf()], &mut warnings);
        assert_eq!(cfg.speed.tick_rate_ms, 16);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn bundled_config_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml");
        let cfg = parse(&std::fs::read_to_string(path).unwrap());
        assert_eq!(cfg.cast, Cast::default());
        assert_eq!(cfg.endings, EndingCards::default());
        assert_eq!(cfg.gamepad.menu, vec!["Select", "Y"]);
    }
}
