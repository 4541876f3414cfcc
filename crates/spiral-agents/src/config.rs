use anyhow::{Context, Result};
use coordination::{
    FileStore, GenerationEndpoint, HttpGenerator, InMemoryStore, Lexicon, OfflineGenerator,
    Orchestrator, OrchestratorConfig, SharedGenerator, SharedSessionStore,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "spiral.toml";

/// Top-level configuration for the binary.
///
/// ```toml
/// store_dir = "./sessions"
/// lexicon = "./lexicon.toml"
///
/// [orchestrator]
/// turn_ceiling = 6
/// rng_seed = 42
///
/// [generation]
/// url = "http://localhost:8000/v1/chat/completions"
/// model = "local-model"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpiralConfig {
    pub orchestrator: OrchestratorConfig,
    pub generation: GenerationEndpoint,
    /// Directory for the file store; `None` keeps sessions in memory.
    pub store_dir: Option<PathBuf>,
    /// Lexicon override file layered over the built-in tables.
    pub lexicon: Option<PathBuf>,
    /// Skip the HTTP backend; every responder uses canned text.
    pub offline: bool,
}

/// Flags that win over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub store_dir: Option<PathBuf>,
    pub seed: Option<u64>,
    pub offline: bool,
}

impl SpiralConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] if it exists, or
    /// fall back to env-driven defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            }
        };

        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).context("Failed to parse config TOML")?;
        config.orchestrator.validate()?;
        Ok(config)
    }

    pub fn apply(mut self, overrides: Overrides) -> Self {
        if overrides.store_dir.is_some() {
            self.store_dir = overrides.store_dir;
        }
        if overrides.seed.is_some() {
            self.orchestrator.rng_seed = overrides.seed;
        }
        self.offline |= overrides.offline;
        self
    }

    pub fn load_lexicon(&self) -> Result<Lexicon> {
        match &self.lexicon {
            Some(path) => Lexicon::load(path)
                .with_context(|| format!("Failed to load lexicon {}", path.display())),
            None => Ok(Lexicon::builtin()),
        }
    }

    pub fn generator(&self) -> Result<SharedGenerator> {
        if self.offline {
            return Ok(Arc::new(OfflineGenerator));
        }
        let generator =
            HttpGenerator::with_timeout(self.generation.clone(), self.orchestrator.generation_timeout())
                .context("Failed to build generation client")?;
        Ok(Arc::new(generator))
    }

    pub async fn store(&self) -> Result<SharedSessionStore> {
        match &self.store_dir {
            Some(dir) => {
                let store = FileStore::open(dir)
                    .await
                    .with_context(|| format!("Failed to open session store {}", dir.display()))?;
                Ok(Arc::new(store))
            }
            None => Ok(Arc::new(InMemoryStore::new())),
        }
    }

    pub async fn build_orchestrator(&self) -> Result<Orchestrator> {
        let lexicon = self.load_lexicon()?.shared();
        let generator = self.generator()?;
        let store = self.store().await?;

        info!(
            offline = self.offline,
            generation = %self.generation.url,
            model = %self.generation.model,
            store = %self
                .store_dir
                .as_deref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "memory".into()),
            turn_ceiling = self.orchestrator.turn_ceiling,
            "Orchestrator configured"
        );
        Ok(Orchestrator::new(
            self.orchestrator.clone(),
            lexicon,
            generator,
            store,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_parse_and_keep_defaults() {
        let config = SpiralConfig::from_toml_str(
            r#"
            store_dir = "/tmp/spiral"

            [orchestrator]
            turn_ceiling = 4

            [generation]
            model = "tiny"
            "#,
        )
        .unwrap();
        assert_eq!(config.orchestrator.turn_ceiling, 4);
        assert_eq!(config.generation.model, "tiny");
        assert_eq!(config.store_dir, Some(PathBuf::from("/tmp/spiral")));
        assert!(!config.offline);
    }

    #[test]
    fn test_invalid_orchestrator_section_rejected() {
        assert!(SpiralConfig::from_toml_str("[orchestrator]\nturn_ceiling = 0").is_err());
    }

    #[test]
    fn test_overrides_win() {
        let config = SpiralConfig::default().apply(Overrides {
            store_dir: Some(PathBuf::from("sessions")),
            seed: Some(9),
            offline: true,
        });
        assert_eq!(config.orchestrator.rng_seed, Some(9));
        assert_eq!(config.store_dir, Some(PathBuf::from("sessions")));
        assert!(config.offline);
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SpiralConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[tokio::test]
    async fn test_file_store_from_store_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = SpiralConfig {
            store_dir: Some(dir.path().join("sessions")),
            offline: true,
            ..SpiralConfig::default()
        };
        let orchestrator = config.build_orchestrator().await.unwrap();
        let (id, _) = orchestrator.start_session("my rent is due").await.unwrap();
        assert!(dir.path().join("sessions").join(format!("{id}.json")).exists());
    }
}
