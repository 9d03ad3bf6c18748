use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use shared::domain::{AgentId, KnowledgeBaseId, Specialist};
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "diligence.toml";

/// Agent ids of the deployed diligence workflow. Only the coordinator is
/// called directly; it fans out to the specialists on the service side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentDirectory {
    pub coordinator: AgentId,
    pub liquidity: AgentId,
    pub operational: AgentId,
    pub sustainability: AgentId,
    pub auditor: AgentId,
}

impl Default for AgentDirectory {
    fn default() -> Self {
        Self {
            coordinator: AgentId::new("6970d8d41d92f5e2dd22a74a"),
            liquidity: AgentId::new("6970d83dd6d0dcaec1118066"),
            operational: AgentId::new("6970d8581d92f5e2dd22a72a"),
            sustainability: AgentId::new("6970d8781d92f5e2dd22a732"),
            auditor: AgentId::new("6970d8ae1d92f5e2dd22a73f"),
        }
    }
}

impl AgentDirectory {
    pub fn specialist(&self, specialist: Specialist) -> &AgentId {
        match specialist {
            Specialist::Liquidity => &self.liquidity,
            Specialist::Operational => &self.operational,
            Specialist::Sustainability => &self.sustainability,
            Specialist::Audit => &self.auditor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub service_url: String,
    pub knowledge_base_id: KnowledgeBaseId,
    pub agents: AgentDirectory,
    pub stage_interval_ms: u64,
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: "http://127.0.0.1:8787".into(),
            knowledge_base_id: KnowledgeBaseId::new("6970d82b42263af0ef9d3b9a"),
            agents: AgentDirectory::default(),
            stage_interval_ms: 800,
            request_timeout_secs: None,
        }
    }
}

impl Settings {
    pub fn stage_interval(&self) -> Duration {
        Duration::from_millis(self.stage_interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> anyhow::Result<Url> {
        let url = Url::parse(self.service_url.trim())
            .with_context(|| format!("invalid service url '{}'", self.service_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("service url must start with http:// or https://");
        }
        if self.agents.coordinator.is_blank() {
            bail!("coordinator agent id must not be empty");
        }
        if self.knowledge_base_id.is_blank() {
            bail!("knowledge base id must not be empty");
        }
        Ok(url)
    }
}

/// Defaults, then the TOML file, then environment overrides.
///
/// An explicitly named file must exist; the default `diligence.toml` is
/// optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    let mut settings = match fs::read_to_string(&path) {
        Ok(raw) => parse_settings(&raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?,
        Err(err) if !required && err.kind() == std::io::ErrorKind::NotFound => Settings::default(),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()))
        }
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

pub fn parse_settings(raw: &str) -> anyhow::Result<Settings> {
    Ok(toml::from_str::<Settings>(raw)?)
}

pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("DILIGENCE_SERVICE_URL") {
        settings.service_url = v;
    }
    if let Some(v) = lookup("APP__SERVICE_URL") {
        settings.service_url = v;
    }

    if let Some(v) = lookup("DILIGENCE_KNOWLEDGE_BASE_ID") {
        settings.knowledge_base_id = KnowledgeBaseId::new(v);
    }
    if let Some(v) = lookup("APP__KNOWLEDGE_BASE_ID") {
        settings.knowledge_base_id = KnowledgeBaseId::new(v);
    }

    if let Some(v) = lookup("DILIGENCE_COORDINATOR_AGENT_ID") {
        settings.agents.coordinator = AgentId::new(v);
    }

    if let Some(v) = lookup("APP__STAGE_INTERVAL_MS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.stage_interval_ms = parsed,
            Err(err) => tracing::warn!("ignoring APP__STAGE_INTERVAL_MS={v}: {err}"),
        }
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(0) => settings.request_timeout_secs = None,
            Ok(parsed) => settings.request_timeout_secs = Some(parsed),
            Err(err) => tracing::warn!("ignoring APP__REQUEST_TIMEOUT_SECS={v}: {err}"),
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
