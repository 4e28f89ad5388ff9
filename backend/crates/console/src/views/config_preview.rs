//! Read-only preview of the Prometheus files generated from the loaded
//! collections.

use promeconfig_common::prometheus::render_config;
use promeconfig_common::{AlertRule, RenderOptions, RenderedConfig, Target};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use crate::error::Result;

pub const PROMETHEUS_FILE_NAME: &str = "prometheus.yml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFile {
    #[default]
    Prometheus,
    Alerts,
}

impl ConfigFile {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigFile::Prometheus => "prometheus",
            ConfigFile::Alerts => "alerts",
        }
    }
}

impl fmt::Display for ConfigFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigFile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prometheus" | "prometheus.yml" => Ok(ConfigFile::Prometheus),
            "alerts" | "alerts.yml" | "rules" => Ok(ConfigFile::Alerts),
            other => Err(format!("unknown config file '{other}', expected 'prometheus' or 'alerts'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPreview {
    rule_file: String,
    rendered: RenderedConfig,
    selected: ConfigFile,
}

impl ConfigPreview {
    pub fn render(targets: &[Target], alert_rules: &[AlertRule], options: &RenderOptions) -> Result<Self> {
        Ok(Self {
            rule_file: options.rule_file.clone(),
            rendered: render_config(targets, alert_rules, options)?,
            selected: ConfigFile::default(),
        })
    }

    pub fn select(&mut self, file: ConfigFile) {
        self.selected = file;
    }

    pub fn selected(&self) -> ConfigFile {
        self.selected
    }

    pub fn contents(&self, file: ConfigFile) -> &str {
        match file {
            ConfigFile::Prometheus => &self.rendered.prometheus_yml,
            ConfigFile::Alerts => &self.rendered.alerts_yml,
        }
    }

    /// The alerts file takes the name `prometheus.yml` refers to it by.
    pub fn file_name(&self, file: ConfigFile) -> &str {
        match file {
            ConfigFile::Prometheus => PROMETHEUS_FILE_NAME,
            ConfigFile::Alerts => &self.rule_file,
        }
    }

    pub fn rendered(&self) -> &RenderedConfig {
        &self.rendered
    }

    /// Writes both files into `dir`, creating it when missing.
    pub async fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(dir).await?;
        let mut written = Vec::with_capacity(2);
        for file in [ConfigFile::Prometheus, ConfigFile::Alerts] {
            let path = dir.join(self.file_name(file));
            tokio::fs::write(&path, self.contents(file)).await?;
            written.push(path);
        }
        info!(dir = %dir.display(), "Wrote generated Prometheus configuration.");
        Ok(written)
    }
}

impl fmt::Display for ConfigPreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {}", self.file_name(self.selected))?;
        f.write_str(self.contents(self.selected))
    }
}
