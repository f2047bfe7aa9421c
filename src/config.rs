//! Config model and persistence helpers.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Top-level configuration stored in `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Odoo server and login.
    pub odoo: OdooCfg,
    /// Provisioning workflow switches.
    pub workflow: WorkflowCfg,
    /// Where and how documents are produced.
    pub output: OutputCfg,
    /// Operator profile values.
    #[serde(default)]
    pub operator: OperatorCfg,
}

/// Odoo connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdooCfg {
    /// Server root, e.g. `http://localhost:8069`.
    pub base_url: String,
    /// Database to log into.
    pub database: String,
    /// Login; the session step is skipped when empty.
    pub login: String,
    /// Password for `login`.
    pub password: String,
}

/// Workflow behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowCfg {
    /// Custom POS mode; when off every form edit and action is ignored.
    pub custom_mode: bool,
    /// Send a locally generated code with each single-generate request.
    #[serde(default)]
    pub propose_codes: bool,
}

/// Document output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputCfg {
    /// Directory receiving downloaded PDFs and templates.
    pub download_dir: String,
    /// Prefix of downloaded PDF names (`<prefix>-YYYY-MM-DD.pdf`).
    pub file_prefix: String,
    /// Report action rendering the access code cards.
    pub report_action: String,
    /// Program that prints a file given as its last argument.
    pub print_command: String,
    /// Extra arguments placed before the file.
    #[serde(default)]
    pub print_args: Vec<String>,
    /// Open each downloaded report in the system browser once saved.
    ///
    /// The browser does not share the Odoo session cookie, so it is given
    /// the local file rather than the report URL.
    #[serde(default)]
    pub open_in_browser: bool,
}

/// Operator profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatorCfg {
    /// Country picked in the country picker.
    pub country_id: Option<i64>,
    /// Display name of that country.
    #[serde(default)]
    pub country_name: String,
}

impl Config {
    /// Load from disk or create defaults when missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let s = fs::read_to_string(path)?;
            Ok(toml::from_str(&s)?)
        } else {
            let cfg = Self::default();
            cfg.save(path)?;
            Ok(cfg)
        }
    }

    /// Persist the config as pretty TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let s = toml::to_string_pretty(self)?;
        fs::write(path, s)?;
        Ok(())
    }
}

impl Default for Config {
    /// Defaults target a local Odoo with the access code module installed.
    fn default() -> Self {
        Self {
            odoo: OdooCfg {
                base_url: "http://localhost:8069".into(),
                database: "".into(),
                login: "".into(),
                password: "".into(),
            },
            workflow: WorkflowCfg {
                custom_mode: true,
                propose_codes: false,
            },
            output: OutputCfg {
                download_dir: ".".into(),
                file_prefix: "scentopia".into(),
                report_action: "gm_pos_access_code.action_access_code_report".into(),
                print_command: "lp".into(),
                print_args: vec![],
                open_in_browser: false,
            },
            operator: OperatorCfg::default(),
        }
    }
}
