//! Pipeline configuration
//!
//! A pipeline is described in YAML: where the API lives, how to authenticate,
//! which snapshot and daily datasets to fetch, where the watermark and the
//! scratch directories live, and which warehouse receives the artifacts.
//!
//! String values in request params, bodies, paths and auth settings are
//! templates rendered per request (see [`crate::template`]).

use crate::auth::AuthConfig;
use crate::error::{Error, Result};
use crate::extract::{FetchRequest, Pagination};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::schema::{DdlMode, WarehouseTypes};
use crate::stage::{SOURCE_COLUMN, STAGE_DIR};
use crate::state::parse_date;
use crate::template::{self, TemplateContext};
use crate::types::{BackoffType, JsonObject, JsonValue, LoadMode, Method};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Top-Level Pipeline Config
// ============================================================================

/// Complete pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name, used in logs
    pub name: String,

    /// Base URL for API requests
    pub base_url: String,

    /// Authentication
    #[serde(default)]
    pub auth: AuthConfigDef,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Watermark file
    pub state_path: PathBuf,

    /// Scratch directory for landing and staged files
    pub work_dir: PathBuf,

    /// Watermark used when no state file exists (`YYYY-MM-DD`)
    #[serde(default)]
    pub initial_watermark: Option<String>,

    /// Free-form template variables
    #[serde(default)]
    pub vars: JsonObject,

    /// Datasets fetched in full before the daily loop
    #[serde(default)]
    pub snapshots: Vec<SnapshotConfig>,

    /// Datasets fetched once per day of the window
    #[serde(default)]
    pub datasets: Vec<DailyDatasetConfig>,

    /// Target warehouse
    #[serde(default)]
    pub warehouse: WarehouseConfig,

    /// Staging options
    #[serde(default)]
    pub staging: StagingConfig,
}

impl PipelineConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?;
        Self::from_yaml(&yaml)
    }

    /// Check everything that can be checked before a run
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::missing_field("name"));
        }
        url::Url::parse(&self.base_url)?;
        self.initial_watermark()?;

        let mut seen = HashSet::new();
        let names = self
            .snapshots
            .iter()
            .map(|s| s.name.as_str())
            .chain(self.datasets.iter().map(|d| d.name.as_str()));
        for name in names {
            validate_dataset_name(name)?;
            if !seen.insert(name) {
                return Err(Error::invalid_value(
                    "datasets",
                    format!("dataset '{name}' is defined twice"),
                ));
            }
        }

        let needs_entities = self.snapshots.iter().any(|s| s.per_entity)
            || self.datasets.iter().any(|d| d.per_entity);
        if needs_entities && self.entity_snapshot().is_none() {
            return Err(Error::invalid_value(
                "snapshots",
                "per_entity datasets need a snapshot with an entity_key",
            ));
        }
        if let Some(source) = self.entity_snapshot() {
            if source.per_entity {
                return Err(Error::invalid_value(
                    "snapshots",
                    format!("snapshot '{}' defines entities and cannot be per_entity", source.name),
                ));
            }
        }

        for snapshot in &self.snapshots {
            check_roots(&snapshot.name, &snapshot.request, snapshot.per_entity, false)?;
        }
        for dataset in &self.datasets {
            check_roots(&dataset.name, &dataset.request, dataset.per_entity, true)?;
        }

        self.check_state_path()?;

        if self.http.requests_per_second == Some(0) {
            return Err(Error::invalid_value(
                "http.requests_per_second",
                "must be greater than zero",
            ));
        }
        self.warehouse.warehouse_types()?;
        Ok(())
    }

    /// The state file must not sit in a directory the workspace empties
    fn check_state_path(&self) -> Result<()> {
        let state = normalize_path(&self.state_path);
        let work = normalize_path(&self.work_dir);
        if state == work {
            return Err(Error::invalid_value("state_path", "must not be the work directory"));
        }

        let owned = std::iter::once(STAGE_DIR).chain(self.dataset_names());
        for dir in owned {
            if state.starts_with(work.join(dir)) {
                return Err(Error::invalid_value(
                    "state_path",
                    format!(
                        "'{}' is inside '{}', which is emptied on every run",
                        self.state_path.display(),
                        work.join(dir).display()
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Initial watermark, if configured
    pub fn initial_watermark(&self) -> Result<Option<NaiveDate>> {
        self.initial_watermark
            .as_deref()
            .map(|raw| {
                parse_date(raw).ok_or_else(|| {
                    Error::invalid_value("initial_watermark", format!("'{raw}' is not YYYY-MM-DD"))
                })
            })
            .transpose()
    }

    /// The snapshot whose `entity_key` defines the entity list
    pub fn entity_snapshot(&self) -> Option<&SnapshotConfig> {
        self.snapshots.iter().find(|s| s.entity_key.is_some())
    }

    /// All dataset names, snapshots first
    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.snapshots
            .iter()
            .map(|s| s.name.as_str())
            .chain(self.datasets.iter().map(|d| d.name.as_str()))
    }

    /// Template context with the process environment and `vars`
    pub fn template_context(&self) -> TemplateContext {
        let mut ctx = TemplateContext::from_env();
        ctx.set_vars(JsonValue::Object(self.vars.clone()));
        ctx
    }

    /// HTTP client settings for this pipeline
    pub fn client_config(&self) -> HttpClientConfig {
        self.http.client_config(&self.base_url)
    }
}

/// Lexical form used to compare configured paths: relative paths are taken
/// from the current directory and `.` components are dropped
fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_relative() {
        std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    } else {
        path.to_path_buf()
    };
    absolute
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Reject template roots that are never set for this kind of request
fn check_roots(name: &str, request: &RequestDef, per_entity: bool, daily: bool) -> Result<()> {
    for variable in request.variables() {
        let unbound = (variable.starts_with("entity.") && !per_entity)
            || (variable.starts_with("window.") && !daily);
        if unbound {
            return Err(Error::invalid_value(
                name,
                format!("'{{{{ {variable} }}}}' is not available for this dataset"),
            ));
        }
    }
    Ok(())
}

fn validate_dataset_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::missing_field("datasets.name"));
    }
    if name == STAGE_DIR {
        return Err(Error::invalid_value(
            "datasets",
            format!("'{STAGE_DIR}' is reserved for the stage directory"),
        ));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(Error::invalid_value(
            "datasets",
            format!("'{name}' must be a plain directory name"),
        ));
    }
    Ok(())
}

// ============================================================================
// Auth Config
// ============================================================================

/// Authentication as written in YAML (values may be templates)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfigDef {
    /// No authentication
    #[default]
    None,

    /// HTTP Basic authentication
    Basic {
        /// Username (usually a template)
        username: String,
        /// Password (usually a template)
        password: String,
    },

    /// Bearer token
    Bearer {
        /// Token (usually a template)
        token: String,
    },

    /// Session-based authentication (login endpoint)
    Session {
        /// Login endpoint URL
        login_url: String,
        /// HTTP method for login
        #[serde(default = "default_login_method")]
        login_method: Method,
        /// Login request body; string values are templates
        #[serde(default)]
        login_body: JsonValue,
        /// Dotted path to the token in the login response
        token_path: String,
        /// Header carrying the token
        #[serde(default = "default_token_header")]
        token_header: String,
        /// Prefix for the token value
        #[serde(default)]
        token_prefix: Option<String>,
        /// Dotted path to the token lifetime in seconds
        #[serde(default)]
        expires_in_path: Option<String>,
    },
}

fn default_login_method() -> Method {
    Method::POST
}

fn default_token_header() -> String {
    "authorization".to_string()
}

impl AuthConfigDef {
    /// Render templates into a runtime auth config
    pub fn resolve(&self, ctx: &TemplateContext) -> Result<AuthConfig> {
        Ok(match self {
            AuthConfigDef::None => AuthConfig::None,
            AuthConfigDef::Basic { username, password } => AuthConfig::Basic {
                username: template::render(username, ctx)?,
                password: template::render(password, ctx)?,
            },
            AuthConfigDef::Bearer { token } => AuthConfig::Bearer {
                token: template::render(token, ctx)?,
            },
            AuthConfigDef::Session {
                login_url,
                login_method,
                login_body,
                token_path,
                token_header,
                token_prefix,
                expires_in_path,
            } => AuthConfig::Session {
                login_url: template::render(login_url, ctx)?,
                login_method: (*login_method).into(),
                login_body: template::render_value(login_body, ctx)?,
                token_path: token_path.clone(),
                token_header: token_header.clone(),
                token_prefix: token_prefix.clone(),
                expires_in_path: expires_in_path.clone(),
            },
        })
    }
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum number of retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry backoff strategy
    #[serde(default)]
    pub backoff: BackoffType,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_backoff_ms: u64,

    /// Requests per second; `null` disables rate limiting
    #[serde(default = "default_rps")]
    pub requests_per_second: Option<u32>,

    /// Requests allowed back to back
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            backoff: BackoffType::default(),
            initial_backoff_ms: default_initial_ms(),
            max_backoff_ms: default_max_ms(),
            requests_per_second: default_rps(),
            burst: default_burst(),
            headers: BTreeMap::new(),
        }
    }
}

impl HttpConfig {
    /// Build the client configuration
    pub fn client_config(&self, base_url: &str) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .base_url(base_url)
            .timeout(Duration::from_secs(self.timeout_seconds))
            .max_retries(self.max_retries)
            .backoff(
                self.backoff,
                Duration::from_millis(self.initial_backoff_ms),
                Duration::from_millis(self.max_backoff_ms),
            );
        builder = match self.requests_per_second {
            Some(rps) => builder.rate_limit(RateLimiterConfig::new(rps, self.burst.max(1))),
            None => builder.no_rate_limit(),
        };
        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }
        builder.build()
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_ms() -> u64 {
    500
}

fn default_max_ms() -> u64 {
    60000
}

fn default_rps() -> Option<u32> {
    Some(10)
}

fn default_burst() -> u32 {
    10
}

// ============================================================================
// Dataset Config
// ============================================================================

/// Request template shared by snapshot and daily datasets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestDef {
    /// Endpoint path (template)
    pub path: String,

    /// HTTP method
    #[serde(default)]
    pub method: Method,

    /// Query parameters (templates)
    #[serde(default)]
    pub params: BTreeMap<String, String>,

    /// JSON body; string values are templates
    #[serde(default)]
    pub body: Option<JsonValue>,

    /// Key holding the record list
    #[serde(default)]
    pub record_path: Option<String>,

    /// Pagination strategy
    #[serde(default)]
    pub pagination: Pagination,
}

impl RequestDef {
    /// Template variables referenced by the path, params and body
    pub fn variables(&self) -> Vec<String> {
        let mut strings = vec![self.path.as_str()];
        strings.extend(self.params.values().map(String::as_str));
        if let Some(body) = &self.body {
            collect_strings(body, &mut strings);
        }
        strings.into_iter().flat_map(template::extract_variables).collect()
    }

    /// Render templates into a request
    pub fn render(&self, ctx: &TemplateContext) -> Result<FetchRequest> {
        let query = self
            .params
            .iter()
            .map(|(key, value)| Ok((key.clone(), template::render(value, ctx)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(FetchRequest {
            method: self.method,
            path: template::render(&self.path, ctx)?,
            query,
            body: self
                .body
                .as_ref()
                .map(|body| template::render_value(body, ctx))
                .transpose()?,
            record_path: self.record_path.clone(),
            pagination: self.pagination.clone(),
        })
    }
}

fn collect_strings<'a>(value: &'a JsonValue, out: &mut Vec<&'a str>) {
    match value {
        JsonValue::String(s) => out.push(s),
        JsonValue::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        JsonValue::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

/// Dataset fetched in full before the daily loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Dataset name: landing directory and warehouse table
    pub name: String,

    /// Request template
    #[serde(flatten)]
    pub request: RequestDef,

    /// Column whose distinct values become the entity list
    #[serde(default)]
    pub entity_key: Option<String>,

    /// Fetch once per entity
    #[serde(default)]
    pub per_entity: bool,

    /// How the artifact is loaded
    #[serde(default = "default_snapshot_mode")]
    pub load_mode: LoadMode,
}

fn default_snapshot_mode() -> LoadMode {
    LoadMode::Truncate
}

/// Dataset fetched once per day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyDatasetConfig {
    /// Dataset name: landing directory and warehouse table
    pub name: String,

    /// Request template; `window.*` is set to the day being fetched
    #[serde(flatten)]
    pub request: RequestDef,

    /// Fetch once per entity
    #[serde(default)]
    pub per_entity: bool,

    /// How the artifact is loaded
    #[serde(default)]
    pub load_mode: LoadMode,
}

// ============================================================================
// Warehouse and Staging Config
// ============================================================================

/// Target warehouse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// DuckDB database file; required by `run`
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Type names used in the DDL fragment (`duckdb` or `snowflake`)
    #[serde(default = "default_types")]
    pub types: String,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            path: None,
            types: default_types(),
        }
    }
}

impl WarehouseConfig {
    /// Database file a run loads into
    pub fn require_path(&self) -> Result<&Path> {
        self.path
            .as_deref()
            .ok_or_else(|| Error::missing_field("warehouse.path"))
    }

    /// Parsed warehouse type names
    pub fn warehouse_types(&self) -> Result<WarehouseTypes> {
        self.types.parse()
    }
}

fn default_types() -> String {
    "duckdb".to_string()
}

/// Staging options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
    /// How the DDL fragment is derived
    #[serde(default)]
    pub ddl_mode: DdlMode,

    /// Source-file column name; `null` disables it
    #[serde(default = "default_source_column")]
    pub source_column: Option<String>,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            ddl_mode: DdlMode::default(),
            source_column: default_source_column(),
        }
    }
}

fn default_source_column() -> Option<String> {
    Some(SOURCE_COLUMN.to_string())
}
