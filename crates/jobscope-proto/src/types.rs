//! Core data model shared by the resolver, the gateway client and the CLI.
//!
//! The hierarchy is `owner → project → experiment → job`. Projects are named,
//! experiments are numbered within a project, and jobs are identified either
//! by their sequence inside an experiment or by a globally unique UUID.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProtoError;

/// Maximum length of an owner or project name.
pub const MAX_NAME_LENGTH: usize = 128;

/// Regex for valid owner and project names.
static NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$").unwrap_or_else(|_| unreachable!())
});

// ============================================================================
// Entity kinds
// ============================================================================

/// Granularity level that can be addressed and cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A project owned by a user or organization.
    Project,
    /// A numbered experiment inside a project.
    Experiment,
    /// A job belonging to an experiment.
    Job,
}

impl EntityKind {
    /// All kinds, outermost first.
    pub const ALL: [Self; 3] = [Self::Project, Self::Experiment, Self::Job];

    /// Lowercase name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Experiment => "experiment",
            Self::Job => "job",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Identifiers
// ============================================================================

/// A project qualified by its owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectRef {
    /// Owning user or organization.
    pub owner: String,
    /// Project name.
    pub name: String,
}

impl ProjectRef {
    /// Create a validated project reference.
    ///
    /// # Errors
    ///
    /// Returns an error if either component is not a valid name.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, ProtoError> {
        let owner = owner.into();
        let name = name.into();
        validate_name("owner", &owner)?;
        validate_name("project", &name)?;
        Ok(Self { owner, name })
    }

    /// Parse `owner/name` or a bare `name`.
    ///
    /// A bare name takes its owner from `default_owner`.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is malformed, or if it carries no owner
    /// and no default owner is available.
    pub fn parse(text: &str, default_owner: Option<&str>) -> Result<Self, ProtoError> {
        let text = text.trim();
        match text.split_once('/') {
            Some((owner, name)) => {
                if name.contains('/') {
                    return Err(ProtoError::Validation(format!(
                        "project `{text}` must be `name` or `owner/name`"
                    )));
                }
                Self::new(owner, name)
            }
            None => {
                let owner = default_owner.ok_or(ProtoError::MissingField("owner"))?;
                Self::new(owner, text)
            }
        }
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

fn validate_name(field: &str, value: &str) -> Result<(), ProtoError> {
    if value.is_empty() {
        return Err(ProtoError::Validation(format!("{field} cannot be empty")));
    }
    if value.len() > MAX_NAME_LENGTH {
        return Err(ProtoError::Validation(format!(
            "{field} cannot exceed {MAX_NAME_LENGTH} characters"
        )));
    }
    if !NAME_REGEX.is_match(value) {
        return Err(ProtoError::Validation(format!(
            "{field} `{value}` contains invalid characters"
        )));
    }
    Ok(())
}

/// How a job is identified inside its experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum JobRef {
    /// Sequence number within the experiment.
    Sequence(u64),
    /// Globally unique job UUID.
    Uuid(Uuid),
}

impl FromStr for JobRef {
    type Err = ProtoError;

    /// All-digit text is a sequence number; anything else must be a UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            return s
                .parse()
                .map(Self::Sequence)
                .map_err(|e| ProtoError::Validation(format!("job sequence `{s}`: {e}")));
        }
        Uuid::parse_str(s)
            .map(Self::Uuid)
            .map_err(|_| ProtoError::Validation(format!("`{s}` is neither a job sequence nor a UUID")))
    }
}

impl fmt::Display for JobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequence(seq) => write!(f, "{seq}"),
            Self::Uuid(uuid) => write!(f, "{}", uuid.simple()),
        }
    }
}

// ============================================================================
// Addresses
// ============================================================================

/// Fully-qualified coordinates of a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum JobAddress {
    /// Project, experiment sequence and job sequence.
    Hierarchical {
        /// Owning project.
        project: ProjectRef,
        /// Experiment sequence.
        experiment: u64,
        /// Job sequence.
        job: u64,
    },
    /// Project, experiment sequence and job UUID.
    Mixed {
        /// Owning project.
        project: ProjectRef,
        /// Experiment sequence.
        experiment: u64,
        /// Job UUID.
        uuid: Uuid,
    },
    /// Job UUID alone, no project or experiment context.
    Flat {
        /// Job UUID.
        uuid: Uuid,
    },
}

impl JobAddress {
    /// Build a hierarchical or mixed address from its parts.
    #[must_use]
    pub fn within(project: ProjectRef, experiment: u64, job: JobRef) -> Self {
        match job {
            JobRef::Sequence(job) => Self::Hierarchical {
                project,
                experiment,
                job,
            },
            JobRef::Uuid(uuid) => Self::Mixed {
                project,
                experiment,
                uuid,
            },
        }
    }

    /// The job identifier carried by this address.
    #[must_use]
    pub const fn job_ref(&self) -> JobRef {
        match self {
            Self::Hierarchical { job, .. } => JobRef::Sequence(*job),
            Self::Mixed { uuid, .. } | Self::Flat { uuid } => JobRef::Uuid(*uuid),
        }
    }

    /// The owning project, unless this is a flat address.
    #[must_use]
    pub const fn project(&self) -> Option<&ProjectRef> {
        match self {
            Self::Hierarchical { project, .. } | Self::Mixed { project, .. } => Some(project),
            Self::Flat { .. } => None,
        }
    }

    /// The experiment sequence, unless this is a flat address.
    #[must_use]
    pub const fn experiment(&self) -> Option<u64> {
        match self {
            Self::Hierarchical { experiment, .. } | Self::Mixed { experiment, .. } => {
                Some(*experiment)
            }
            Self::Flat { .. } => None,
        }
    }

    /// Returns true for the UUID-only shape.
    #[must_use]
    pub const fn is_flat(&self) -> bool {
        matches!(self, Self::Flat { .. })
    }
}

impl fmt::Display for JobAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.project().zip(self.experiment()) {
            Some((project, experiment)) => {
                write!(f, "{project}/{experiment}/{}", self.job_ref())
            }
            None => write!(f, "{}", self.job_ref()),
        }
    }
}

/// Target of a remote operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Address {
    /// A project.
    Project {
        /// The project.
        project: ProjectRef,
    },
    /// An experiment inside a project.
    Experiment {
        /// Owning project.
        project: ProjectRef,
        /// Experiment sequence.
        experiment: u64,
    },
    /// A job.
    Job {
        /// Job coordinates.
        job: JobAddress,
    },
}

impl Address {
    /// The kind of entity this address targets.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Project { .. } => EntityKind::Project,
            Self::Experiment { .. } => EntityKind::Experiment,
            Self::Job { .. } => EntityKind::Job,
        }
    }

    /// The project component, if present.
    #[must_use]
    pub const fn project(&self) -> Option<&ProjectRef> {
        match self {
            Self::Project { project } | Self::Experiment { project, .. } => Some(project),
            Self::Job { job } => job.project(),
        }
    }

    /// The experiment component, if present.
    #[must_use]
    pub const fn experiment(&self) -> Option<u64> {
        match self {
            Self::Project { .. } => None,
            Self::Experiment { experiment, .. } => Some(*experiment),
            Self::Job { job } => job.experiment(),
        }
    }

    /// The job component, if present.
    #[must_use]
    pub const fn job(&self) -> Option<&JobAddress> {
        match self {
            Self::Job { job } => Some(job),
            _ => None,
        }
    }
}

impl From<JobAddress> for Address {
    fn from(job: JobAddress) -> Self {
        Self::Job { job }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project { project } => write!(f, "{project}"),
            Self::Experiment {
                project,
                experiment,
            } => write!(f, "{project}/{experiment}"),
            Self::Job { job } => write!(f, "{job}"),
        }
    }
}

// ============================================================================
// Remote records
// ============================================================================

/// Lifecycle status reported for projects, experiments and jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    /// Accepted, not yet scheduled.
    Created,
    /// Image is being built.
    Building,
    /// Waiting for resources.
    Scheduled,
    /// Containers are starting.
    Starting,
    /// Running.
    Running,
    /// Finished successfully.
    Succeeded,
    /// Finished with an error.
    Failed,
    /// Stopped by a user.
    Stopped,
    /// Any status this client does not know about.
    #[serde(other)]
    Unknown,
}

impl EntityStatus {
    /// Returns true if the entity reached a final state.
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Stopped)
    }

    /// Lowercase status name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Building => "building",
            Self::Scheduled => "scheduled",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record owned by the remote side.
///
/// Only the identifier and status are interpreted; every other field is
/// carried through untouched for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable identifier (unique name or UUID).
    pub id: String,
    /// Lifecycle status, if the record has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EntityStatus>,
    /// Remaining fields.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Entity {
    /// Create an entity with no extra fields.
    #[must_use]
    pub fn new(id: impl Into<String>, status: Option<EntityStatus>) -> Self {
        Self {
            id: id.into(),
            status,
            fields: serde_json::Map::new(),
        }
    }

    /// Add a field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// Opaque token handed back verbatim to fetch the following page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub String);

impl Cursor {
    /// Create a cursor.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Navigation envelope of a paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// Total number of items across all pages.
    pub count: u64,
    /// Whether a following page exists.
    pub has_next: bool,
    /// Whether a preceding page exists.
    pub has_previous: bool,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePage {
    /// Items in remote order.
    #[serde(rename = "results")]
    pub items: Vec<Entity>,
    /// Navigation envelope; absent when the listing is not paginated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
    /// Cursor for the following page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Cursor>,
}

impl ResponsePage {
    /// A single, complete page without a navigation envelope.
    #[must_use]
    pub const fn unpaginated(items: Vec<Entity>) -> Self {
        Self {
            items,
            meta: None,
            next: None,
        }
    }

    /// Returns true if the page carries no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true if the remote announced a following page.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.meta.is_some_and(|meta| meta.has_next)
    }
}

// ============================================================================
// Streaming
// ============================================================================

/// Which long-lived feed a subscription delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// Job log lines.
    Logs,
    /// Job resource samples.
    Resources,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logs => f.write_str("logs"),
            Self::Resources => f.write_str("resources"),
        }
    }
}

/// One unit delivered by a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// A single log line.
    LogLine {
        /// Line content.
        #[serde(rename = "log_line")]
        text: String,
    },
    /// A resource usage sample.
    ResourceSample {
        /// When the sample was taken.
        timestamp: DateTime<Utc>,
        /// Metric name to value.
        metrics: BTreeMap<String, f64>,
    },
}

impl StreamMessage {
    /// Create a log line message.
    #[must_use]
    pub fn log_line(text: impl Into<String>) -> Self {
        Self::LogLine { text: text.into() }
    }

    /// The feed this message belongs to.
    #[must_use]
    pub const fn stream_kind(&self) -> StreamKind {
        match self {
            Self::LogLine { .. } => StreamKind::Logs,
            Self::ResourceSample { .. } => StreamKind::Resources,
        }
    }
}
