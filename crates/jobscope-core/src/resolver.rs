//! Entity resolution.
//!
//! Turns the identifiers a user typed, plus whatever the [`ContextCache`]
//! remembers, into a complete [`Address`]. Resolution is purely local: it
//! never contacts the remote and never writes the cache.

use jobscope_proto::{Address, EntityKind, JobAddress, JobRef, ProjectRef};
use tracing::debug;
use uuid::Uuid;

use crate::context::{ContextBackend, ContextCache};
use crate::error::{CoreError, Result};

/// Identifiers supplied explicitly on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplicitParts {
    /// Project, if given.
    pub project: Option<ProjectRef>,
    /// Experiment sequence, if given.
    pub experiment: Option<u64>,
    /// Job, if given.
    pub job: Option<JobRef>,
}

impl ExplicitParts {
    /// No explicit identifiers.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the project.
    #[must_use]
    pub fn with_project(mut self, project: ProjectRef) -> Self {
        self.project = Some(project);
        self
    }

    /// Set the experiment sequence.
    #[must_use]
    pub const fn with_experiment(mut self, experiment: u64) -> Self {
        self.experiment = Some(experiment);
        self
    }

    /// Set the job.
    #[must_use]
    pub const fn with_job(mut self, job: JobRef) -> Self {
        self.job = Some(job);
        self
    }
}

/// How the target entity is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Project/experiment/job parts, missing ones filled from the cache.
    Hierarchical(ExplicitParts),
    /// A job UUID on its own.
    Flat {
        /// Job UUID.
        uuid: Uuid,
    },
}

impl From<ExplicitParts> for Selector {
    fn from(parts: ExplicitParts) -> Self {
        Self::Hierarchical(parts)
    }
}

/// Resolves selectors against a context cache.
#[derive(Debug)]
pub struct Resolver<'a, B> {
    cache: &'a ContextCache<B>,
}

impl<'a, B: ContextBackend> Resolver<'a, B> {
    /// Create a resolver reading from `cache`.
    #[must_use]
    pub const fn new(cache: &'a ContextCache<B>) -> Self {
        Self { cache }
    }

    /// Build the address of a `kind` entity.
    ///
    /// Explicit parts always win over cached ones. The cache is only read for
    /// parts that are missing.
    ///
    /// # Errors
    ///
    /// - [`CoreError::UnresolvedContext`] naming the first kind (project,
    ///   experiment, job) that is neither given nor cached
    /// - [`CoreError::InvalidAddress`] for a flat selector targeting a
    ///   project or experiment
    /// - [`CoreError::Cache`] if the cache cannot be read
    pub fn resolve(&self, kind: EntityKind, selector: &Selector) -> Result<Address> {
        let address = match selector {
            Selector::Flat { uuid } => {
                if kind != EntityKind::Job {
                    return Err(CoreError::InvalidAddress(format!(
                        "a flat job UUID cannot address a {kind}"
                    )));
                }
                JobAddress::Flat { uuid: *uuid }.into()
            }
            Selector::Hierarchical(parts) => self.resolve_parts(kind, parts)?,
        };

        debug!(%kind, %address, "resolved address");
        Ok(address)
    }

    fn resolve_parts(&self, kind: EntityKind, parts: &ExplicitParts) -> Result<Address> {
        let project = self.project(parts)?;
        if kind == EntityKind::Project {
            return Ok(Address::Project { project });
        }

        let experiment = self.experiment(parts)?;
        if kind == EntityKind::Experiment {
            return Ok(Address::Experiment {
                project,
                experiment,
            });
        }

        let job = self.job(parts)?;
        Ok(JobAddress::within(project, experiment, job).into())
    }

    fn project(&self, parts: &ExplicitParts) -> Result<ProjectRef> {
        if let Some(project) = &parts.project {
            return Ok(project.clone());
        }
        self.cache
            .project()?
            .ok_or(CoreError::UnresolvedContext(EntityKind::Project))
    }

    fn experiment(&self, parts: &ExplicitParts) -> Result<u64> {
        if let Some(experiment) = parts.experiment {
            return Ok(experiment);
        }
        self.cache
            .experiment()?
            .ok_or(CoreError::UnresolvedContext(EntityKind::Experiment))
    }

    fn job(&self, parts: &ExplicitParts) -> Result<JobRef> {
        if let Some(job) = parts.job {
            return Ok(job);
        }
        self.cache
            .scoped_job()?
            .ok_or(CoreError::UnresolvedContext(EntityKind::Job))
    }
}
