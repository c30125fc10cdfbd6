//! Local context cache.
//!
//! Remembers the most recently confirmed project, experiment and job so later
//! invocations can omit them. Each kind has a single slot; the last write wins.
//!
//! - [`ContextCache`] - typed access over a backend
//! - [`FileBackend`] - one JSON file per kind, written atomically
//! - [`MemoryBackend`] - in-process slots for tests and embedding

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use jobscope_proto::{Address, EntityKind, JobAddress, JobRef, ProjectRef};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::CacheError;

/// Value held in one cache slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ContextValue {
    /// Last project.
    Project(ProjectRef),
    /// Last experiment sequence.
    Experiment(u64),
    /// Last job.
    Job {
        /// Job identifier.
        job: JobRef,
        /// Set when the job was addressed by UUID alone, without a project
        /// or experiment.
        #[serde(default)]
        flat: bool,
    },
}

impl ContextValue {
    /// Slot this value belongs in.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Project(_) => EntityKind::Project,
            Self::Experiment(_) => EntityKind::Experiment,
            Self::Job { .. } => EntityKind::Job,
        }
    }

    /// The identifiers present in an address, outermost first.
    ///
    /// A flat job address only contributes its job.
    #[must_use]
    pub fn from_address(address: &Address) -> Vec<Self> {
        match address {
            Address::Project { project } => vec![Self::Project(project.clone())],
            Address::Experiment {
                project,
                experiment,
            } => vec![Self::Project(project.clone()), Self::Experiment(*experiment)],
            Address::Job { job } => match job {
                JobAddress::Hierarchical {
                    project,
                    experiment,
                    ..
                }
                | JobAddress::Mixed {
                    project,
                    experiment,
                    ..
                } => vec![
                    Self::Project(project.clone()),
                    Self::Experiment(*experiment),
                    Self::Job {
                        job: job.job_ref(),
                        flat: false,
                    },
                ],
                JobAddress::Flat { .. } => vec![Self::Job {
                    job: job.job_ref(),
                    flat: true,
                }],
            },
        }
    }
}

/// Storage for cache slots.
pub trait ContextBackend: Send + Sync {
    /// Read the slot for `kind`.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot exists but cannot be read.
    fn load(&self, kind: EntityKind) -> Result<Option<ContextValue>, CacheError>;

    /// Overwrite the slot matching the value's kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be persisted.
    fn store(&self, value: &ContextValue) -> Result<(), CacheError>;

    /// Empty the slot for `kind`.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be removed.
    fn remove(&self, kind: EntityKind) -> Result<(), CacheError>;
}

// ============================================================================
// File backend
// ============================================================================

/// Slots stored as `<dir>/<kind>.json`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the slot files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing the slot for `kind`.
    #[must_use]
    pub fn path_for(&self, kind: EntityKind) -> PathBuf {
        self.dir.join(format!("{kind}.json"))
    }
}

impl ContextBackend for FileBackend {
    fn load(&self, kind: EntityKind) -> Result<Option<ContextValue>, CacheError> {
        let path = self.path_for(kind);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let value: ContextValue =
            serde_json::from_str(&content).map_err(|e| CacheError::Corrupt {
                kind,
                path: path.clone(),
                reason: e.to_string(),
            })?;
        if value.kind() != kind {
            return Err(CacheError::Corrupt {
                kind,
                path,
                reason: format!("holds a {} value", value.kind()),
            });
        }

        trace!(%kind, path = %path.display(), "loaded context slot");
        Ok(Some(value))
    }

    fn store(&self, value: &ContextValue) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let kind = value.kind();
        let content = serde_json::to_string_pretty(value)?;

        // Atomic write
        let tmp_path = self.dir.join(format!(".{kind}-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp_path, content)?;
        if let Err(e) = fs::rename(&tmp_path, self.path_for(kind)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn remove(&self, kind: EntityKind) -> Result<(), CacheError> {
        match fs::remove_file(self.path_for(kind)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Memory backend
// ============================================================================

/// Slots kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slots: RwLock<HashMap<EntityKind, ContextValue>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContextBackend for MemoryBackend {
    fn load(&self, kind: EntityKind) -> Result<Option<ContextValue>, CacheError> {
        Ok(self.slots.read().get(&kind).cloned())
    }

    fn store(&self, value: &ContextValue) -> Result<(), CacheError> {
        self.slots.write().insert(value.kind(), value.clone());
        Ok(())
    }

    fn remove(&self, kind: EntityKind) -> Result<(), CacheError> {
        self.slots.write().remove(&kind);
        Ok(())
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Every slot at once, for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContextSnapshot {
    /// Cached project.
    pub project: Option<ProjectRef>,
    /// Cached experiment sequence.
    pub experiment: Option<u64>,
    /// Cached job.
    pub job: Option<JobRef>,
}

impl ContextSnapshot {
    /// Returns true if nothing is cached.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.project.is_none() && self.experiment.is_none() && self.job.is_none()
    }
}

/// Typed handle over a [`ContextBackend`].
///
/// The cache is passed explicitly to whatever reads or writes it; there is no
/// process-wide instance.
#[derive(Debug)]
pub struct ContextCache<B = FileBackend> {
    backend: B,
}

impl ContextCache<FileBackend> {
    /// Open the file-backed cache stored under `dir`.
    #[must_use]
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self::new(FileBackend::new(dir))
    }
}

impl ContextCache<MemoryBackend> {
    /// Create an empty in-memory cache.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }
}

impl<B: ContextBackend> ContextCache<B> {
    /// Wrap a backend.
    #[must_use]
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The underlying backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Read the slot for `kind`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn get(&self, kind: EntityKind) -> Result<Option<ContextValue>, CacheError> {
        self.backend.load(kind)
    }

    /// Overwrite the slot matching the value's kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    pub fn set(&self, value: ContextValue) -> Result<(), CacheError> {
        debug!(kind = %value.kind(), "updating context slot");
        self.backend.store(&value)
    }

    /// Cached project, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn project(&self) -> Result<Option<ProjectRef>, CacheError> {
        match self.get(EntityKind::Project)? {
            Some(ContextValue::Project(project)) => Ok(Some(project)),
            Some(other) => Err(Self::mismatch(EntityKind::Project, &other)),
            None => Ok(None),
        }
    }

    /// Cached experiment sequence, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn experiment(&self) -> Result<Option<u64>, CacheError> {
        match self.get(EntityKind::Experiment)? {
            Some(ContextValue::Experiment(sequence)) => Ok(Some(sequence)),
            Some(other) => Err(Self::mismatch(EntityKind::Experiment, &other)),
            None => Ok(None),
        }
    }

    /// Cached job, if any, however it was addressed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn job(&self) -> Result<Option<JobRef>, CacheError> {
        Ok(self.job_slot()?.map(|(job, _)| job))
    }

    /// Cached job, if it was last addressed within a project and experiment.
    ///
    /// A job remembered from a flat address is not known to belong to the
    /// cached experiment and reads as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn scoped_job(&self) -> Result<Option<JobRef>, CacheError> {
        Ok(self
            .job_slot()?
            .and_then(|(job, flat)| (!flat).then_some(job)))
    }

    fn job_slot(&self) -> Result<Option<(JobRef, bool)>, CacheError> {
        match self.get(EntityKind::Job)? {
            Some(ContextValue::Job { job, flat }) => Ok(Some((job, flat))),
            Some(other) => Err(Self::mismatch(EntityKind::Job, &other)),
            None => Ok(None),
        }
    }

    /// Record every identifier present in a confirmed address.
    ///
    /// # Errors
    ///
    /// Returns an error on the first slot that cannot be written.
    pub fn remember(&self, address: &Address) -> Result<(), CacheError> {
        for value in ContextValue::from_address(address) {
            self.set(value)?;
        }
        Ok(())
    }

    /// Empty every slot.
    ///
    /// # Errors
    ///
    /// Returns an error on the first slot that cannot be removed.
    pub fn clear(&self) -> Result<(), CacheError> {
        for kind in EntityKind::ALL {
            self.backend.remove(kind)?;
        }
        Ok(())
    }

    /// Read every slot.
    ///
    /// # Errors
    ///
    /// Returns an error if any slot cannot be read.
    pub fn snapshot(&self) -> Result<ContextSnapshot, CacheError> {
        Ok(ContextSnapshot {
            project: self.project()?,
            experiment: self.experiment()?,
            job: self.job()?,
        })
    }

    fn mismatch(kind: EntityKind, found: &ContextValue) -> CacheError {
        CacheError::Corrupt {
            kind,
            path: PathBuf::from(kind.as_str()),
            reason: format!("holds a {} value", found.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ProjectRef {
        ProjectRef::new("adam", "mnist").expect("valid project")
    }

    fn job_address() -> Address {
        JobAddress::within(project(), 3, JobRef::Sequence(7)).into()
    }

    #[test]
    fn memory_cache_starts_empty() {
        let cache = ContextCache::in_memory();
        assert!(cache.snapshot().expect("snapshot").is_empty());
        assert_eq!(cache.project().expect("read"), None);
    }

    #[test]
    fn set_overwrites_single_slot() {
        let cache = ContextCache::in_memory();
        cache.set(ContextValue::Experiment(1)).expect("set");
        cache.set(ContextValue::Experiment(2)).expect("set");
        assert_eq!(cache.experiment().expect("read"), Some(2));
        assert_eq!(cache.project().expect("read"), None);
    }

    #[test]
    fn remember_writes_every_part_of_hierarchical_job() {
        let cache = ContextCache::in_memory();
        cache.remember(&job_address()).expect("remember");

        let snapshot = cache.snapshot().expect("snapshot");
        assert_eq!(snapshot.project, Some(project()));
        assert_eq!(snapshot.experiment, Some(3));
        assert_eq!(snapshot.job, Some(JobRef::Sequence(7)));
    }

    #[test]
    fn remember_flat_job_only_touches_job_slot() {
        let cache = ContextCache::in_memory();
        cache.set(ContextValue::Project(project())).expect("set");
        cache.set(ContextValue::Experiment(9)).expect("set");

        let uuid = Uuid::new_v4();
        cache
            .remember(&JobAddress::Flat { uuid }.into())
            .expect("remember");

        let snapshot = cache.snapshot().expect("snapshot");
        assert_eq!(snapshot.project, Some(project()));
        assert_eq!(snapshot.experiment, Some(9));
        assert_eq!(snapshot.job, Some(JobRef::Uuid(uuid)));
    }

    #[test]
    fn flat_job_is_not_scoped_to_cached_experiment() {
        let cache = ContextCache::in_memory();
        cache.remember(&job_address()).expect("remember");
        assert_eq!(cache.scoped_job().expect("read"), Some(JobRef::Sequence(7)));

        let uuid = Uuid::new_v4();
        cache
            .remember(&JobAddress::Flat { uuid }.into())
            .expect("remember");
        assert_eq!(cache.job().expect("read"), Some(JobRef::Uuid(uuid)));
        assert_eq!(cache.scoped_job().expect("read"), None);

        cache.remember(&job_address()).expect("remember");
        assert_eq!(cache.scoped_job().expect("read"), Some(JobRef::Sequence(7)));
    }

    #[test]
    fn job_slot_without_flat_flag_reads_as_scoped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = FileBackend::new(dir.path());
        fs::write(
            backend.path_for(EntityKind::Job),
            r#"{"kind":"job","value":{"job":{"type":"sequence","value":4}}}"#,
        )
        .expect("write");

        let cache = ContextCache::new(backend);
        assert_eq!(cache.scoped_job().expect("read"), Some(JobRef::Sequence(4)));
    }

    #[test]
    fn remember_project_address_leaves_deeper_slots() {
        let cache = ContextCache::in_memory();
        cache
            .set(ContextValue::Job {
                job: JobRef::Sequence(1),
                flat: false,
            })
            .expect("set");
        cache
            .remember(&Address::Project { project: project() })
            .expect("remember");
        assert_eq!(cache.job().expect("read"), Some(JobRef::Sequence(1)));
        assert_eq!(cache.experiment().expect("read"), None);
    }

    #[test]
    fn clear_empties_all_slots() {
        let cache = ContextCache::in_memory();
        cache.remember(&job_address()).expect("remember");
        cache.clear().expect("clear");
        assert!(cache.snapshot().expect("snapshot").is_empty());
    }

    #[test]
    fn file_backend_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let cache = ContextCache::open(dir.path());
            cache.remember(&job_address()).expect("remember");
        }
        {
            let cache = ContextCache::open(dir.path());
            let snapshot = cache.snapshot().expect("snapshot");
            assert_eq!(snapshot.project, Some(project()));
            assert_eq!(snapshot.experiment, Some(3));
            assert_eq!(snapshot.job, Some(JobRef::Sequence(7)));
        }
    }

    #[test]
    fn file_backend_one_file_per_kind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = ContextCache::open(dir.path().join("context"));
        cache.set(ContextValue::Experiment(4)).expect("set");

        let backend = cache.backend();
        assert!(backend.path_for(EntityKind::Experiment).exists());
        assert!(!backend.path_for(EntityKind::Project).exists());

        let leftovers: Vec<_> = fs::read_dir(backend.dir())
            .expect("read dir")
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn file_backend_missing_dir_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = ContextCache::open(dir.path().join("never-created"));
        assert!(cache.snapshot().expect("snapshot").is_empty());
        cache.clear().expect("clear on missing dir");
    }

    #[test]
    fn file_backend_rejects_wrong_kind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = FileBackend::new(dir.path());
        let misplaced = serde_json::to_string(&ContextValue::Experiment(1)).expect("serialize");
        fs::write(backend.path_for(EntityKind::Project), misplaced).expect("write");

        let err = backend.load(EntityKind::Project).expect_err("corrupt");
        assert!(matches!(err, CacheError::Corrupt { kind: EntityKind::Project, .. }));
    }

    #[test]
    fn file_backend_rejects_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = FileBackend::new(dir.path());
        fs::write(backend.path_for(EntityKind::Job), "{{{").expect("write");
        assert!(backend.load(EntityKind::Job).is_err());
    }
}
