//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats. Streamed messages
//! are written one per line: the raw text for logs, and compact JSON objects
//! in JSON mode.

use std::io::Write;

use jobscope_core::ContextSnapshot;
use jobscope_proto::{Entity, EntityKind, PageMeta, StreamMessage};
use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write one streamed item and flush, so it is visible immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_line<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

// ============================================================================
// Entities
// ============================================================================

/// A single fetched entity with its resolved address.
#[derive(Debug, Clone, Serialize)]
pub struct EntityView {
    /// Entity kind.
    pub kind: EntityKind,
    /// Resolved address, as displayed.
    pub address: String,
    /// The record.
    #[serde(flatten)]
    pub entity: Entity,
}

impl TableDisplay for EntityView {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{} info: {}", capitalize(self.kind.as_str()), self.address)?;
        writeln!(writer, "══════════════════════════════════")?;

        let status = self
            .entity
            .status
            .map_or_else(|| "-".to_string(), |s| s.to_string());
        let mut rows = vec![("id".to_string(), self.entity.id.clone()), ("status".to_string(), status)];
        if let Some(status) = self.entity.status {
            let finished = if status.is_done() { "yes" } else { "no" };
            rows.push(("finished".to_string(), finished.to_string()));
        }
        rows.extend(
            self.entity
                .fields
                .iter()
                .map(|(key, value)| (key.clone(), display_value(value))),
        );

        let width = rows.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
        for (key, value) in rows {
            writeln!(writer, "{key:<width$}  {value}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Statuses
// ============================================================================

/// Status records of one entity, one page or the whole listing.
#[derive(Debug, Clone, Serialize)]
pub struct StatusListing {
    /// Entity kind whose statuses are listed.
    pub kind: EntityKind,
    /// Resolved address, as displayed.
    pub address: String,
    /// Page number, `None` when every page was collected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Navigation metadata of the page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation: Option<PageMeta>,
    /// Status records.
    pub statuses: Vec<Entity>,
}

impl TableDisplay for StatusListing {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if let Some(meta) = &self.navigation {
            writeln!(writer, "Statuses for {} `{}`", self.kind, self.address)?;
            writeln!(writer)?;
            writeln!(writer, "Navigation")?;
            if let Some(page) = self.page {
                writeln!(writer, "  Page:           {page}")?;
            }
            writeln!(writer, "  Count:          {}", meta.count)?;
            writeln!(writer, "  Has next:       {}", meta.has_next)?;
            writeln!(writer, "  Has previous:   {}", meta.has_previous)?;
            writeln!(writer)?;
        } else if self.statuses.is_empty() {
            writeln!(writer, "No statuses found for {} `{}`", self.kind, self.address)?;
            return Ok(());
        } else {
            writeln!(writer, "Statuses for {} `{}`", self.kind, self.address)?;
            writeln!(writer)?;
        }

        if self.statuses.is_empty() {
            return Ok(());
        }

        writeln!(writer, "{:<36}  {:<12}  {:<25}", "ID", "STATUS", "CREATED")?;
        writeln!(writer, "{}", "─".repeat(77))?;
        for record in &self.statuses {
            let status = record.status.map_or("-", |s| s.as_str());
            let created = record
                .fields
                .get("created_at")
                .map_or_else(|| "-".to_string(), display_value);
            writeln!(
                writer,
                "{:<36}  {:<12}  {:<25}",
                truncate(&record.id, 36),
                status,
                truncate(&created, 25)
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} status(es)", self.statuses.len())?;
        Ok(())
    }
}

// ============================================================================
// Streams
// ============================================================================

impl TableDisplay for StreamMessage {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        match self {
            Self::LogLine { text } => writeln!(writer, "{text}")?,
            Self::ResourceSample { timestamp, metrics } => {
                write!(writer, "{}", timestamp.format("%Y-%m-%dT%H:%M:%SZ"))?;
                for (name, value) in metrics {
                    write!(writer, "  {name}={value:.2}")?;
                }
                writeln!(writer)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Context & dashboard
// ============================================================================

impl TableDisplay for ContextSnapshot {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No cached context")?;
            return Ok(());
        }

        writeln!(writer, "Cached Context")?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Project:     {}", display_opt(self.project.as_ref()))?;
        writeln!(writer, "Experiment:  {}", display_opt(self.experiment.as_ref()))?;
        writeln!(writer, "Job:         {}", display_opt(self.job.as_ref()))?;
        Ok(())
    }
}

/// Result of a simple action.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    /// Whether the action succeeded.
    pub success: bool,
    /// Human-readable message.
    pub message: String,
}

impl TableDisplay for ActionResult {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{}", self.message)?;
        Ok(())
    }
}

/// Dashboard location.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardUrl {
    /// Dashboard URL.
    pub url: String,
    /// Print only the URL.
    #[serde(skip)]
    pub bare: bool,
}

impl TableDisplay for DashboardUrl {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.bare {
            writeln!(writer, "{}", self.url)?;
        } else {
            writeln!(writer, "Dashboard: {}", self.url)?;
        }
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn display_opt<T: std::fmt::Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "-".to_string(), ToString::to_string)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Truncate a string to a maximum length, adding "..." if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use jobscope_proto::{EntityStatus, JobRef, ProjectRef};

    fn job_entity() -> Entity {
        Entity::new("job-7", Some(EntityStatus::Running))
            .with_field("created_at", "2024-01-22T14:00:00Z")
            .with_field("gpus", 2)
    }

    #[test]
    fn entity_table_lists_fields() {
        let view = EntityView {
            kind: EntityKind::Job,
            address: "adam/mnist/3/7".into(),
            entity: job_entity(),
        };
        let output = OutputFormat::default().to_string(&view).expect("render");

        assert!(output.contains("Job info: adam/mnist/3/7"));
        assert!(output.contains("running"));
        assert!(output.contains("finished    no"));
        assert!(output.contains("gpus"));
        assert!(output.contains("2024-01-22T14:00:00Z"));
    }

    #[test]
    fn entity_table_marks_terminal_status() {
        let view = EntityView {
            kind: EntityKind::Job,
            address: "adam/mnist/3/7".into(),
            entity: Entity::new("job-7", Some(EntityStatus::Succeeded)),
        };
        let output = OutputFormat::default().to_string(&view).expect("render");
        assert!(output.contains("finished  yes"));

        let view = EntityView {
            kind: EntityKind::Project,
            address: "adam/mnist".into(),
            entity: Entity::new("mnist", None),
        };
        let output = OutputFormat::default().to_string(&view).expect("render");
        assert!(!output.contains("finished"));
    }

    #[test]
    fn entity_json_is_flat() {
        let view = EntityView {
            kind: EntityKind::Job,
            address: "adam/mnist/3/7".into(),
            entity: job_entity(),
        };
        let output = OutputFormat::new(Format::Json)
            .to_string(&view)
            .expect("render");
        let value: serde_json::Value = serde_json::from_str(&output).expect("json");

        assert_eq!(value["kind"], "job");
        assert_eq!(value["id"], "job-7");
        assert_eq!(value["gpus"], 2);
    }

    #[test]
    fn status_listing_shows_navigation() {
        let listing = StatusListing {
            kind: EntityKind::Experiment,
            address: "adam/mnist/3".into(),
            page: Some(1),
            navigation: Some(PageMeta {
                count: 12,
                has_next: true,
                has_previous: false,
            }),
            statuses: vec![job_entity()],
        };
        let output = OutputFormat::default().to_string(&listing).expect("render");

        assert!(output.contains("Statuses for experiment `adam/mnist/3`"));
        assert!(output.contains("Navigation"));
        assert!(output.contains("Count:          12"));
        assert!(output.contains("Has next:       true"));
        assert!(output.contains("Total: 1 status(es)"));
    }

    #[test]
    fn empty_unpaginated_listing() {
        let listing = StatusListing {
            kind: EntityKind::Job,
            address: "adam/mnist/3/7".into(),
            page: None,
            navigation: None,
            statuses: Vec::new(),
        };
        let output = OutputFormat::default().to_string(&listing).expect("render");
        assert_eq!(output, "No statuses found for job `adam/mnist/3/7`\n");
    }

    #[test]
    fn log_line_is_raw_text() {
        let mut buf = Vec::new();
        OutputFormat::default()
            .write_line(&mut buf, &StreamMessage::log_line("epoch 1 done"))
            .expect("write");
        assert_eq!(String::from_utf8(buf).expect("utf8"), "epoch 1 done\n");
    }

    #[test]
    fn stream_json_is_one_object_per_line() {
        let mut buf = Vec::new();
        let format = OutputFormat::new(Format::Json);
        format
            .write_line(&mut buf, &StreamMessage::log_line("a"))
            .expect("write");
        format
            .write_line(&mut buf, &StreamMessage::log_line("b"))
            .expect("write");

        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"type":"log_line","log_line":"a"}"#);
    }

    #[test]
    fn resource_sample_table() {
        let sample = StreamMessage::ResourceSample {
            timestamp: chrono::Utc
                .with_ymd_and_hms(2024, 1, 22, 14, 0, 0)
                .single()
                .expect("valid time"),
            metrics: [("cpu".to_string(), 0.5), ("memory".to_string(), 1024.0)]
                .into_iter()
                .collect(),
        };
        let mut buf = Vec::new();
        sample.write_table(&mut buf).expect("write");
        assert_eq!(
            String::from_utf8(buf).expect("utf8"),
            "2024-01-22T14:00:00Z  cpu=0.50  memory=1024.00\n"
        );
    }

    #[test]
    fn context_snapshot_table() {
        let snapshot = ContextSnapshot {
            project: Some(ProjectRef::new("adam", "mnist").expect("valid project")),
            experiment: Some(3),
            job: Some(JobRef::Sequence(7)),
        };
        let output = OutputFormat::default().to_string(&snapshot).expect("render");
        assert!(output.contains("Project:     adam/mnist"));
        assert!(output.contains("Experiment:  3"));
        assert!(output.contains("Job:         7"));

        let empty = OutputFormat::default()
            .to_string(&ContextSnapshot::default())
            .expect("render");
        assert_eq!(empty, "No cached context\n");
    }

    #[test]
    fn dashboard_url_bare() {
        let url = DashboardUrl {
            url: "http://localhost:8000/app".into(),
            bare: true,
        };
        let output = OutputFormat::default().to_string(&url).expect("render");
        assert_eq!(output, "http://localhost:8000/app\n");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("hi", 2), "hi");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("experiment"), "Experiment");
        assert_eq!(capitalize(""), "");
    }
}
