//! External filters for content types no tokenizer handles.
//!
//! A filter is a `mime:command` pair. The decoded bytes of a matching part
//! are written to a temporary file, the command runs on it, and its standard
//! output is indexed as plain text. `%f` in the command is replaced by the
//! temporary file's path; without one, the path is appended.

use std::io::Write;
use std::process::{Command, Stdio};

use tempfile::NamedTempFile;

use crate::error::{ExtractError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Lower-case MIME type, `type/*`, or `*`
    pattern: String,
    command: String,
}

impl Filter {
    /// Parse a `mime:command` pair.
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = |reason: &str| ExtractError::ConfigInvalid {
            field: "filter".to_string(),
            value: spec.to_string(),
            reason: reason.to_string(),
        };
        let (pattern, command) =
            spec.split_once(':').ok_or_else(|| invalid("expected mime:command"))?;
        let pattern = pattern.trim().to_ascii_lowercase();
        let command = command.trim();
        if pattern.is_empty() || (pattern != "*" && !pattern.contains('/')) {
            return Err(invalid("expected a MIME type such as application/pdf"));
        }
        if command.split_whitespace().next().is_none() {
            return Err(invalid("empty command"));
        }
        Ok(Self { pattern, command: command.to_string() })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn matches(&self, mime: &str) -> bool {
        let mime = mime.trim().to_ascii_lowercase();
        match self.pattern.strip_suffix("/*") {
            _ if self.pattern == "*" => true,
            Some(major) => mime.split_once('/').is_some_and(|(m, _)| m == major),
            None => mime == self.pattern,
        }
    }

    /// Run the command over `input` and return its standard output.
    pub fn run(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut file = NamedTempFile::new()?;
        file.write_all(input)?;
        file.flush()?;
        let path = file.path().to_string_lossy().into_owned();

        let mut words = self.command.split_whitespace();
        let program = words.next().ok_or_else(|| self.failure("empty command"))?;
        let mut args: Vec<String> = words.map(|w| w.replace("%f", &path)).collect();
        if !self.command.contains("%f") {
            args.push(path);
        }

        tracing::debug!(command = %self.command, bytes = input.len(), "Running filter");
        let output = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| self.failure(&e.to_string()))?;
        if !output.status.success() {
            return Err(self.failure(&output.status.to_string()));
        }
        Ok(output.stdout)
    }

    fn failure(&self, reason: &str) -> ExtractError {
        ExtractError::Filter { command: self.command.clone(), reason: reason.to_string() }
    }
}

/// Configured filters, first match wins.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    filters: Vec<Filter>,
}

impl FilterSet {
    pub const fn new(filters: Vec<Filter>) -> Self {
        Self { filters }
    }

    pub fn find(&self, mime: &str) -> Option<&Filter> {
        self.filters.iter().find(|f| f.matches(mime))
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
