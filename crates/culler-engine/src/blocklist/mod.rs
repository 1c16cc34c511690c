//! Blocklist compiler and published per-provider sets.
//!
//! # Design
//! - Each queue provider type owns one compiled set, keyed by a SHA-256
//!   fingerprint of its source and mode; a changed source reloads only its set.
//! - Every set is rebuilt once the reload interval elapses.
//! - Compilation fans out over a fixed number of blocking workers and the new
//!   set is published with a single swap once every chunk is done.
//! - A failed fetch leaves the previously published set untouched.

pub mod evaluator;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use culler_config::{BlocklistMode, ContentBlockerConfig, InstanceType};
use culler_events::{Event, EventSink};
use culler_telemetry::Metrics;
use regex::{Regex, RegexBuilder};
use sha2::{Digest, Sha256};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::BlocklistError;

/// Interval after which every blocklist is rebuilt.
pub const RELOAD_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);
/// Number of blocking workers used to compile one blocklist.
pub const COMPILE_WORKERS: usize = 5;

const REGEX_PREFIX: &str = "regex:";

/// How a literal pattern is compared with a filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    /// Whole filename.
    Exact,
    /// Pattern ended with `*`.
    StartsWith,
    /// Pattern started with `*`.
    EndsWith,
    /// Pattern started and ended with `*`.
    Contains,
}

/// Literal blocklist entry, compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlocklistPattern {
    kind: MatchKind,
    needle: String,
}

impl BlocklistPattern {
    /// Parse one blocklist line; blank lines yield `None`.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (leading, rest) = match line.strip_prefix('*') {
            Some(rest) => (true, rest),
            None => (false, line),
        };
        let (trailing, needle) = match rest.strip_suffix('*') {
            Some(needle) => (true, needle),
            None => (false, rest),
        };
        let kind = match (leading, trailing) {
            (true, true) => MatchKind::Contains,
            (true, false) => MatchKind::EndsWith,
            (false, true) => MatchKind::StartsWith,
            (false, false) => MatchKind::Exact,
        };
        Some(Self {
            kind,
            needle: needle.to_lowercase(),
        })
    }

    /// Comparison applied by this pattern.
    #[must_use]
    pub const fn kind(&self) -> MatchKind {
        self.kind
    }

    /// Lowercased text without wildcards.
    #[must_use]
    pub fn needle(&self) -> &str {
        &self.needle
    }

    /// Whether the pattern matches `filename` (case-insensitive).
    #[must_use]
    pub fn matches(&self, filename: &str) -> bool {
        self.matches_lowercase(&filename.to_lowercase())
    }

    pub(crate) fn matches_lowercase(&self, lowered: &str) -> bool {
        match self.kind {
            MatchKind::Exact => lowered == self.needle,
            MatchKind::StartsWith => lowered.starts_with(&self.needle),
            MatchKind::EndsWith => lowered.ends_with(&self.needle),
            MatchKind::Contains => lowered.contains(&self.needle),
        }
    }
}

/// Published blocklist for one queue provider type.
#[derive(Debug, Clone)]
pub struct CompiledBlocklist {
    /// List semantics.
    pub mode: BlocklistMode,
    /// Literal patterns.
    pub patterns: Arc<[BlocklistPattern]>,
    /// Case-insensitive regular expressions.
    pub regexes: Arc<[Regex]>,
    /// Fingerprint of the source and mode this set was built from.
    pub fingerprint: String,
}

impl Default for CompiledBlocklist {
    fn default() -> Self {
        Self {
            mode: BlocklistMode::Blacklist,
            patterns: Arc::from(Vec::new()),
            regexes: Arc::from(Vec::new()),
            fingerprint: String::new(),
        }
    }
}

impl CompiledBlocklist {
    /// Number of compiled entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len() + self.regexes.len()
    }

    /// Whether the set has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `filename` is wanted under this set.
    #[must_use]
    pub fn is_valid(&self, filename: &str) -> bool {
        evaluator::is_valid(filename, self.mode, &self.patterns, &self.regexes)
    }
}

/// Loads, compiles, and publishes blocklists per queue provider type.
pub struct BlocklistProvider {
    sets: RwLock<HashMap<InstanceType, Arc<CompiledBlocklist>>>,
    last_full_load: Mutex<Option<Instant>>,
    load_gate: tokio::sync::Mutex<()>,
    http: reqwest::Client,
    reload_interval: Duration,
    events: Arc<dyn EventSink>,
    metrics: Metrics,
}

impl BlocklistProvider {
    /// Create a provider with nothing published.
    #[must_use]
    pub fn new(events: Arc<dyn EventSink>, metrics: Metrics) -> Self {
        Self {
            sets: RwLock::new(HashMap::new()),
            last_full_load: Mutex::new(None),
            load_gate: tokio::sync::Mutex::new(()),
            http: reqwest::Client::new(),
            reload_interval: RELOAD_INTERVAL,
            events,
            metrics,
        }
    }

    /// Override the full reload interval.
    #[must_use]
    pub const fn with_reload_interval(mut self, interval: Duration) -> Self {
        self.reload_interval = interval;
        self
    }

    /// Reload every enabled blocklist that is stale or whose source changed.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or fetched; sets loaded
    /// before the failure stay published, the failing one keeps its previous
    /// content.
    pub async fn load(
        &self,
        config: &ContentBlockerConfig,
        timeout: Duration,
    ) -> Result<(), BlocklistError> {
        let _gate = self.load_gate.lock().await;
        let now = Instant::now();
        let interval_elapsed = self
            .last_full_load
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none_or(|loaded_at| now.duration_since(loaded_at) >= self.reload_interval);

        for instance_type in InstanceType::ALL {
            let settings = config.blocklist(instance_type);
            if !settings.enabled {
                continue;
            }
            let Some(source) = settings
                .path
                .as_deref()
                .map(str::trim)
                .filter(|path| !path.is_empty())
            else {
                continue;
            };

            let fingerprint = fingerprint(source, settings.mode);
            if !interval_elapsed && self.snapshot(instance_type).fingerprint == fingerprint {
                debug!(instance_type = instance_type.as_str(), "blocklist unchanged");
                continue;
            }

            let contents = self.fetch(source, timeout).await?;
            let compiled = compile(&contents, settings.mode, fingerprint).await?;
            self.publish(instance_type, compiled);
        }

        if interval_elapsed {
            *self
                .last_full_load
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(now);
        }
        Ok(())
    }

    /// Published set for a provider type (empty blacklist if never loaded).
    #[must_use]
    pub fn snapshot(&self, instance_type: InstanceType) -> Arc<CompiledBlocklist> {
        self.sets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&instance_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Published literal patterns.
    #[must_use]
    pub fn patterns(&self, instance_type: InstanceType) -> Arc<[BlocklistPattern]> {
        Arc::clone(&self.snapshot(instance_type).patterns)
    }

    /// Published regular expressions.
    #[must_use]
    pub fn regexes(&self, instance_type: InstanceType) -> Arc<[Regex]> {
        Arc::clone(&self.snapshot(instance_type).regexes)
    }

    /// Published list mode.
    #[must_use]
    pub fn mode(&self, instance_type: InstanceType) -> BlocklistMode {
        self.snapshot(instance_type).mode
    }

    async fn fetch(&self, source: &str, timeout: Duration) -> Result<String, BlocklistError> {
        if source.starts_with("http://") || source.starts_with("https://") {
            let fetch_err = |source_err| BlocklistError::Fetch {
                url: source.to_string(),
                source: source_err,
            };
            let response = self
                .http
                .get(source)
                .timeout(timeout)
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(fetch_err)?;
            return response.text().await.map_err(fetch_err);
        }

        tokio::fs::read_to_string(source)
            .await
            .map_err(|err| BlocklistError::Read {
                path: PathBuf::from(source),
                source: err,
            })
    }

    fn publish(&self, instance_type: InstanceType, compiled: CompiledBlocklist) {
        let patterns = compiled.patterns.len();
        let regexes = compiled.regexes.len();
        self.sets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(instance_type, Arc::new(compiled));

        self.metrics
            .set_blocklist_entries(instance_type.as_str(), patterns + regexes);
        if let Err(err) = self.events.emit(Event::BlocklistReloaded {
            instance_type: instance_type.as_str().to_string(),
            patterns,
            regexes,
        }) {
            warn!(error = %err, "failed to publish blocklist reload event");
        }
        info!(
            instance_type = instance_type.as_str(),
            patterns, regexes, "blocklist loaded"
        );
    }
}

fn fingerprint(source: &str, mode: BlocklistMode) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"|");
    hasher.update(mode.as_str().as_bytes());
    format!("{:x}", hasher.finalize())
}

async fn compile(
    contents: &str,
    mode: BlocklistMode,
    fingerprint: String,
) -> Result<CompiledBlocklist, BlocklistError> {
    let lines: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect();
    let chunk_size = lines.len().div_ceil(COMPILE_WORKERS).max(1);

    let mut workers = JoinSet::new();
    for (index, chunk) in lines.chunks(chunk_size).map(<[String]>::to_vec).enumerate() {
        workers.spawn_blocking(move || (index, compile_chunk(&chunk)));
    }

    let mut parts = Vec::with_capacity(COMPILE_WORKERS);
    while let Some(joined) = workers.join_next().await {
        parts.push(joined.map_err(|source| BlocklistError::Task { source })?);
    }
    parts.sort_by_key(|(index, _)| *index);

    let mut patterns = Vec::with_capacity(lines.len());
    let mut regexes = Vec::new();
    for (_, (chunk_patterns, chunk_regexes)) in parts {
        patterns.extend(chunk_patterns);
        regexes.extend(chunk_regexes);
    }

    Ok(CompiledBlocklist {
        mode,
        patterns: Arc::from(patterns),
        regexes: Arc::from(regexes),
        fingerprint,
    })
}

fn compile_chunk(lines: &[String]) -> (Vec<BlocklistPattern>, Vec<Regex>) {
    let mut patterns = Vec::new();
    let mut regexes = Vec::new();
    for line in lines {
        if let Some(expression) = line.strip_prefix(REGEX_PREFIX) {
            match RegexBuilder::new(expression.trim())
                .case_insensitive(true)
                .build()
            {
                Ok(regex) => regexes.push(regex),
                Err(err) => warn!(pattern = expression, error = %err, "skipping invalid blocklist regex"),
            }
        } else if let Some(pattern) = BlocklistPattern::parse(line) {
            patterns.push(pattern);
        }
    }
    (patterns, regexes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcards_select_match_kind() {
        let cases = [
            ("*.nfo", MatchKind::EndsWith, ".nfo"),
            ("Sample*", MatchKind::StartsWith, "sample"),
            ("*proof*", MatchKind::Contains, "proof"),
            ("readme.txt", MatchKind::Exact, "readme.txt"),
        ];
        for (line, kind, needle) in cases {
            let pattern = BlocklistPattern::parse(line);
            assert_eq!(pattern.as_ref().map(BlocklistPattern::kind), Some(kind));
            assert_eq!(pattern.as_ref().map(BlocklistPattern::needle), Some(needle));
        }
        assert!(BlocklistPattern::parse("   ").is_none());
    }

    #[test]
    fn fingerprint_depends_on_source_and_mode() {
        let a = fingerprint("/lists/a.txt", BlocklistMode::Blacklist);
        assert_eq!(a, fingerprint("/lists/a.txt", BlocklistMode::Blacklist));
        assert_ne!(a, fingerprint("/lists/a.txt", BlocklistMode::Whitelist));
        assert_ne!(a, fingerprint("/lists/b.txt", BlocklistMode::Blacklist));
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn invalid_regex_lines_are_skipped() -> Result<(), BlocklistError> {
        let compiled = compile(
            "regex:(unclosed\n\n  *.nfo  \nregex:^sample\\.",
            BlocklistMode::Blacklist,
            String::new(),
        )
        .await?;
        assert_eq!(compiled.patterns.len(), 1);
        assert_eq!(compiled.regexes.len(), 1);
        assert!(!compiled.is_valid("SAMPLE.mkv"));
        assert!(!compiled.is_valid("movie.nfo"));
        assert!(compiled.is_valid("movie.mkv"));
        Ok(())
    }

    #[tokio::test]
    async fn chunked_compilation_keeps_line_order() -> Result<(), BlocklistError> {
        let contents: String = (0..23).map(|index| format!("file{index}.bin\n")).collect();
        let compiled = compile(&contents, BlocklistMode::Blacklist, String::new()).await?;
        let needles: Vec<&str> = compiled.patterns.iter().map(BlocklistPattern::needle).collect();
        let expected: Vec<String> = (0..23).map(|index| format!("file{index}.bin")).collect();
        assert_eq!(needles, expected);
        Ok(())
    }
}
