//! The hash-linked JSONL audit chain (spec §4.12, §9).
//!
//! Each line is a JSON object `{time, eventType, ...payload, prevHash, hash}`.
//! `hash` is the SHA-256 of the canonical JSON of the entry minus `hash`
//! itself; `prevHash` is the previous line's `hash` (empty string for the
//! first line). Appends happen under an exclusive file lock so concurrent
//! writers on the same process never interleave partial lines, mirroring
//! the teacher's `SurrealKvAuditStorage` bridge from a sync storage trait
//! to async callers — here the sync side is `std::fs` + `fs2` rather than
//! `SurrealKV`, because spec §6 names the on-disk format explicitly
//! (`JSONL, UTF-8, LF line-terminated`) rather than leaving it to a KV
//! engine.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use kafclaw_crypto::canonical::canonicalize_excluding;
use kafclaw_crypto::ContentHash;
use serde_json::{Map, Value};

use crate::error::{AuditError, AuditResult};

/// A single chain-linked JSONL audit file.
#[derive(Debug, Clone)]
pub struct AuditChain {
    path: PathBuf,
}

impl AuditChain {
    /// Open (or create on first append) an audit chain backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file path backing this chain.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event to the chain, returning its computed hash.
    ///
    /// `payload` must serialize to a JSON object; its fields are merged
    /// alongside `time`/`eventType`/`prevHash` before hashing.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Io`] if the file cannot be locked or written,
    /// and [`AuditError::ChainCorrupted`] if the existing last line cannot
    /// be parsed (per spec §7, no automatic repair is attempted).
    pub async fn append(
        &self,
        event_type: impl Into<String>,
        payload: Value,
    ) -> AuditResult<ContentHash> {
        let path = self.path.clone();
        let event_type = event_type.into();
        tokio::task::spawn_blocking(move || Self::append_blocking(&path, &event_type, payload))
            .await
            .map_err(|e| AuditError::Io(std::io::Error::other(e)))?
    }

    fn append_blocking(
        path: &Path,
        event_type: &str,
        payload: Value,
    ) -> AuditResult<ContentHash> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        file.lock_exclusive()?;

        let prev_hash = Self::last_hash(&file)?;
        file.seek(SeekFrom::End(0))?;

        let mut object = match payload {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("payload".to_string(), other);
                map
            }
        };
        object.insert(
            "time".to_string(),
            Value::String(Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)),
        );
        object.insert("eventType".to_string(), Value::String(event_type.to_string()));
        object.insert(
            "prevHash".to_string(),
            Value::String(prev_hash.map(|h| h.to_hex()).unwrap_or_default()),
        );

        let unhashed = Value::Object(object.clone());
        let canonical = canonicalize_excluding(&unhashed, "hash")
            .map_err(|e| AuditError::Serialization(e.to_string()))?;
        let hash = ContentHash::hash(&canonical);

        object.insert("hash".to_string(), Value::String(hash.to_hex()));
        let line = serde_json::to_string(&Value::Object(object))
            .map_err(|e| AuditError::Serialization(e.to_string()))?;

        writeln!(file, "{line}")?;
        file.flush()?;
        fs2::FileExt::unlock(&file)?;
        Ok(hash)
    }

    /// Read the `hash` field of the last line in the file, if any.
    fn last_hash(file: &std::fs::File) -> AuditResult<Option<ContentHash>> {
        let mut reader = BufReader::new(file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;
        let mut last_line: Option<String> = None;
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            last_line = Some(line);
            let _ = idx;
        }
        match last_line {
            None => Ok(None),
            Some(line) => {
                let value: Value = serde_json::from_str(&line).map_err(|e| {
                    AuditError::ChainCorrupted {
                        line: 0,
                        reason: e.to_string(),
                    }
                })?;
                let hash_hex = value
                    .get("hash")
                    .and_then(Value::as_str)
                    .ok_or_else(|| AuditError::ChainCorrupted {
                        line: 0,
                        reason: "missing hash field".to_string(),
                    })?;
                let hash = ContentHash::from_hex(hash_hex).map_err(|e| AuditError::ChainCorrupted {
                    line: 0,
                    reason: e.to_string(),
                })?;
                Ok(Some(hash))
            }
        }
    }

    /// Read every entry back as parsed JSON, in file order.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Io`] on read failure.
    pub fn read_all(&self) -> AuditResult<Vec<Value>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut out = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(value) => out.push(value),
                Err(_) => continue,
            }
        }
        Ok(out)
    }
}

/// The outcome of [`verify_chain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainVerification {
    /// Every adjacent pair links correctly and every hash matches its
    /// recomputed canonical form.
    Valid,
    /// The first broken link was found at `line` (1-indexed).
    Broken {
        /// 1-indexed line where the chain breaks.
        line: usize,
        /// Human-readable reason.
        reason: String,
    },
}

/// Walk a JSONL audit file and verify the hash chain (spec §8 testable
/// property: "for every adjacent pair of lines, `L_{i+1}.prevHash ==
/// L_i.hash` and `L_i.hash == SHA-256(canonical(L_i - {hash}))`").
///
/// Not named as an operation in spec §4, but required to make that
/// property checkable (SPEC_FULL §11).
///
/// # Errors
///
/// Returns [`AuditError::Io`] if the file cannot be read.
pub fn verify_chain(path: &Path) -> AuditResult<ChainVerification> {
    let chain = AuditChain::new(path);
    let entries = chain.read_all()?;

    let mut expected_prev = String::new();
    for (idx, entry) in entries.iter().enumerate() {
        let line_no = idx + 1;
        let Some(object) = entry.as_object() else {
            return Ok(ChainVerification::Broken {
                line: line_no,
                reason: "entry is not a JSON object".to_string(),
            });
        };
        let Some(prev_hash) = object.get("prevHash").and_then(Value::as_str) else {
            return Ok(ChainVerification::Broken {
                line: line_no,
                reason: "missing prevHash field".to_string(),
            });
        };
        if prev_hash != expected_prev {
            return Ok(ChainVerification::Broken {
                line: line_no,
                reason: format!("prevHash {prev_hash} does not match prior hash {expected_prev}"),
            });
        }
        let Some(hash_hex) = object.get("hash").and_then(Value::as_str) else {
            return Ok(ChainVerification::Broken {
                line: line_no,
                reason: "missing hash field".to_string(),
            });
        };
        let canonical = match canonicalize_excluding(entry, "hash") {
            Ok(bytes) => bytes,
            Err(e) => {
                return Ok(ChainVerification::Broken {
                    line: line_no,
                    reason: e.to_string(),
                })
            }
        };
        let recomputed = ContentHash::hash(&canonical).to_hex();
        if recomputed != hash_hex {
            return Ok(ChainVerification::Broken {
                line: line_no,
                reason: "hash does not match recomputed canonical form".to_string(),
            });
        }
        expected_prev = hash_hex.to_string();
    }

    Ok(ChainVerification::Valid)
}

/// Parsed view of a chain entry's timestamp, for callers that only need
/// the time without deserializing the full payload.
#[must_use]
pub fn entry_time(entry: &Value) -> Option<DateTime<Utc>> {
    entry
        .get("time")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn first_entry_has_empty_prev_hash() {
        let dir = tempdir().unwrap();
        let chain = AuditChain::new(dir.path().join("audit.jsonl"));
        chain.append("test", json!({"a": 1})).await.unwrap();
        let entries = chain.read_all().unwrap();
        assert_eq!(entries[0]["prevHash"], "");
    }

    #[tokio::test]
    async fn chain_links_sequential_entries() {
        let dir = tempdir().unwrap();
        let chain = AuditChain::new(dir.path().join("audit.jsonl"));
        let h1 = chain.append("first", json!({"a": 1})).await.unwrap();
        chain.append("second", json!({"a": 2})).await.unwrap();
        let entries = chain.read_all().unwrap();
        assert_eq!(entries[1]["prevHash"], h1.to_hex());
    }

    #[tokio::test]
    async fn verify_chain_detects_valid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let chain = AuditChain::new(&path);
        for i in 0..5 {
            chain.append("ev", json!({"i": i})).await.unwrap();
        }
        assert_eq!(verify_chain(&path).unwrap(), ChainVerification::Valid);
    }

    #[tokio::test]
    async fn verify_chain_detects_tamper() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let chain = AuditChain::new(&path);
        chain.append("first", json!({"a": 1})).await.unwrap();
        chain.append("second", json!({"a": 2})).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines: Vec<String> = contents.lines().map(str::to_string).collect();
        let mut tampered: Value = serde_json::from_str(&lines[0]).unwrap();
        tampered["a"] = json!(999);
        lines[0] = serde_json::to_string(&tampered).unwrap();
        std::fs::write(&path, lines.join("\n") + "\n").unwrap();

        match verify_chain(&path).unwrap() {
            ChainVerification::Broken { line, .. } => assert_eq!(line, 1),
            ChainVerification::Valid => panic!("expected tamper to be detected"),
        }
    }

    #[tokio::test]
    async fn empty_file_is_valid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        assert_eq!(verify_chain(&path).unwrap(), ChainVerification::Valid);
    }
}
