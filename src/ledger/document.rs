//! Lossless ledger document
//!
//! The ledger is YAML, but serde_yaml drops comments and re-flows everything it
//! emits. Hand-written ledgers carry comments we must not lose, so the file is kept
//! as a list of line nodes. Only the entries of the top-level `versions` mapping
//! are understood; every other line (comments included) is carried verbatim and
//! written back byte for byte.

use crate::core::error::{KaeterResult, ValidationError};
use std::path::Path;

const VERSIONS_KEY: &str = "versions";
const DEFAULT_ENTRY_INDENT: &str = "  ";

/// A single physical line of the document (line terminator included)
#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
  /// Carried as-is
  Verbatim(String),
  /// The `versions:` header
  VersionsKey { raw: String, inline_empty: bool },
  /// One `<version>: <metadata>` line below the header
  Entry(EntryNode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct EntryNode {
  raw: String,
  indent: String,
  key: String,
  value: String,
}

impl EntryNode {
  fn render(indent: &str, key: &str, value: &str, eol: &str) -> Self {
    Self {
      raw: format!("{}{}: {}{}", indent, quote_if_needed(key), value, eol),
      indent: indent.to_string(),
      key: key.to_string(),
      value: value.to_string(),
    }
  }

  fn eol(&self) -> &str {
    line_ending(&self.raw)
  }
}

/// Requested content of one versions entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryUpdate {
  /// Entry exists and is semantically unchanged; keep its original line
  Keep { key: String },
  /// Entry must be (re)written with this value
  Set { key: String, value: String },
}

impl EntryUpdate {
  fn key(&self) -> &str {
    match self {
      EntryUpdate::Keep { key } | EntryUpdate::Set { key, .. } => key,
    }
  }
}

/// Comment-preserving view of a ledger file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerDocument {
  nodes: Vec<Node>,
}

impl LedgerDocument {
  /// Split `text` into nodes
  pub fn parse(text: &str, origin: &Path) -> KaeterResult<Self> {
    let invalid = |reason: String| ValidationError::InvalidLedger {
      path: origin.to_path_buf(),
      reason,
    };

    let mut nodes = Vec::new();
    let mut in_versions = false;
    let mut seen_versions = false;

    for raw in text.split_inclusive('\n') {
      let line = strip_line_ending(raw);
      let trimmed = line.trim_start();
      let is_trivia = trimmed.is_empty() || trimmed.starts_with('#');
      let is_indented = trimmed.len() != line.len();

      if in_versions {
        if is_trivia {
          nodes.push(Node::Verbatim(raw.to_string()));
          continue;
        }
        if is_indented {
          let entry = parse_entry(raw, line).ok_or_else(|| invalid(format!("unexpected line in versions: '{}'", line)))?;
          nodes.push(Node::Entry(entry));
          continue;
        }
        in_versions = false;
      }

      if !is_indented
        && let Some(rest) = top_level_value(line, VERSIONS_KEY)
      {
        if seen_versions {
          return Err(invalid("duplicate 'versions' key".to_string()).into());
        }
        seen_versions = true;
        let value = strip_comment(rest).trim();
        match value {
          "" => {
            in_versions = true;
            nodes.push(Node::VersionsKey {
              raw: raw.to_string(),
              inline_empty: false,
            });
          }
          "{}" => nodes.push(Node::VersionsKey {
            raw: raw.to_string(),
            inline_empty: true,
          }),
          _ => {
            return Err(invalid("the versions mapping must be written in block style".to_string()).into());
          }
        }
        continue;
      }

      nodes.push(Node::Verbatim(raw.to_string()));
    }

    Ok(Self { nodes })
  }

  /// Whether a top-level `versions` key exists
  pub fn has_versions(&self) -> bool {
    self.nodes.iter().any(|n| matches!(n, Node::VersionsKey { .. }))
  }

  /// `(version, metadata)` pairs in document order, quotes removed
  pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
    self.nodes.iter().filter_map(|n| match n {
      Node::Entry(e) => Some((e.key.as_str(), e.value.as_str())),
      _ => None,
    })
  }

  /// Replace the versions mapping's entries
  ///
  /// Entries keep their position and original line when marked `Keep`, are rewritten
  /// in place when `Set` targets an existing key, and new keys are appended right
  /// after the last existing entry. Entries not mentioned are removed. Nothing
  /// outside the mapping is touched.
  pub fn replace_versions(&mut self, updates: &[EntryUpdate]) {
    if !self.has_versions() {
      if let Some(Node::Verbatim(last)) = self.nodes.last_mut()
        && !last.ends_with('\n')
      {
        last.push('\n');
      }
      self.nodes.push(Node::VersionsKey {
        raw: format!("{}:\n", VERSIONS_KEY),
        inline_empty: false,
      });
    }

    let eol = self.dominant_line_ending().to_string();
    let indent = self
      .nodes
      .iter()
      .find_map(|n| match n {
        Node::Entry(e) => Some(e.indent.clone()),
        _ => None,
      })
      .unwrap_or_else(|| DEFAULT_ENTRY_INDENT.to_string());

    // Rewrite or drop existing entries.
    let mut kept: Vec<String> = Vec::new();
    self.nodes.retain_mut(|node| {
      let Node::Entry(entry) = node else {
        return true;
      };
      match updates.iter().find(|u| u.key() == entry.key) {
        None => false,
        Some(EntryUpdate::Keep { key }) => {
          kept.push(key.clone());
          true
        }
        Some(EntryUpdate::Set { key, value }) => {
          let line_eol = entry.eol().to_string();
          *entry = EntryNode::render(&entry.indent.clone(), key, value, &line_eol);
          kept.push(key.clone());
          true
        }
      }
    });

    let additions: Vec<&EntryUpdate> = updates.iter().filter(|u| !kept.iter().any(|k| k == u.key())).collect();
    if additions.is_empty() {
      return;
    }

    // New entries go after the last entry, or right below the header.
    let anchor = self
      .nodes
      .iter()
      .rposition(|n| matches!(n, Node::Entry(_)))
      .or_else(|| self.nodes.iter().position(|n| matches!(n, Node::VersionsKey { .. })))
      .unwrap_or(self.nodes.len().saturating_sub(1));

    match &mut self.nodes[anchor] {
      Node::VersionsKey { raw, inline_empty } => {
        if *inline_empty {
          let line_eol = line_ending(raw).to_string();
          let comment = comment_of(strip_line_ending(raw)).map(|c| format!(" {}", c)).unwrap_or_default();
          *raw = format!("{}:{}{}", VERSIONS_KEY, comment, if line_eol.is_empty() { &eol } else { &line_eol });
          *inline_empty = false;
        } else if !raw.ends_with('\n') {
          raw.push_str(&eol);
        }
      }
      Node::Entry(entry) => {
        if !entry.raw.ends_with('\n') {
          entry.raw.push_str(&eol);
        }
      }
      Node::Verbatim(raw) => {
        if !raw.ends_with('\n') {
          raw.push_str(&eol);
        }
      }
    }

    let new_nodes = additions.into_iter().map(|u| {
      let value = match u {
        EntryUpdate::Set { value, .. } => value.as_str(),
        EntryUpdate::Keep { .. } => "",
      };
      Node::Entry(EntryNode::render(&indent, u.key(), value, &eol))
    });
    self.nodes.splice(anchor + 1..anchor + 1, new_nodes);
  }

  /// Render back to text
  pub fn render(&self) -> String {
    let mut out = String::new();
    for node in &self.nodes {
      match node {
        Node::Verbatim(raw) | Node::VersionsKey { raw, .. } => out.push_str(raw),
        Node::Entry(e) => out.push_str(&e.raw),
      }
    }
    out
  }

  fn dominant_line_ending(&self) -> &'static str {
    let crlf = self.nodes.iter().any(|n| match n {
      Node::Verbatim(raw) | Node::VersionsKey { raw, .. } => raw.ends_with("\r\n"),
      Node::Entry(e) => e.raw.ends_with("\r\n"),
    });
    if crlf { "\r\n" } else { "\n" }
  }
}

fn parse_entry(raw: &str, line: &str) -> Option<EntryNode> {
  let content = line.trim_start();
  let indent = &line[..line.len() - content.len()];
  let (key, rest) = split_key(content)?;
  let value = strip_comment(rest).trim();
  if key.is_empty() || value.is_empty() {
    return None;
  }
  Some(EntryNode {
    raw: raw.to_string(),
    indent: indent.to_string(),
    key: unquote(key),
    value: unquote(value),
  })
}

/// Split `key: value`, honouring a quoted key
fn split_key(content: &str) -> Option<(&str, &str)> {
  let first = content.chars().next()?;
  if first == '"' || first == '\'' {
    let close = content[1..].find(first)? + 1;
    let after = &content[close + 1..];
    let rest = after.trim_start().strip_prefix(':')?;
    return Some((&content[..=close], rest));
  }
  let idx = content.find(':')?;
  Some((content[..idx].trim_end(), &content[idx + 1..]))
}

/// `<key>: value` at column 0
fn top_level_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
  let rest = line.strip_prefix(key)?;
  let rest = rest.trim_start_matches([' ', '\t']);
  rest.strip_prefix(':')
}

fn strip_comment(value: &str) -> &str {
  if value.trim_start().starts_with('#') {
    return "";
  }
  match value.find(" #") {
    Some(idx) => &value[..idx],
    None => value,
  }
}

fn comment_of(line: &str) -> Option<&str> {
  line.find(" #").map(|idx| line[idx + 1..].trim_end())
}

fn unquote(s: &str) -> String {
  let bytes = s.as_bytes();
  if bytes.len() >= 2 {
    if bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"' {
      return s[1..s.len() - 1].replace("\\\"", "\"").replace("\\\\", "\\");
    }
    if bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\'' {
      return s[1..s.len() - 1].replace("''", "'");
    }
  }
  s.to_string()
}

/// Keys YAML would read as something other than a plain string
fn quote_if_needed(key: &str) -> String {
  let plain_safe = key
    .chars()
    .next()
    .map(|c| c.is_ascii_alphanumeric())
    .unwrap_or(false)
    && key.parse::<f64>().is_err()
    && !matches!(key, "true" | "false" | "null" | "yes" | "no" | "on" | "off");
  if plain_safe {
    key.to_string()
  } else {
    format!("\"{}\"", key.replace('\\', "\\\\").replace('"', "\\\""))
  }
}

fn strip_line_ending(raw: &str) -> &str {
  raw.strip_suffix("\r\n").or_else(|| raw.strip_suffix('\n')).unwrap_or(raw)
}

fn line_ending(raw: &str) -> &str {
  if raw.ends_with("\r\n") {
    "\r\n"
  } else if raw.ends_with('\n') {
    "\n"
  } else {
    ""
  }
}
