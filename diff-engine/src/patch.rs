//! Unified-diff utilities for change records.
//!
//! A minimal parser that understands `@@ -a,b +c,d @@` hunk headers and
//! classifies following lines as added/removed/context. Counters are not
//! validated strictly; they only seed line numbering. Binary patches are
//! detected heuristically and handled at a coarser granularity upstream.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Added { new_line: usize, content: String },
    Removed { old_line: usize, content: String },
    Context { old_line: usize, new_line: usize, content: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub old_start: usize,
    pub old_lines: usize,
    pub new_start: usize,
    pub new_lines: usize,
    pub lines: Vec<DiffLine>,
}

/// Heuristic to detect whether a diff text represents a binary patch.
///
/// Checks for common markers like `GIT binary patch`, `Binary files differ`
/// and the presence of NUL bytes.
pub fn looks_like_binary_patch(diff: &str) -> bool {
    if diff.contains("GIT binary patch") {
        return true;
    }
    if diff.contains("Binary files") || diff.contains("Files ") && diff.contains(" differ") {
        return true;
    }
    diff.bytes().any(|b| b == 0)
}

/// Parse a unified diff text into hunks.
pub fn parse_unified_diff(diff: &str) -> Vec<DiffHunk> {
    let mut hunks: Vec<DiffHunk> = Vec::new();
    let mut current: Option<DiffHunk> = None;
    let mut old_line = 0usize;
    let mut new_line = 0usize;

    for line in diff.lines() {
        if let Some(rest) = line.strip_prefix("@@") {
            if let Some(h) = current.take() {
                hunks.push(h);
            }
            match parse_hunk_header(rest) {
                Some((old_start, old_lines, new_start, new_lines)) => {
                    old_line = old_start;
                    new_line = new_start;
                    current = Some(DiffHunk {
                        old_start,
                        old_lines,
                        new_start,
                        new_lines,
                        lines: Vec::new(),
                    });
                }
                // invalid header: skip quietly rather than failing the build
                None => continue,
            }
        } else if let Some(hunk) = current.as_mut() {
            if let Some(content) = line.strip_prefix('+') {
                hunk.lines.push(DiffLine::Added {
                    new_line,
                    content: content.to_owned(),
                });
                new_line += 1;
            } else if let Some(content) = line.strip_prefix('-') {
                hunk.lines.push(DiffLine::Removed {
                    old_line,
                    content: content.to_owned(),
                });
                old_line += 1;
            } else if line.starts_with(' ') || line.is_empty() {
                let content = line.strip_prefix(' ').unwrap_or("").to_owned();
                hunk.lines.push(DiffLine::Context {
                    old_line,
                    new_line,
                    content,
                });
                old_line += 1;
                new_line += 1;
            }
            // "\ No newline at end of file" and similar markers are skipped
        }
    }
    if let Some(h) = current.take() {
        hunks.push(h);
    }
    hunks
}

/// Added/removed line totals across all hunks, for diagnostics.
pub fn change_counts(diff: &str) -> (usize, usize) {
    let mut added = 0usize;
    let mut removed = 0usize;
    for hunk in parse_unified_diff(diff) {
        for line in &hunk.lines {
            match line {
                DiffLine::Added { .. } => added += 1,
                DiffLine::Removed { .. } => removed += 1,
                DiffLine::Context { .. } => {}
            }
        }
    }
    (added, removed)
}

/// Header body after `@@`: ` -a,b +c,d @@ optional`.
fn parse_hunk_header(rest: &str) -> Option<(usize, usize, usize, usize)> {
    let rest = rest.trim_start();
    let old = rest.strip_prefix('-')?;
    let (old_part, rest) = old.split_once(' ')?;
    let new = rest.trim_start().strip_prefix('+')?;
    let new_part = new.split(' ').next()?.trim_end_matches('@').trim();

    let (old_start, old_lines) = parse_range(old_part)?;
    let (new_start, new_lines) = parse_range(new_part)?;
    Some((old_start, old_lines, new_start, new_lines))
}

fn parse_range(part: &str) -> Option<(usize, usize)> {
    match part.split_once(',') {
        Some((start, lines)) => Some((start.parse().ok()?, lines.parse().ok()?)),
        None => Some((part.parse().ok()?, 1)),
    }
}
