use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use super::types::{AttributionTable, CommitId, CommitInfo};

/// Line limit used when the caller does not know the buffer length.
pub const DEFAULT_MAX_LINES: usize = 1_000_000;

/// `<sha> <orig_line> <final_line> <num_lines>`, single-space separated.
fn hunk_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([0-9a-f]{40}) (\d+) (\d+) (\d+)$").expect("hunk header pattern is valid")
    })
}

/// A parsed hunk header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HunkHeader<'a> {
    sha: &'a str,
    final_line: u32,
    num_lines: u32,
}

fn parse_hunk_header(line: &str) -> Option<HunkHeader<'_>> {
    let caps = hunk_header_re().captures(line)?;
    let sha = caps.get(1)?.as_str();
    // orig_line (group 2) only matters for tracking moved code, which we don't.
    let final_line = caps.get(3)?.as_str().parse().ok()?;
    let num_lines = caps.get(4)?.as_str().parse().ok()?;
    Some(HunkHeader {
        sha,
        final_line,
        num_lines,
    })
}

/// Builds an [`AttributionTable`] from blame lines.
///
/// The only state is the commit opened by the most recent hunk header;
/// metadata lines always apply to it.
struct BlameParser {
    table: AttributionTable,
    ids: HashMap<String, CommitId>,
    current: Option<CommitId>,
    /// Highest line number attributed, and the most attributions kept.
    max_lines: usize,
}

impl BlameParser {
    fn new(max_lines: usize) -> Self {
        BlameParser {
            table: AttributionTable::new(),
            ids: HashMap::new(),
            current: None,
            max_lines,
        }
    }

    fn commit_id(&mut self, sha: &str) -> CommitId {
        if let Some(&id) = self.ids.get(sha) {
            return id;
        }
        let id = self.table.insert_commit(CommitInfo::new(sha));
        self.ids.insert(sha.to_string(), id);
        id
    }

    fn open_hunk(&mut self, header: HunkHeader<'_>) {
        let id = self.commit_id(header.sha);
        self.current = Some(id);

        if self.table.commit(id).is_uncommitted() || header.final_line == 0 || header.num_lines == 0 {
            return;
        }

        // The count comes straight from the stream; never trust it beyond
        // the lines the caller can display.
        let max_line = u32::try_from(self.max_lines).unwrap_or(u32::MAX);
        let last = header
            .final_line
            .saturating_add(header.num_lines - 1)
            .min(max_line);
        for line_number in header.final_line..=last {
            if self.table.len() >= self.max_lines {
                break;
            }
            self.table.push_line(line_number, id);
        }
    }

    fn feed(&mut self, line: &str) {
        if let Some(header) = parse_hunk_header(line) {
            self.open_hunk(header);
            return;
        }

        let Some(id) = self.current else {
            return;
        };

        // `author-mail`, `author-time` and `author-tz` share the `author` prefix,
        // so the trailing space in each prefix matters.
        if let Some(val) = line.strip_prefix("author ") {
            self.table.commit_mut(id).author = val.trim().to_string();
        } else if let Some(val) = line.strip_prefix("author-time ") {
            if let Ok(time) = val.trim().parse() {
                self.table.commit_mut(id).author_time = time;
            }
        } else if let Some(val) = line.strip_prefix("summary ") {
            self.table.commit_mut(id).summary = Some(val.trim().to_string());
        }
    }

    fn finish(self) -> AttributionTable {
        self.table
    }
}

/// Parse `git blame --incremental` output into an [`AttributionTable`].
///
/// The incremental format looks like:
/// ```text
/// <40-char sha> <orig_line> <final_line> <num_lines>
/// author <name>
/// author-mail <<email>>
/// author-time <epoch>
/// author-tz <tz>
/// committer <name>
/// ...
/// summary <text>
/// previous <sha> <filename>
/// filename <path>
/// ```
///
/// Metadata is only printed the first time git mentions a commit, so later
/// hunks for the same sha are bare headers. Lines blamed on the all-zero
/// sha (uncommitted content) are left out of the table. Unrecognized lines
/// are skipped. At most [`DEFAULT_MAX_LINES`] lines are attributed.
pub fn parse_blame_output(input: &str) -> AttributionTable {
    parse_blame_limited(input, DEFAULT_MAX_LINES)
}

/// Like [`parse_blame_output`], but attributes no line past `max_lines`
/// (normally the buffer's line count).
pub fn parse_blame_limited(input: &str, max_lines: usize) -> AttributionTable {
    let mut parser = BlameParser::new(max_lines);
    for line in input.lines() {
        parser.feed(line);
    }
    parser.finish()
}

/// Byte-oriented variant of [`parse_blame_output`] for raw process output.
///
/// Invalid UTF-8 (e.g. a latin-1 author name) is replaced rather than
/// discarding the whole stream.
pub fn parse_blame_bytes(raw: &[u8]) -> AttributionTable {
    parse_blame_output(&String::from_utf8_lossy(raw))
}

/// Byte-oriented variant of [`parse_blame_limited`].
pub fn parse_blame_bytes_limited(raw: &[u8], max_lines: usize) -> AttributionTable {
    parse_blame_limited(&String::from_utf8_lossy(raw), max_lines)
}
