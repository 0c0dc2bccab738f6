use serde::Serialize;

/// The hash git reports for lines that differ from every commit.
pub const UNCOMMITTED_HASH: &str = "0000000000000000000000000000000000000000";

/// Metadata for one commit referenced by the blame stream.
///
/// Fields are filled in as metadata lines arrive, so a record may be
/// incomplete while parsing is still in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitInfo {
    pub hash: String,
    pub author: String,
    /// Unix seconds; 0 when git never reported an `author-time`.
    pub author_time: i64,
    pub summary: Option<String>,
}

impl CommitInfo {
    pub fn new(hash: &str) -> Self {
        CommitInfo {
            hash: hash.to_string(),
            author: String::new(),
            author_time: 0,
            summary: None,
        }
    }

    pub fn is_uncommitted(&self) -> bool {
        self.hash == UNCOMMITTED_HASH
    }
}

/// Index of a [`CommitInfo`] inside an [`AttributionTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CommitId(pub(crate) usize);

/// One attributed source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineAttribution {
    /// 1-based line number in the blamed content.
    pub line_number: u32,
    pub commit: CommitId,
}

/// Per-line attribution for one blamed snapshot of a file.
///
/// Commits live in an arena and every line refers to its commit by
/// [`CommitId`], so all lines of the same commit observe the same record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttributionTable {
    commits: Vec<CommitInfo>,
    lines: Vec<LineAttribution>,
}

impl AttributionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert_commit(&mut self, commit: CommitInfo) -> CommitId {
        self.commits.push(commit);
        CommitId(self.commits.len() - 1)
    }

    pub(crate) fn commit_mut(&mut self, id: CommitId) -> &mut CommitInfo {
        &mut self.commits[id.0]
    }

    pub(crate) fn push_line(&mut self, line_number: u32, commit: CommitId) {
        self.lines.push(LineAttribution {
            line_number,
            commit,
        });
    }

    pub fn commit(&self, id: CommitId) -> &CommitInfo {
        &self.commits[id.0]
    }

    pub fn commits(&self) -> &[CommitInfo] {
        &self.commits
    }

    pub fn lines(&self) -> &[LineAttribution] {
        &self.lines
    }

    /// Look up the commit attributed to a 1-based line number.
    ///
    /// If git reported the same line twice, the later hunk wins.
    pub fn get(&self, line_number: u32) -> Option<&CommitInfo> {
        self.lines
            .iter()
            .rev()
            .find(|l| l.line_number == line_number)
            .map(|l| self.commit(l.commit))
    }

    /// Iterate `(line_number, commit)` pairs in stream order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &CommitInfo)> + '_ {
        self.lines
            .iter()
            .map(move |l| (l.line_number, self.commit(l.commit)))
    }

    /// Resolve attributions into a dense per-line vector of `total_lines`
    /// slots (index 0 is line 1). Lines outside the range are dropped.
    pub fn by_line(&self, total_lines: usize) -> Vec<Option<&CommitInfo>> {
        let mut slots = vec![None; total_lines];
        for (line_number, commit) in self.iter() {
            let idx = line_number as usize;
            if idx >= 1 && idx <= total_lines {
                slots[idx - 1] = Some(commit);
            }
        }
        slots
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> AttributionTable {
        let mut table = AttributionTable::new();
        let a = table.insert_commit(CommitInfo::new(&"a".repeat(40)));
        let b = table.insert_commit(CommitInfo::new(&"b".repeat(40)));
        table.commit_mut(a).author = "Alice".to_string();
        table.push_line(1, a);
        table.push_line(2, b);
        table.push_line(3, a);
        table
    }

    #[test]
    fn test_get_resolves_shared_commit() {
        let table = sample_table();
        assert_eq!(table.get(1).unwrap().author, "Alice");
        assert_eq!(table.get(3).unwrap().author, "Alice");
        assert_eq!(table.get(2).unwrap().author, "");
        assert!(table.get(4).is_none());
        assert!(std::ptr::eq(table.get(1).unwrap(), table.get(3).unwrap()));
    }

    #[test]
    fn test_by_line_drops_out_of_range() {
        let table = sample_table();
        let slots = table.by_line(2);
        assert_eq!(slots.len(), 2);
        assert!(slots[0].is_some());
        assert!(slots[1].is_some());

        let slots = table.by_line(5);
        assert!(slots[3].is_none());
        assert!(slots[4].is_none());
    }

    #[test]
    fn test_uncommitted_sentinel() {
        let commit = CommitInfo::new("abcdef0123456789abcdef0123456789abcdef01");
        assert!(!commit.is_uncommitted());
        assert!(CommitInfo::new(UNCOMMITTED_HASH).is_uncommitted());
    }

    #[test]
    fn test_serialize_shape() {
        let table = sample_table();
        let json: serde_json::Value = serde_json::to_value(&table).unwrap();
        assert_eq!(json["commits"].as_array().unwrap().len(), 2);
        assert_eq!(json["lines"][1]["lineNumber"], 2);
        assert_eq!(json["lines"][1]["commit"], 1);
        assert_eq!(json["commits"][0]["authorTime"], 0);
    }
}
