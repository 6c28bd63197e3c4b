use crate::error::{GitError, GitResult};
use crate::git::gateway::{CommitRecord, CommitSummary, FileLists, RemoteEntry, RenamedFile};

/// Field separator used in `--format` strings (ASCII unit separator)
pub const FIELD_SEP: char = '\x1f';
/// Record separator used in `--format` strings (ASCII record separator)
pub const RECORD_SEP: char = '\x1e';

/// `git log` format matching [`parse_log`]
pub const LOG_FORMAT: &str = "--format=%H%x1f%h%x1f%an%x1f%ae%x1f%aI%x1f%D%x1f%s%x1f%b%x1e";

/// Parsed `git status --porcelain=v2 --branch -z`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PorcelainStatus {
    /// None when HEAD is detached
    pub head: Option<String>,
    pub upstream: Option<String>,
    pub entries: Vec<StatusEntry>,
}

/// One changed path from porcelain v2 output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub kind: EntryKind,
    /// Index-side status letter, `.` when unchanged
    pub index: char,
    /// Worktree-side status letter, `.` when unchanged
    pub worktree: char,
    pub path: String,
    /// Source path of a rename or copy
    pub orig_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Ordinary,
    RenamedOrCopied,
    Unmerged,
    Untracked,
}

/// Parse `git status --porcelain=v2 --branch -z` output
pub fn parse_status_porcelain_v2(output: &str) -> GitResult<PorcelainStatus> {
    let mut status = PorcelainStatus::default();
    let mut records = output.split('\0');

    while let Some(record) = records.next() {
        if record.is_empty() {
            continue;
        }

        if let Some(header) = record.strip_prefix("# ") {
            if let Some(head) = header.strip_prefix("branch.head ") {
                status.head = (head != "(detached)").then(|| head.to_string());
            } else if let Some(upstream) = header.strip_prefix("branch.upstream ") {
                status.upstream = Some(upstream.to_string());
            }
            continue;
        }

        match record.as_bytes()[0] {
            b'1' => {
                // 1 <XY> <sub> <mH> <mI> <mW> <hH> <hI> <path>
                let fields: Vec<&str> = record.splitn(9, ' ').collect();
                let (index, worktree) = xy(record, &fields)?;
                status.entries.push(StatusEntry {
                    kind: EntryKind::Ordinary,
                    index,
                    worktree,
                    path: field(record, &fields, 8)?.to_string(),
                    orig_path: None,
                });
            }
            b'2' => {
                // 2 <XY> <sub> <mH> <mI> <mW> <hH> <hI> <X><score> <path>\0<origPath>
                let fields: Vec<&str> = record.splitn(10, ' ').collect();
                let (index, worktree) = xy(record, &fields)?;
                let orig = records.next().ok_or_else(|| {
                    GitError::ParseError(format!("Rename entry without source path: {}", record))
                })?;
                status.entries.push(StatusEntry {
                    kind: EntryKind::RenamedOrCopied,
                    index,
                    worktree,
                    path: field(record, &fields, 9)?.to_string(),
                    orig_path: Some(orig.to_string()),
                });
            }
            b'u' => {
                // u <XY> <sub> <m1> <m2> <m3> <mW> <h1> <h2> <h3> <path>
                let fields: Vec<&str> = record.splitn(11, ' ').collect();
                let (index, worktree) = xy(record, &fields)?;
                status.entries.push(StatusEntry {
                    kind: EntryKind::Unmerged,
                    index,
                    worktree,
                    path: field(record, &fields, 10)?.to_string(),
                    orig_path: None,
                });
            }
            b'?' => {
                let path = record.get(2..).unwrap_or_default();
                status.entries.push(StatusEntry {
                    kind: EntryKind::Untracked,
                    index: '?',
                    worktree: '?',
                    path: path.to_string(),
                    orig_path: None,
                });
            }
            // Ignored files (`!`) and unknown record types
            _ => {}
        }
    }

    Ok(status)
}

fn field<'a>(record: &str, fields: &[&'a str], idx: usize) -> GitResult<&'a str> {
    fields
        .get(idx)
        .copied()
        .ok_or_else(|| GitError::ParseError(format!("Truncated status entry: {}", record)))
}

fn xy(record: &str, fields: &[&str]) -> GitResult<(char, char)> {
    let mut chars = field(record, fields, 1)?.chars();
    match (chars.next(), chars.next()) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(GitError::ParseError(format!("Malformed XY field: {}", record))),
    }
}

/// Sort porcelain entries into the per-category lists of a status snapshot
pub fn categorize(entries: &[StatusEntry]) -> FileLists {
    let mut files = FileLists::default();

    for entry in entries {
        match entry.kind {
            EntryKind::Untracked => {
                files.untracked.push(entry.path.clone());
                continue;
            }
            EntryKind::Unmerged => {
                files.conflicted.push(entry.path.clone());
                continue;
            }
            EntryKind::RenamedOrCopied => {
                let from = entry.orig_path.clone().unwrap_or_default();
                if entry.index == 'C' {
                    files.added.push(entry.path.clone());
                } else {
                    files.renamed.push(RenamedFile {
                        from,
                        to: entry.path.clone(),
                    });
                }
            }
            EntryKind::Ordinary => {}
        }

        if entry.index != '.' {
            files.staged.push(entry.path.clone());
        }
        if entry.index == 'A' || entry.worktree == 'A' {
            files.added.push(entry.path.clone());
        }
        if entry.index == 'M' || entry.worktree == 'M' || entry.index == 'T' || entry.worktree == 'T' {
            files.modified.push(entry.path.clone());
        }
        if entry.index == 'D' || entry.worktree == 'D' {
            files.deleted.push(entry.path.clone());
        }
    }

    files
}

/// Parse `git log` output produced with [`LOG_FORMAT`]
pub fn parse_log(output: &str) -> GitResult<Vec<CommitRecord>> {
    let mut commits = Vec::new();

    for record in output.split(RECORD_SEP) {
        let record = record.trim_start_matches('\n');
        if record.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = record.splitn(8, FIELD_SEP).collect();
        if fields.len() < 7 {
            return Err(GitError::ParseError(format!(
                "Expected at least 7 log fields, got {}",
                fields.len()
            )));
        }

        commits.push(CommitRecord {
            hash: fields[0].to_string(),
            short_hash: fields[1].to_string(),
            author: fields[2].to_string(),
            email: fields[3].to_string(),
            date: fields[4].to_string(),
            refs: fields[5].to_string(),
            message: fields[6].to_string(),
            body: fields.get(7).map(|b| b.trim_end().to_string()).unwrap_or_default(),
        });
    }

    Ok(commits)
}

/// Parse `git for-each-ref --format=%(refname) <prefix>` into short names
///
/// Symbolic `<remote>/HEAD` entries are skipped.
pub fn parse_ref_names(output: &str, prefix: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix(prefix))
        .filter(|name| !name.is_empty() && !name.ends_with("/HEAD"))
        .map(str::to_string)
        .collect()
}

/// Parse `git remote -v` output, preserving first-seen order
pub fn parse_remotes(output: &str) -> Vec<RemoteEntry> {
    let mut remotes: Vec<RemoteEntry> = Vec::new();

    for line in output.lines() {
        // origin\thttps://example.com/repo.git (fetch)
        let Some((name, rest)) = line.split_once('\t') else {
            continue;
        };
        let (url, direction) = match rest.rsplit_once(' ') {
            Some((url, direction)) => (url, direction),
            None => (rest, ""),
        };

        let idx = match remotes.iter().position(|r| r.name == name) {
            Some(idx) => idx,
            None => {
                remotes.push(RemoteEntry {
                    name: name.to_string(),
                    fetch_url: String::new(),
                    push_url: String::new(),
                });
                remotes.len() - 1
            }
        };

        match direction {
            "(push)" => remotes[idx].push_url = url.to_string(),
            _ => remotes[idx].fetch_url = url.to_string(),
        }
    }

    remotes
}

/// Parse `git rev-list --left-right --count A...B` output
pub fn parse_ahead_behind(output: &str) -> Option<(u32, u32)> {
    let mut parts = output.split_whitespace();
    let ahead = parts.next()?.parse().ok()?;
    let behind = parts.next()?.parse().ok()?;
    Some((ahead, behind))
}

/// Parse the abbreviated hash and change counts from `git commit` output
///
/// ```text
/// [main (root-commit) 1a2b3c4] Initial commit
///  2 files changed, 10 insertions(+), 1 deletion(-)
/// ```
pub fn parse_commit_output(output: &str) -> GitResult<(String, CommitSummary)> {
    let mut lines = output.lines().skip_while(|line| !line.starts_with('['));
    let header = lines
        .next()
        .ok_or_else(|| GitError::ParseError(format!("Unexpected commit output: {}", output.trim())))?;

    // [<branch> (root-commit) <hash>] <subject>; branch names may contain `]` but never a space
    let padded = format!("{} ", header);
    let commit = padded
        .match_indices("] ")
        .find_map(|(end, _)| {
            let mut tokens = padded[1..end].split_whitespace().rev();
            let hash = tokens.next()?;
            let is_hex = hash.chars().all(|c| c.is_ascii_hexdigit());
            (is_hex && tokens.next().is_some()).then(|| hash.to_string())
        })
        .ok_or_else(|| GitError::ParseError(format!("No commit hash in: {}", header)))?;

    let mut summary = CommitSummary::default();
    if let Some(stats) = lines.find(|line| is_stats_line(line)) {
        for part in stats.split(',') {
            let part = part.trim();
            let count = part
                .split_whitespace()
                .next()
                .and_then(|n| n.parse::<u32>().ok())
                .unwrap_or(0);
            if part.ends_with("changed") {
                summary.changes = count;
            } else if part.contains("insertion") {
                summary.insertions = count;
            } else if part.contains("deletion") {
                summary.deletions = count;
            }
        }
    }

    Ok((commit, summary))
}

/// ` N file(s) changed, ...` as printed below the commit header
fn is_stats_line(line: &str) -> bool {
    let mut words = line.split(',').next().unwrap_or_default().split_whitespace();
    matches!(
        (words.next(), words.next(), words.next(), words.next()),
        (Some(n), Some("file" | "files"), Some("changed"), None) if n.parse::<u32>().is_ok()
    )
}
