// Task rendering
//
// Turns a cached Task into the YAML document served as file content. Output
// depends only on the Task, so size and content never disagree between a
// stat and a subsequent read.

use crate::fs::error::FsResult;
use crate::remote::Task;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const DEFAULT_LINE_WIDTH: usize = 80;

const INDENT: &str = "  ";
const MIN_WRAP_WIDTH: usize = 20;

#[derive(Serialize)]
struct Header<'a> {
    name: &'a str,
    done: bool,
    link: &'a str,
}

#[derive(Serialize)]
struct Notes<'a> {
    notes: &'a str,
}

#[derive(Serialize)]
struct MetadataSection<'a> {
    metadata: Metadata<'a>,
}

#[derive(Serialize)]
struct Metadata<'a> {
    assignee: Option<String>,
    followers: Vec<String>,
    due_on: Option<&'a str>,
    created: &'a str,
    updated: &'a str,
}

#[derive(Debug, Clone, Copy)]
pub struct TaskRenderer {
    line_width: usize,
}

impl Default for TaskRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_WIDTH)
    }
}

impl TaskRenderer {
    pub fn new(line_width: usize) -> Self {
        Self { line_width }
    }

    pub fn line_width(&self) -> usize {
        self.line_width
    }

    pub fn render(&self, task: &Task) -> FsResult<Vec<u8>> {
        let mut doc = serde_yaml::to_string(&Header {
            name: &task.name,
            done: task.done,
            link: &task.link,
        })?;

        match self.folded_notes(&task.notes) {
            Some(block) => doc.push_str(&block),
            None => doc.push_str(&serde_yaml::to_string(&Notes { notes: &task.notes })?),
        }

        doc.push_str(&serde_yaml::to_string(&MetadataSection {
            metadata: Metadata {
                assignee: task.assignee.as_ref().map(|u| u.display()),
                followers: task.followers.iter().map(|u| u.display()).collect(),
                due_on: task.due_on.as_deref(),
                created: &task.created_at,
                updated: &task.modified_at,
            },
        })?);

        Ok(doc.into_bytes())
    }

    pub fn size(&self, task: &Task) -> FsResult<u64> {
        Ok(self.render(task)?.len() as u64)
    }

    /// The task's `modified_at`, or the epoch if the remote sent something
    /// that is not RFC 3339.
    pub fn modified_time(&self, task: &Task) -> DateTime<Utc> {
        match DateTime::parse_from_rfc3339(&task.modified_at) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(e) => {
                tracing::warn!(
                    task = %task.gid,
                    modified_at = %task.modified_at,
                    error = %e,
                    "unparseable modification time"
                );
                DateTime::<Utc>::UNIX_EPOCH
            }
        }
    }

    /// Long notes as a `>-` block, word-wrapped. Returns None when the text
    /// cannot be folded without changing its value.
    fn folded_notes(&self, notes: &str) -> Option<String> {
        if notes.chars().count() < self.line_width {
            return None;
        }
        if notes.starts_with('\n') || notes.ends_with('\n') {
            return None;
        }
        if notes.chars().any(|c| c != '\n' && !is_block_safe(c)) {
            return None;
        }

        let width = self.line_width.saturating_sub(INDENT.len()).max(MIN_WRAP_WIDTH);
        let mut out = String::from("notes: >-\n");

        for (i, paragraph) in notes.split('\n').enumerate() {
            if paragraph.starts_with(' ') || paragraph.ends_with(' ') {
                return None;
            }
            // A blank line folds back into exactly one newline.
            if i > 0 {
                out.push('\n');
            }
            for line in wrap(paragraph, width) {
                out.push_str(INDENT);
                out.push_str(line);
                out.push('\n');
            }
        }

        Some(out)
    }
}

fn is_block_safe(c: char) -> bool {
    !c.is_control() && !matches!(c, '\u{2028}' | '\u{2029}' | '\u{feff}' | '\u{fffe}' | '\u{ffff}')
}

/// Greedy wrap that only breaks at lone spaces, so folding restores the
/// original text byte for byte.
fn wrap(paragraph: &str, width: usize) -> Vec<&str> {
    let mut lines = Vec::new();
    if paragraph.is_empty() {
        return lines;
    }

    let bytes = paragraph.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    for (i, c) in paragraph.char_indices() {
        let lone_space = c == ' '
            && i > start
            && bytes[i - 1] != b' '
            && bytes.get(i + 1).is_some_and(|&b| b != b' ');
        if lone_space {
            segments.push((start, i));
            start = i + 1;
        }
    }
    segments.push((start, paragraph.len()));

    let (mut line_start, mut line_end) = segments[0];
    let mut line_len = paragraph[line_start..line_end].chars().count();

    for &(seg_start, seg_end) in &segments[1..] {
        let seg_len = paragraph[seg_start..seg_end].chars().count();
        if line_len + 1 + seg_len <= width {
            line_end = seg_end;
            line_len += 1 + seg_len;
        } else {
            lines.push(&paragraph[line_start..line_end]);
            line_start = seg_start;
            line_end = seg_end;
            line_len = seg_len;
        }
    }
    lines.push(&paragraph[line_start..line_end]);

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::User;
    use proptest::prelude::*;

    fn task(notes: &str) -> Task {
        Task {
            gid: "t1".to_string(),
            name: "Pack lists".to_string(),
            done: false,
            link: "https://app.asana.com/0/p1/t1".to_string(),
            notes: notes.to_string(),
            assignee: Some(User {
                gid: "u1".to_string(),
                name: "Eli".to_string(),
                email: Some("eli@example.com".to_string()),
            }),
            followers: vec![
                User {
                    gid: "u1".to_string(),
                    name: "Eli".to_string(),
                    email: Some("eli@example.com".to_string()),
                },
                User { gid: "u2".to_string(), name: "Sam".to_string(), email: None },
            ],
            due_on: Some("2024-08-25".to_string()),
            created_at: "2024-06-01T10:00:00.000Z".to_string(),
            modified_at: "2024-06-02T11:30:00.000Z".to_string(),
        }
    }

    fn parse(bytes: &[u8]) -> serde_yaml::Value {
        serde_yaml::from_slice(bytes).unwrap()
    }

    const LONG_NOTES: &str = "Tent, stove, two fuel canisters, water filter, headlamps with spare \
        batteries, sleeping bags rated to five degrees, and the big blue tarp for the kitchen.";

    #[test]
    fn test_render_is_deterministic() {
        let renderer = TaskRenderer::default();
        let t = task(LONG_NOTES);
        let first = renderer.render(&t).unwrap();
        let second = renderer.render(&t).unwrap();
        assert_eq!(first, second);
        assert_eq!(renderer.size(&t).unwrap(), first.len() as u64);
    }

    #[test]
    fn test_field_order_is_stable() {
        let bytes = TaskRenderer::default().render(&task("short")).unwrap();
        let doc = String::from_utf8(bytes).unwrap();
        let keys = [
            "name:", "done:", "link:", "notes:", "metadata:", "assignee:", "followers:", "due_on:",
            "created:", "updated:",
        ];
        let positions: Vec<usize> = keys.iter().map(|k| doc.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "unexpected order:\n{}", doc);
        assert!(doc.ends_with('\n'));
        assert!(!doc.ends_with("\n\n"));
    }

    #[test]
    fn test_short_notes_render_inline() {
        let notes = "Remember the headlamp and spare batteries";
        assert_eq!(notes.len(), 41);
        let doc = String::from_utf8(TaskRenderer::default().render(&task(notes)).unwrap()).unwrap();

        assert!(doc.contains("notes: Remember the headlamp and spare batteries\n"));
        assert!(!doc.contains(">-"));
    }

    #[test]
    fn test_long_notes_render_folded_and_round_trip() {
        let renderer = TaskRenderer::default();
        let bytes = renderer.render(&task(LONG_NOTES)).unwrap();
        let doc = String::from_utf8(bytes.clone()).unwrap();

        assert!(doc.contains("notes: >-\n"));
        for line in doc.lines() {
            assert!(line.chars().count() <= renderer.line_width(), "line too long: {:?}", line);
        }
        assert_eq!(parse(&bytes)["notes"].as_str(), Some(LONG_NOTES));
    }

    #[test]
    fn test_multi_paragraph_notes_round_trip() {
        let notes = format!("{}\nSecond paragraph here.\n\nThird after a gap.", LONG_NOTES);
        let bytes = TaskRenderer::default().render(&task(&notes)).unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains(">-"));
        assert_eq!(parse(&bytes)["notes"].as_str(), Some(notes.as_str()));
    }

    #[test]
    fn test_unfoldable_long_notes_fall_back_and_round_trip() {
        let cases = [
            format!("  indented start {}", LONG_NOTES),
            format!("{}\n", LONG_NOTES),
            format!("{}\twith a tab", LONG_NOTES),
            format!("{}\n    - indented bullet", LONG_NOTES),
        ];
        for notes in &cases {
            let bytes = TaskRenderer::default().render(&task(notes)).unwrap();
            assert!(!String::from_utf8_lossy(&bytes).contains("notes: >-"));
            assert_eq!(parse(&bytes)["notes"].as_str(), Some(notes.as_str()));
        }
    }

    #[test]
    fn test_metadata_values() {
        let value = parse(&TaskRenderer::default().render(&task("x")).unwrap());

        assert_eq!(value["name"].as_str(), Some("Pack lists"));
        assert_eq!(value["done"].as_bool(), Some(false));
        assert_eq!(value["link"].as_str(), Some("https://app.asana.com/0/p1/t1"));

        let meta = &value["metadata"];
        assert_eq!(meta["assignee"].as_str(), Some("Eli <eli@example.com>"));
        let followers: Vec<&str> =
            meta["followers"].as_sequence().unwrap().iter().filter_map(|v| v.as_str()).collect();
        assert_eq!(followers, vec!["Eli <eli@example.com>", "Sam"]);
        assert_eq!(meta["due_on"].as_str(), Some("2024-08-25"));
        assert_eq!(meta["created"].as_str(), Some("2024-06-01T10:00:00.000Z"));
        assert_eq!(meta["updated"].as_str(), Some("2024-06-02T11:30:00.000Z"));
    }

    #[test]
    fn test_absent_assignee_and_due_date_render_null() {
        let mut t = task("x");
        t.assignee = None;
        t.followers.clear();
        t.due_on = None;

        let value = parse(&TaskRenderer::default().render(&t).unwrap());
        assert!(value["metadata"]["assignee"].is_null());
        assert!(value["metadata"]["due_on"].is_null());
        assert_eq!(value["metadata"]["followers"].as_sequence().map(|s| s.len()), Some(0));
    }

    #[test]
    fn test_modified_time_parses_rfc3339() {
        let ts = TaskRenderer::default().modified_time(&task("x"));
        assert_eq!(ts.to_rfc3339(), "2024-06-02T11:30:00+00:00");
    }

    #[test]
    fn test_modified_time_falls_back_to_epoch() {
        let mut t = task("x");
        t.modified_at = "yesterday".to_string();
        assert_eq!(TaskRenderer::default().modified_time(&t), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_wrap_keeps_double_spaces_inside_lines() {
        let lines = wrap("alpha  beta gamma", 11);
        assert_eq!(lines, vec!["alpha  beta", "gamma"]);
    }

    #[test]
    fn test_wrap_long_word_stays_whole() {
        let word = "x".repeat(30);
        let text = format!("a {} b", word);
        assert_eq!(wrap(&text, 10), vec!["a", word.as_str(), "b"]);
    }

    proptest! {
        #[test]
        fn prop_folded_notes_round_trip(
            paragraphs in prop::collection::vec(
                prop::collection::vec("[a-z]{1,12}", 1..20),
                1..4,
            )
        ) {
            let notes = paragraphs
                .iter()
                .map(|words| words.join(" "))
                .collect::<Vec<_>>()
                .join("\n");
            let bytes = TaskRenderer::default().render(&task(&notes)).unwrap();
            let value = parse(&bytes);
            prop_assert_eq!(value["notes"].as_str(), Some(notes.as_str()));
        }
    }
}
