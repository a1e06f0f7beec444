//! Fence-aware flush state for one streamed answer.
//!
//! Text leaves the state in two kinds of chunk:
//!
//! - a complete line outside any code fence (newline stripped, blank lines
//!   dropped), or
//! - a whole fenced code block, from its opening ` ``` ` through its closing
//!   ` ``` `, emitted the moment the closing marker arrives.
//!
//! When a fence opens, everything before it is flushed first, including a
//! partial line, so the text leading into a block is not held back behind it.
//!
//! Markers are searched bytewise from two bytes before the previous end of
//! text, so a marker split across deltas is still seen, but never before the
//! end of the last marker already counted.

/// Code fence marker.
const FENCE: &[u8] = b"```";

/// Length of [`FENCE`] in bytes.
const FENCE_LEN: usize = 3;

/// Bytes of already-scanned text re-examined on each delta.
const RESCAN: usize = 2;

/// Reassembly and flush bookkeeping for one streaming call.
#[derive(Debug, Clone, Default)]
pub struct RenderState {
    text: String,
    // Everything before this offset has been emitted or deliberately skipped.
    flushed: usize,
    // Length of `text` at the end of the previous scan.
    scanned: usize,
    // End of the last counted marker; scanning never restarts before it.
    scan_floor: usize,
    open_fences: Vec<usize>,
}

impl RenderState {
    /// Fresh state with no text.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta and return the chunks it made safe to emit, in order.
    pub fn push_delta(&mut self, delta: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        if delta.is_empty() {
            return chunks;
        }
        self.text.push_str(delta);

        let mut pos = self.scanned.saturating_sub(RESCAN).max(self.scan_floor);
        while let Some(start) = find_fence(&self.text, pos) {
            let end = start.saturating_add(FENCE_LEN);
            self.scan_floor = end;
            pos = end;
            match self.open_fences.pop() {
                Some(open) => self.close_block(open, end, &mut chunks),
                None => self.open_block(start, &mut chunks),
            }
        }
        self.scanned = self.text.len();

        if self.open_fences.is_empty() {
            self.drain_lines(self.text.len(), &mut chunks);
        }
        chunks
    }

    /// End of stream: flush whatever is left as one chunk.
    ///
    /// If a fence is still open the unterminated block goes out as-is rather
    /// than being dropped. Trailing whitespace is trimmed; a blank remainder
    /// produces nothing.
    pub fn finish(&mut self) -> Vec<String> {
        let mut chunks = Vec::new();
        if let Some(rest) = self.text.get(self.flushed..) {
            if !rest.trim().is_empty() {
                chunks.push(rest.trim_end().to_owned());
            }
        }
        self.flushed = self.text.len();
        self.open_fences.clear();
        chunks
    }

    /// The full answer so far, trimmed.
    #[must_use]
    pub fn full_text(&self) -> &str {
        self.text.trim()
    }

    /// Whether a code fence is currently open.
    #[must_use]
    pub fn in_fence(&self) -> bool {
        !self.open_fences.is_empty()
    }

    /// Offset up to which text has been flushed.
    #[must_use]
    pub fn flushed_offset(&self) -> usize {
        self.flushed
    }

    fn open_block(&mut self, start: usize, chunks: &mut Vec<String>) {
        self.drain_lines(start, chunks);
        if let Some(pending) = self.text.get(self.flushed..start) {
            if !pending.trim().is_empty() {
                chunks.push(pending.to_owned());
            }
        }
        self.flushed = start;
        self.open_fences.push(start);
    }

    fn close_block(&mut self, open: usize, end: usize, chunks: &mut Vec<String>) {
        if let Some(block) = self.text.get(open..end) {
            if !block.trim().is_empty() {
                chunks.push(block.to_owned());
            }
        }
        self.flushed = end;
    }

    /// Emit every complete line between the flush cursor and `limit`.
    fn drain_lines(&mut self, limit: usize, chunks: &mut Vec<String>) {
        while let Some(rel) = self
            .text
            .get(self.flushed..limit)
            .and_then(|window| window.find('\n'))
        {
            let line_end = self.flushed.saturating_add(rel);
            if let Some(line) = self.text.get(self.flushed..line_end) {
                if !line.trim().is_empty() {
                    chunks.push(line.to_owned());
                }
            }
            self.flushed = line_end.saturating_add(1);
        }
    }
}

/// Byte offset of the first fence marker at or after `from`.
fn find_fence(text: &str, from: usize) -> Option<usize> {
    text.as_bytes()
        .get(from..)?
        .windows(FENCE_LEN)
        .position(|window| window == FENCE)
        .map(|rel| from.saturating_add(rel))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(deltas: &[&str]) -> (Vec<String>, String) {
        let mut state = RenderState::new();
        let mut chunks = Vec::new();
        for delta in deltas {
            chunks.extend(state.push_delta(delta));
        }
        chunks.extend(state.finish());
        (chunks, state.full_text().to_owned())
    }

    #[test]
    fn scenario_text_block_text() {
        let (chunks, full) = run(&["He", "llo ```py\ncode", "\nmore```", " world"]);
        assert_eq!(
            chunks,
            vec![
                "Hello ".to_owned(),
                "```py\ncode\nmore```".to_owned(),
                " world".to_owned(),
            ]
        );
        assert_eq!(full, "Hello ```py\ncode\nmore``` world");
    }

    #[test]
    fn lines_flush_as_they_complete() {
        let mut state = RenderState::new();
        assert!(state.push_delta("first li").is_empty());
        assert_eq!(state.push_delta("ne\nsecond"), vec!["first line".to_owned()]);
        assert_eq!(
            state.push_delta(" line\n\n  \nthird\n"),
            vec!["second line".to_owned(), "third".to_owned()]
        );
        assert!(state.finish().is_empty());
    }

    #[test]
    fn lines_before_fence_flush_when_it_opens() {
        let mut state = RenderState::new();
        let chunks = state.push_delta("intro\nlead ```rust\nfn main() {}\n");
        assert_eq!(chunks, vec!["intro".to_owned(), "lead ".to_owned()]);
        assert!(state.in_fence());
        // Complete lines inside the fence are held back.
        assert!(state.push_delta("let x = 1;\n").is_empty());
        assert_eq!(
            state.push_delta("```\nafter\n"),
            vec![
                "```rust\nfn main() {}\nlet x = 1;\n```".to_owned(),
                "after".to_owned(),
            ]
        );
    }

    #[test]
    fn markers_split_across_deltas() {
        let (chunks, _) = run(&["a\n``", "`py\nx\n`", "``\nb\n"]);
        assert_eq!(
            chunks,
            vec!["a".to_owned(), "```py\nx\n```".to_owned(), "b".to_owned()]
        );
    }

    #[test]
    fn marker_split_one_byte_at_a_time() {
        let text = "see:\n```sh\nls -la\n```\ndone";
        let deltas: Vec<String> = text.chars().map(String::from).collect();
        let refs: Vec<&str> = deltas.iter().map(String::as_str).collect();
        let (chunks, full) = run(&refs);
        assert_eq!(
            chunks,
            vec![
                "see:".to_owned(),
                "```sh\nls -la\n```".to_owned(),
                "done".to_owned(),
            ]
        );
        assert_eq!(full, text);
    }

    #[test]
    fn block_is_one_chunk_for_every_split_point() {
        let text = "before\n```\nline one\nline two\n```\nafter";
        for cut in 1..text.len() {
            let (a, b) = text.split_at(cut);
            let (chunks, full) = run(&[a, b]);
            assert_eq!(
                chunks,
                vec![
                    "before".to_owned(),
                    "```\nline one\nline two\n```".to_owned(),
                    "after".to_owned(),
                ],
                "split at {cut}"
            );
            assert_eq!(full, text);
        }
    }

    #[test]
    fn counted_marker_is_not_rescanned() {
        // The rescan window would otherwise see "```" again inside "````".
        let (chunks, _) = run(&["```", "`\nx\n```"]);
        assert_eq!(chunks, vec!["````\nx\n```".to_owned()]);
    }

    #[test]
    fn unclosed_fence_flushes_at_end() {
        let (chunks, full) = run(&["look:\n```js\nconsole.log(1)", ";\n  \n"]);
        assert_eq!(
            chunks,
            vec!["look:".to_owned(), "```js\nconsole.log(1);".to_owned()]
        );
        assert_eq!(full, "look:\n```js\nconsole.log(1);");
    }

    #[test]
    fn two_blocks_in_one_delta() {
        let (chunks, _) = run(&["```a```mid```b```"]);
        assert_eq!(
            chunks,
            vec!["```a```".to_owned(), "mid".to_owned(), "```b```".to_owned()]
        );
    }

    #[test]
    fn plain_text_reassembles_for_every_chunking() {
        let text = "alpha\nbeta gamma\ndelta epsilon\nzeta";
        for first in 1..text.len() {
            for second in first..text.len() {
                let deltas = [&text[..first], &text[first..second], &text[second..]];
                let (chunks, full) = run(&deltas);
                assert_eq!(chunks.join("\n"), full, "cuts at {first},{second}");
                assert_eq!(full, text);
            }
        }
    }

    #[test]
    fn multibyte_text_near_markers() {
        let (chunks, full) = run(&["chào ", "bạn ``", "`\nmã\n``", "`đó"]);
        assert_eq!(
            chunks,
            vec!["chào bạn ".to_owned(), "```\nmã\n```".to_owned(), "đó".to_owned()]
        );
        assert_eq!(full, "chào bạn ```\nmã\n```đó");
    }

    #[test]
    fn blank_only_answer_emits_nothing() {
        let (chunks, full) = run(&["\n", "  \n", " "]);
        assert!(chunks.is_empty());
        assert!(full.is_empty());
    }

    #[test]
    fn flush_cursor_jumps_past_block() {
        let mut state = RenderState::new();
        state.push_delta("```x```");
        assert_eq!(state.flushed_offset(), 7);
        assert!(!state.in_fence());
    }
}
