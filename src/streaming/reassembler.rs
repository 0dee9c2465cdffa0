//! Event-block reassembly over arbitrarily split chunks.

use std::fmt;

/// Event delimiter: two consecutive newlines.
pub const EVENT_DELIMITER: &[u8] = b"\n\n";

/// An undecoded event block, delimiter stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock(String);

impl RawBlock {
    /// Creates a block from its text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Self(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Returns the block text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RawBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

fn find_delimiter(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(EVENT_DELIMITER.len())
        .position(|w| w == EVENT_DELIMITER)
}

/// Accumulates body bytes and splits them into complete event blocks.
///
/// The buffer holds raw bytes, so a multi-byte character split between two
/// reads is only decoded once the block around it is complete. Whatever
/// follows the last delimiter is retained for the next [`ingest`](Self::ingest).
#[derive(Debug, Default)]
pub struct Reassembler {
    buffer: Vec<u8>,
    /// Leading bytes of `buffer` already searched without finding a delimiter.
    scanned: usize,
    ended: bool,
}

impl Reassembler {
    /// Creates an empty reassembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns the blocks it completes.
    ///
    /// The returned iterator is lazy. Blocks it did not yield before being
    /// dropped stay buffered and come out of the next call, in order.
    /// Input after [`flush`](Self::flush) is ignored.
    pub fn ingest(&mut self, chunk: impl AsRef<[u8]>) -> Blocks<'_> {
        if !self.ended {
            self.buffer.extend_from_slice(chunk.as_ref());
        }
        // A delimiter split by the previous read starts in the last byte
        // already searched.
        let resume = self.scanned.saturating_sub(EVENT_DELIMITER.len() - 1);
        Blocks {
            buffer: &mut self.buffer,
            scanned: &mut self.scanned,
            consumed: 0,
            resume,
            exhausted: false,
        }
    }

    /// Marks end of input and returns the trailing block, if any.
    ///
    /// A remainder that is not blank is treated as if a delimiter followed
    /// it. Any complete blocks still buffered are not returned here; drain
    /// [`ingest`](Self::ingest) first.
    pub fn flush(&mut self) -> Option<RawBlock> {
        self.ended = true;
        self.scanned = 0;
        let remainder = std::mem::take(&mut self.buffer);
        if is_blank(&remainder) {
            None
        } else {
            Some(RawBlock::from_bytes(&remainder))
        }
    }

    /// Number of buffered bytes not yet emitted.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true once [`flush`](Self::flush) has been called.
    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

/// Complete blocks produced by one [`Reassembler::ingest`] call.
#[derive(Debug)]
pub struct Blocks<'a> {
    buffer: &'a mut Vec<u8>,
    scanned: &'a mut usize,
    consumed: usize,
    resume: usize,
    exhausted: bool,
}

impl Iterator for Blocks<'_> {
    type Item = RawBlock;

    fn next(&mut self) -> Option<RawBlock> {
        loop {
            let start = self.consumed.max(self.resume);
            let Some(offset) = find_delimiter(&self.buffer[start..]) else {
                self.exhausted = true;
                return None;
            };
            let end = start + offset;
            let block = &self.buffer[self.consumed..end];
            self.consumed = end + EVENT_DELIMITER.len();
            if !is_blank(block) {
                return Some(RawBlock::from_bytes(block));
            }
        }
    }
}

impl Drop for Blocks<'_> {
    fn drop(&mut self) {
        self.buffer.drain(..self.consumed);
        // Blocks left unread may still hold delimiters.
        *self.scanned = if self.exhausted { self.buffer.len() } else { 0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(reassembler: &mut Reassembler, chunk: &str) -> Vec<String> {
        reassembler
            .ingest(chunk)
            .map(|b| b.as_str().to_string())
            .collect()
    }

    #[test]
    fn test_single_block() {
        let mut r = Reassembler::new();
        assert_eq!(collect(&mut r, "data: one\n\n"), vec!["data: one"]);
        assert_eq!(r.pending(), 0);
    }

    #[test]
    fn test_multiple_blocks_in_one_chunk() {
        let mut r = Reassembler::new();
        assert_eq!(
            collect(&mut r, "data: one\n\ndata: two\n\ndata: thr"),
            vec!["data: one", "data: two"]
        );
        assert_eq!(r.pending(), "data: thr".len());
    }

    #[test]
    fn test_delimiter_split_across_chunks() {
        let mut r = Reassembler::new();
        assert!(collect(&mut r, "data: one\n").is_empty());
        assert_eq!(collect(&mut r, "\ndata: two\n\n"), vec!["data: one", "data: two"]);
    }

    #[test]
    fn test_byte_at_a_time() {
        let input = "data: a\n\ndata: b\n\n";
        let mut r = Reassembler::new();
        let mut blocks = Vec::new();
        for b in input.as_bytes() {
            blocks.extend(r.ingest([*b]).map(|b| b.as_str().to_string()));
        }
        assert_eq!(blocks, vec!["data: a", "data: b"]);
    }

    #[test]
    fn test_blank_blocks_are_discarded() {
        let mut r = Reassembler::new();
        assert_eq!(
            collect(&mut r, "\n\n  \n\ndata: x\n\n\n\n"),
            vec!["data: x"]
        );
    }

    #[test]
    fn test_split_multibyte_character() {
        let text = "data: caf\u{e9}\n\n";
        let bytes = text.as_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;

        let mut r = Reassembler::new();
        assert_eq!(r.ingest(&bytes[..split]).count(), 0);
        let blocks: Vec<_> = r.ingest(&bytes[split..]).collect();
        assert_eq!(blocks, vec![RawBlock::new("data: caf\u{e9}")]);
    }

    #[test]
    fn test_partially_consumed_iterator_keeps_rest() {
        let mut r = Reassembler::new();
        let first = r.ingest("data: a\n\ndata: b\n\n").next();
        assert_eq!(first, Some(RawBlock::new("data: a")));
        assert_eq!(collect(&mut r, ""), vec!["data: b"]);
    }

    #[test]
    fn test_search_resumes_after_scanned_bytes() {
        let mut r = Reassembler::new();
        assert!(collect(&mut r, "data: {\"kind\":\"token\"").is_empty());
        assert_eq!(r.scanned, r.pending());
        assert!(collect(&mut r, ",\"content\":\"A\"}\n").is_empty());
        assert_eq!(r.scanned, r.pending());
        assert_eq!(
            collect(&mut r, "\ndata: b\n\nda"),
            vec![r#"data: {"kind":"token","content":"A"}"#, "data: b"]
        );
        assert_eq!(r.scanned, "da".len());
    }

    #[test]
    fn test_large_block_in_small_chunks() {
        let text = "x".repeat(64 * 1024);
        let input = format!("data: {text}\n\n");
        let mut r = Reassembler::new();
        let mut blocks = Vec::new();
        for chunk in input.as_bytes().chunks(3) {
            blocks.extend(r.ingest(chunk).map(|b| b.as_str().to_string()));
        }
        assert_eq!(blocks, vec![format!("data: {text}")]);
        assert_eq!(r.pending(), 0);
    }

    #[test]
    fn test_flush_emits_remainder() {
        let mut r = Reassembler::new();
        assert!(collect(&mut r, "data: tail").is_empty());
        assert_eq!(r.flush(), Some(RawBlock::new("data: tail")));
        assert!(r.is_ended());
        assert_eq!(r.pending(), 0);
    }

    #[test]
    fn test_flush_ignores_whitespace() {
        let mut r = Reassembler::new();
        assert_eq!(collect(&mut r, "data: a\n\n \n"), vec!["data: a"]);
        assert_eq!(r.flush(), None);
    }

    #[test]
    fn test_input_after_flush_is_ignored() {
        let mut r = Reassembler::new();
        assert_eq!(r.flush(), None);
        assert_eq!(r.ingest("data: late\n\n").count(), 0);
    }
}
