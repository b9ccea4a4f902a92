//! Newline-delimited line assembly
//!
//! [`ChunkBuffer`] accumulates text fragments of arbitrary size and hands
//! back only complete lines. It knows nothing about JSON: splitting
//! concatenated objects is the validator's job, so the buffer's contract is
//! purely newline based.

/// Accumulator for one producer or consumer session
///
/// After every [`extract_complete_lines`](ChunkBuffer::extract_complete_lines)
/// the buffer holds at most one trailing fragment with no newline in it.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    pending: String,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend the accumulator. Empty fragments are fine.
    pub fn append(&mut self, fragment: &str) {
        self.pending.push_str(fragment);
    }

    /// Remove and return every newline-terminated line, in arrival order
    ///
    /// The newline itself and a trailing `\r` are stripped. Calling this
    /// twice without an `append` in between returns nothing the second time.
    pub fn extract_complete_lines(&mut self) -> Vec<String> {
        let Some(last_newline) = self.pending.rfind('\n') else {
            return Vec::new();
        };

        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        complete[..last_newline]
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect()
    }

    /// Take whatever is left once the stream has ended
    ///
    /// Some producers omit the newline after the final record, so the
    /// result may be a complete record and should be validated once more.
    pub fn flush_remainder(self) -> String {
        let mut rest = self.pending;
        if rest.ends_with('\r') {
            rest.pop();
        }
        rest
    }

    /// Length in bytes of the trailing incomplete fragment
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop the trailing fragment (used when it outgrows its limit)
    pub fn discard_pending(&mut self) -> usize {
        let len = self.pending.len();
        self.pending.clear();
        len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn reassemble(fragments: &[&str]) -> Vec<String> {
        let mut buffer = ChunkBuffer::new();
        let mut lines = Vec::new();
        for fragment in fragments {
            buffer.append(fragment);
            lines.extend(buffer.extract_complete_lines());
        }
        let rest = buffer.flush_remainder();
        if !rest.is_empty() {
            lines.push(rest);
        }
        lines
    }

    fn random_partition<'a>(input: &'a str, rng: &mut StdRng) -> Vec<&'a str> {
        let boundaries: Vec<usize> = input.char_indices().map(|(i, _)| i).skip(1).collect();
        let mut cuts: Vec<usize> = boundaries
            .into_iter()
            .filter(|_| rng.gen_bool(0.3))
            .collect();
        cuts.push(input.len());

        let mut fragments = Vec::new();
        let mut start = 0;
        for cut in cuts {
            fragments.push(&input[start..cut]);
            start = cut;
        }
        fragments
    }

    #[test]
    fn test_extract_complete_lines() {
        let mut buffer = ChunkBuffer::new();
        buffer.append("{\"a\":1}\n{\"b\"");
        assert_eq!(buffer.extract_complete_lines(), vec!["{\"a\":1}"]);
        assert_eq!(buffer.pending_len(), 4);

        buffer.append(":2}\n");
        assert_eq!(buffer.extract_complete_lines(), vec!["{\"b\":2}"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_second_extract_is_empty() {
        let mut buffer = ChunkBuffer::new();
        buffer.append("one\ntwo\nthr");
        assert_eq!(buffer.extract_complete_lines(), vec!["one", "two"]);
        assert!(buffer.extract_complete_lines().is_empty());
        assert_eq!(buffer.flush_remainder(), "thr");
    }

    #[test]
    fn test_split_exactly_on_newline_and_empty_fragments() {
        let lines = reassemble(&["first", "", "\n", "", "second\n"]);
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn test_blank_lines_are_kept() {
        let mut buffer = ChunkBuffer::new();
        buffer.append("a\n\nb\n");
        assert_eq!(buffer.extract_complete_lines(), vec!["a", "", "b"]);
    }

    #[test]
    fn test_crlf_is_normalised() {
        let lines = reassemble(&["{\"w\":1}\r", "\n{\"w\":2}\r\n", "tail\r"]);
        assert_eq!(lines, vec!["{\"w\":1}", "{\"w\":2}", "tail"]);
    }

    #[test]
    fn test_does_not_split_concatenated_objects() {
        let mut buffer = ChunkBuffer::new();
        buffer.append("{\"a\":1}{\"b\":2}\n");
        assert_eq!(buffer.extract_complete_lines(), vec!["{\"a\":1}{\"b\":2}"]);
    }

    #[test]
    fn test_split_inside_escaped_string() {
        let lines = reassemble(&["{\"q\":\"say \\", "\"hi\\\"\"}\n"]);
        assert_eq!(lines, vec!["{\"q\":\"say \\\"hi\\\"\"}"]);
    }

    #[test]
    fn test_random_partitions_reassemble_original_lines() {
        let input = "{\"word\":\"cat\",\"meaning\":\"mèo\"}\n\
                     {\"word\":\"dog\",\"meaning\":\"chó\"}\n\
                     {\"word\":\"bird\",\"meaning\":\"chim\"}\n\
                     {\"word\":\"fish\",\"meaning\":\"cá\"}";
        let expected: Vec<String> = input.split('\n').map(str::to_string).collect();

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let fragments = random_partition(input, &mut rng);
            assert_eq!(reassemble(&fragments), expected);
        }
    }

    #[test]
    fn test_discard_pending() {
        let mut buffer = ChunkBuffer::new();
        buffer.append("complete\npartial");
        assert_eq!(buffer.extract_complete_lines(), vec!["complete"]);
        assert_eq!(buffer.discard_pending(), 7);
        assert!(buffer.flush_remainder().is_empty());
    }
}
