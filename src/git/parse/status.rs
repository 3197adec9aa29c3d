//! git::parse::status
//!
//! Incremental parser for `git status -z`.
//!
//! # Format
//!
//! Each record is `XY PATH\0`. Renames and copies (`X` is `R` or `C`, or
//! `Y` is `R`) carry a second field, `XY NEW\0ORIG\0`.
//!
//! # Chunking
//!
//! Output arrives in arbitrary pieces. [`StatusParser::update`] keeps the
//! unconsumed tail and only emits a record once all of its fields are
//! terminated, so one record never spans two calls. The parser works on
//! bytes: a chunk may split a multi-byte character.

use std::mem;

/// One record from `git status -z`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatusEntry {
    /// Index status letter.
    pub x: char,
    /// Worktree status letter.
    pub y: char,
    /// Path relative to the repository root.
    pub path: String,
    /// Rename or copy source.
    pub original_path: Option<String>,
}

/// Accumulates status records across chunks.
#[derive(Debug, Default)]
pub struct StatusParser {
    remainder: Vec<u8>,
    entries: Vec<RawStatusEntry>,
}

impl StatusParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk of output.
    pub fn update(&mut self, chunk: &[u8]) {
        let mut buf = mem::take(&mut self.remainder);
        buf.extend_from_slice(chunk);

        let mut i = 0;
        while let Some(next) = self.parse_entry(&buf, i) {
            i = next;
        }
        self.remainder = buf.split_off(i);
    }

    /// Records parsed so far.
    pub fn entries(&self) -> &[RawStatusEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<RawStatusEntry> {
        self.entries
    }

    /// Parse the record starting at `i`, returning the offset after it, or
    /// `None` when more input is needed.
    fn parse_entry(&mut self, buf: &[u8], mut i: usize) -> Option<usize> {
        if i + 4 >= buf.len() {
            return None;
        }

        // Status output occasionally arrives shifted by one byte. Realign
        // when the separator is not where it should be.
        if buf[i + 2] != b' ' {
            i += 1;
            if i + 4 >= buf.len() {
                return None;
            }
        }

        let x = buf[i] as char;
        let y = buf[i + 1] as char;
        i += 3;

        let (path, next) = read_field(buf, i)?;
        i = next;

        let original_path = if x == 'R' || x == 'C' || y == 'R' {
            let (orig, next) = read_field(buf, i)?;
            i = next;
            Some(orig)
        } else {
            None
        };

        // A trailing slash marks a nested repository.
        if !path.ends_with('/') {
            self.entries.push(RawStatusEntry {
                x,
                y,
                path,
                original_path,
            });
        }
        Some(i)
    }
}

fn read_field(buf: &[u8], start: usize) -> Option<(String, usize)> {
    let len = buf[start..].iter().position(|b| *b == 0)?;
    let field = String::from_utf8_lossy(&buf[start..start + len]).into_owned();
    Some((field, start + len + 1))
}

/// Parse a complete status output in one call.
pub fn parse_status(output: &[u8]) -> Vec<RawStatusEntry> {
    let mut parser = StatusParser::new();
    parser.update(output);
    parser.into_entries()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(x: char, y: char, path: &str, orig: Option<&str>) -> RawStatusEntry {
        RawStatusEntry {
            x,
            y,
            path: path.to_string(),
            original_path: orig.map(str::to_string),
        }
    }

    #[test]
    fn simple_records() {
        let entries = parse_status(b"M  a.txt\0 M b.txt\0?? c.txt\0");
        assert_eq!(
            entries,
            vec![
                entry('M', ' ', "a.txt", None),
                entry(' ', 'M', "b.txt", None),
                entry('?', '?', "c.txt", None),
            ]
        );
    }

    #[test]
    fn rename_has_two_paths() {
        let entries = parse_status(b"R  new.txt\0old.txt\0 R wt.txt\0src.txt\0C  copy\0orig\0");
        assert_eq!(
            entries,
            vec![
                entry('R', ' ', "new.txt", Some("old.txt")),
                entry(' ', 'R', "wt.txt", Some("src.txt")),
                entry('C', ' ', "copy", Some("orig")),
            ]
        );
    }

    #[test]
    fn nested_repositories_are_dropped() {
        let entries = parse_status(b"?? vendor/lib/\0?? file\0");
        assert_eq!(entries, vec![entry('?', '?', "file", None)]);
    }

    #[test]
    fn partial_record_waits_for_terminator() {
        let mut parser = StatusParser::new();
        parser.update(b"M  a.t");
        assert!(parser.is_empty());
        parser.update(b"xt\0R  n");
        assert_eq!(parser.len(), 1);
        parser.update(b"ew\0ol");
        assert_eq!(parser.len(), 1);
        parser.update(b"d\0");
        assert_eq!(
            parser.entries()[1],
            entry('R', ' ', "new", Some("old"))
        );
    }

    #[test]
    fn short_input_is_buffered() {
        let mut parser = StatusParser::new();
        parser.update(b"M ");
        parser.update(b" a\0");
        assert_eq!(parser.entries(), &[entry('M', ' ', "a", None)]);
    }

    #[test]
    fn multibyte_path_split_across_chunks() {
        let bytes = "M  caf\u{e9}.txt\0".as_bytes();
        let split = bytes.len() - 6;
        let mut parser = StatusParser::new();
        parser.update(&bytes[..split]);
        parser.update(&bytes[split..]);
        assert_eq!(parser.entries()[0].path, "caf\u{e9}.txt");
    }

    mod realignment {
        use super::*;

        #[test]
        fn stray_leading_byte_is_skipped() {
            let entries = parse_status(b"\n M file.txt\0");
            assert_eq!(entries, vec![entry(' ', 'M', "file.txt", None)]);
        }

        #[test]
        fn realignment_after_complete_record() {
            let entries = parse_status(b"A  one\0\0 D two\0");
            assert_eq!(
                entries,
                vec![entry('A', ' ', "one", None), entry(' ', 'D', "two", None)]
            );
        }

        #[test]
        fn realignment_at_chunk_boundary() {
            let mut parser = StatusParser::new();
            parser.update(b"A  one\0\0");
            parser.update(b" D");
            parser.update(b" two\0");
            assert_eq!(
                parser.entries(),
                &[entry('A', ' ', "one", None), entry(' ', 'D', "two", None)]
            );
        }
    }

    fn arb_entry() -> impl Strategy<Value = RawStatusEntry> {
        let letter = prop::sample::select(vec!['M', 'A', 'D', 'R', 'C', 'T', 'U', '?', '!', ' ']);
        (letter.clone(), letter, "[a-z0-9_./ ]{1,12}[a-z]", "[a-z0-9_.]{1,8}").prop_map(
            |(x, y, path, orig)| {
                let renamed = x == 'R' || x == 'C' || y == 'R';
                RawStatusEntry {
                    x,
                    y,
                    path,
                    original_path: renamed.then_some(orig),
                }
            },
        )
    }

    fn serialize(entries: &[RawStatusEntry]) -> Vec<u8> {
        let mut out = Vec::new();
        for e in entries {
            out.push(e.x as u8);
            out.push(e.y as u8);
            out.push(b' ');
            out.extend_from_slice(e.path.as_bytes());
            out.push(0);
            if let Some(orig) = &e.original_path {
                out.extend_from_slice(orig.as_bytes());
                out.push(0);
            }
        }
        out
    }

    proptest! {
        #[test]
        fn chunk_boundaries_do_not_change_result(
            entries in prop::collection::vec(arb_entry(), 0..20),
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
        ) {
            let bytes = serialize(&entries);
            let whole = parse_status(&bytes);

            let mut points: Vec<usize> = cuts.iter().map(|c| c.index(bytes.len() + 1)).collect();
            points.sort_unstable();

            let mut parser = StatusParser::new();
            let mut last = 0;
            for p in points {
                parser.update(&bytes[last..p]);
                last = p;
            }
            parser.update(&bytes[last..]);

            prop_assert_eq!(parser.entries(), whole.as_slice());
            prop_assert_eq!(whole, entries);
        }
    }
}
