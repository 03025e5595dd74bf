/// A single text edit, described by the document lines it touched.
///
/// All lines are 1-based. `old_last_line` is the last line the edit covered before it was applied,
/// `new_last_line` the last line covered by the replacement text afterwards.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DocumentChange {
    start_line: u32,
    old_last_line: u32,
    new_last_line: u32,
    inserted_empty: bool,
}
impl DocumentChange {
    /// Lines are clamped to be at least 1, and the last lines to be at least the start line.
    #[must_use]
    pub fn new(start_line: u32, old_last_line: u32, new_last_line: u32, inserted_empty: bool) -> Self {
        let start_line = start_line.max(1);
        Self {
            start_line,
            old_last_line: old_last_line.max(start_line),
            new_last_line: new_last_line.max(start_line),
            inserted_empty,
        }
    }
    /// Describe replacing `removed_len` bytes at byte `offset` of `old_text` with `inserted`.
    ///
    /// Offsets past the end are clamped, as are offsets that split a char.
    #[must_use]
    pub fn from_edit(old_text: &str, offset: usize, removed_len: usize, inserted: &str) -> Self {
        let offset = floor_char_boundary(old_text, offset);
        let removed_end = floor_char_boundary(old_text, offset.saturating_add(removed_len));

        let start_line = line_of_offset(old_text, offset);
        let old_last_line = line_of_offset(old_text, removed_end);
        // Lines before the edit are untouched, so the new last line is the start line
        // plus however many line breaks the replacement carries.
        let new_last_line = start_line + count_lines(inserted);

        Self::new(start_line, old_last_line, new_last_line, inserted.is_empty())
    }
    #[must_use]
    pub fn start_line(&self) -> u32 {
        self.start_line
    }
    #[must_use]
    pub fn old_last_line(&self) -> u32 {
        self.old_last_line
    }
    #[must_use]
    pub fn new_last_line(&self) -> u32 {
        self.new_last_line
    }
    /// True if the edit removed text without inserting any.
    #[must_use]
    pub fn is_pure_deletion(&self) -> bool {
        self.inserted_empty
    }
    /// Change in the number of document lines.
    #[must_use]
    pub fn line_delta(&self) -> i64 {
        i64::from(self.new_last_line) - i64::from(self.old_last_line)
    }
}

fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}
/// 1-based line containing byte `offset`.
fn line_of_offset(text: &str, offset: usize) -> u32 {
    1 + count_lines(&text[..offset])
}
/// Number of line delimiters. `\r\n` counts once, as do lone `\r` and `\n`.
fn count_lines(text: &str) -> u32 {
    let mut count = 0u32;
    let mut bytes = text.bytes().peekable();
    while let Some(b) = bytes.next() {
        match b {
            b'\r' => {
                bytes.next_if_eq(&b'\n');
                count = count.saturating_add(1);
            }
            b'\n' => count = count.saturating_add(1),
            _ => (),
        }
    }
    count
}

#[cfg(test)]
mod test {
    use super::DocumentChange;
    const TEXT: &str = "one\ntwo\nthree\nfour\nfive\n";

    #[test]
    fn insert_lines() {
        // Two new lines typed at the start of "three".
        let change = DocumentChange::from_edit(TEXT, 8, 0, "a\nb\n");
        assert_eq!(change.start_line(), 3);
        assert_eq!(change.old_last_line(), 3);
        assert_eq!(change.new_last_line(), 5);
        assert_eq!(change.line_delta(), 2);
        assert!(!change.is_pure_deletion());
    }
    #[test]
    fn delete_lines() {
        // Delete "two\nthree\n"
        let change = DocumentChange::from_edit(TEXT, 4, 10, "");
        assert_eq!(change.start_line(), 2);
        assert_eq!(change.old_last_line(), 4);
        assert_eq!(change.new_last_line(), 2);
        assert_eq!(change.line_delta(), -2);
        assert!(change.is_pure_deletion());
    }
    #[test]
    fn line_endings() {
        let text = "a\r\nb\rc\nd";
        let change = DocumentChange::from_edit(text, text.len(), 0, "x\r\ny");
        assert_eq!(change.start_line(), 4);
        assert_eq!(change.new_last_line(), 5);
    }
    #[test]
    fn clamps() {
        let change = DocumentChange::from_edit("é", 1, 100, "");
        assert_eq!(change.start_line(), 1);
        let change = DocumentChange::new(0, 0, 0, true);
        assert_eq!(
            (change.start_line(), change.old_last_line(), change.new_last_line()),
            (1, 1, 1)
        );
    }
}
