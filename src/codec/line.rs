use super::WireError;

/// Splits a stored record into lines, stripping the `\n` or `\r\n` terminator.
pub(super) struct LineReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> LineReader<'a> {
    pub(super) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns `None` once the record is exhausted. A final line without a
    /// terminator is still returned.
    pub(super) fn next_line(&mut self) -> Option<&'a [u8]> {
        if self.pos >= self.data.len() {
            return None;
        }
        let available = &self.data[self.pos..];
        let (line, consume) = match available.iter().position(|byte| *byte == b'\n') {
            Some(idx) => (&available[..idx], idx + 1),
            None => (available, available.len()),
        };
        self.pos += consume;
        Some(line.strip_suffix(b"\r").unwrap_or(line))
    }

    pub(super) fn next_str_line(&mut self, what: &'static str) -> Result<&'a str, WireError> {
        let line = self.next_line().ok_or(WireError::UnexpectedEof(what))?;
        std::str::from_utf8(line).map_err(|_| WireError::InvalidUtf8)
    }
}
