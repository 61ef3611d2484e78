//! Line framing applied before transmission.
//!
//! The wire protocol is newline-delimited UTF-8 text: no length prefix, no
//! acknowledgement. Embedded newlines are substituted so one queued message
//! always occupies exactly one physical line.

/// Separator substituted for embedded newlines (U+2028 LINE SEPARATOR).
pub const LINE_SEP: &str = "\u{2028}";

/// Frame a message as a single newline-terminated UTF-8 line.
pub(crate) fn frame_line(line: &str) -> Vec<u8> {
    let mut framed = line.replace('\n', LINE_SEP);
    framed.push('\n');
    framed.into_bytes()
}
