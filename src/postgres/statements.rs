//! Split SQL text into statements at top-level semicolons.
//!
//! Semicolons inside quoted strings, quoted identifiers, comments and
//! dollar-quoted bodies do not end a statement.

#[derive(Clone)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

/// Statements in `sql`, trimmed, with comments still attached and empty ones dropped.
pub(crate) fn split_statements(sql: &str) -> Vec<&str> {
    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut state = State::Normal;
    let mut start = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b';' => {
                    push_statement(&mut statements, &sql[start..idx]);
                    start = idx + 1;
                }
                _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' => {
                    if let Some((tag, tag_end)) = try_start_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = tag_end;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && closes_dollar_quote(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    push_statement(&mut statements, &sql[start.min(sql.len())..]);
    statements
}

/// First keyword of a statement, skipping leading comments and whitespace.
pub(crate) fn strip_leading_comments(statement: &str) -> &str {
    let mut rest = statement.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix("--") {
            rest = after.find('\n').map_or("", |nl| &after[nl + 1..]).trim_start();
        } else if rest.starts_with("/*") {
            rest = skip_block_comment(rest).trim_start();
        } else {
            return rest;
        }
    }
}

fn skip_block_comment(text: &str) -> &str {
    let bytes = text.as_bytes();
    let mut depth = 0_u32;
    let mut idx = 0;
    while idx < bytes.len() {
        if is_block_comment_start(bytes, idx) {
            depth += 1;
            idx += 2;
        } else if is_block_comment_end(bytes, idx) {
            depth -= 1;
            idx += 2;
            if depth == 0 {
                return &text[idx..];
            }
        } else {
            idx += 1;
        }
    }
    ""
}

fn push_statement<'a>(statements: &mut Vec<&'a str>, text: &'a str) {
    let trimmed = text.trim();
    if !strip_leading_comments(trimmed).is_empty() {
        statements.push(trimmed);
    }
}

fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// `$tag$` opener at `start`; returns the tag and the index of the closing `$`.
fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    while idx < bytes.len() && bytes[idx] != b'$' {
        let b = bytes[idx];
        if !(b.is_ascii_alphanumeric() || b == b'_') {
            return None;
        }
        idx += 1;
    }
    // `$1` is a placeholder, not a tag.
    if bytes.get(start + 1).is_some_and(u8::is_ascii_digit) {
        return None;
    }
    if idx < bytes.len() {
        let tag = String::from_utf8(bytes[start + 1..idx].to_vec()).ok()?;
        Some((tag, idx))
    } else {
        None
    }
}

fn closes_dollar_quote(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let tag_start = idx + 1;
    let tag_end = tag_start + tag.len();
    bytes.get(tag_start..tag_end) == Some(tag.as_bytes()) && bytes.get(tag_end) == Some(&b'$')
}
