//! JSON-with-comments normalization.
//!
//! `tsconfig.json` files are routinely written with `//` and `/* */`
//! comments and trailing commas. [`normalize`] rewrites such a document
//! into strict JSON so it can be handed to a regular JSON parser.

/// Byte order mark some editors prepend to UTF-8 files.
const BOM: &str = "\u{feff}";

/// Convert a JSON-with-comments document into strict JSON.
///
/// Strips a leading BOM, `//` line comments, `/* */` block comments and
/// trailing commas before `}` or `]`. String literals are copied verbatim,
/// so comment markers and commas inside strings survive.
#[must_use]
pub fn normalize(input: &str) -> String {
    let input = input.strip_prefix(BOM).unwrap_or(input);
    strip_trailing_commas(&strip_comments(input))
}

/// Strip `//` line and `/* */` block comments while respecting strings.
///
/// Block comments are replaced with a single space so that tokens on either
/// side stay separated. An unterminated block comment swallows the rest of
/// the input.
#[must_use]
pub fn strip_comments(input: &str) -> String {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut out = Vec::with_capacity(len);
    let mut i = 0;

    while i < len {
        let ch = bytes[i];

        if ch == b'"' {
            i = copy_string(bytes, i, &mut out);
            continue;
        }

        if ch == b'/' && i + 1 < len && bytes[i + 1] == b'/' {
            while i < len && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }

        if ch == b'/' && i + 1 < len && bytes[i + 1] == b'*' {
            i += 2;
            while i + 1 < len && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                i += 1;
            }
            // skip `*/`, or run off the end if unterminated
            i = (i + 2).min(len);
            out.push(b' ');
            continue;
        }

        out.push(ch);
        i += 1;
    }

    into_string(out)
}

/// Drop commas that are followed (after optional whitespace) by `}` or `]`.
///
/// Expects comment-free input; run [`strip_comments`] first.
#[must_use]
pub fn strip_trailing_commas(input: &str) -> String {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut out = Vec::with_capacity(len);
    let mut i = 0;

    while i < len {
        let ch = bytes[i];

        if ch == b'"' {
            i = copy_string(bytes, i, &mut out);
            continue;
        }

        if ch == b',' {
            let next = bytes[i + 1..]
                .iter()
                .find(|b| !b.is_ascii_whitespace())
                .copied();
            if matches!(next, Some(b'}' | b']')) {
                i += 1;
                continue;
            }
        }

        out.push(ch);
        i += 1;
    }

    into_string(out)
}

/// Copy a string literal starting at the opening quote at `start`.
///
/// Returns the index just past the closing quote (or `bytes.len()` if the
/// literal is unterminated).
fn copy_string(bytes: &[u8], start: usize, out: &mut Vec<u8>) -> usize {
    let len = bytes.len();
    out.push(b'"');
    let mut i = start + 1;
    while i < len {
        let c = bytes[i];
        out.push(c);
        i += 1;
        if c == b'\\' && i < len {
            out.push(bytes[i]);
            i += 1;
        } else if c == b'"' {
            break;
        }
    }
    i
}

// Only ASCII sequences are ever removed, so valid UTF-8 input stays valid.
fn into_string(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}
