//! Shell-style brace expansion for host patterns.
//!
//! Supports comma lists (`web{1,2}`), numeric ranges with optional step and
//! zero padding (`node{01..12..2}`), descending ranges (`{3..1}`), ASCII
//! letter ranges (`rack{a..d}`), nesting, and several groups in one word
//! (expanded as a cartesian product, leftmost group varying slowest).
//! Braces that form no valid group are kept literally.

/// Expand every brace group in `pattern`.
///
/// A pattern without groups yields itself.
#[must_use]
pub fn expand(pattern: &str) -> Vec<String> {
    let Some(group) = find_group(pattern) else {
        return vec![pattern.to_owned()];
    };

    let prefix = &pattern[..group.start];
    let suffix = &pattern[group.end + 1..];
    group
        .alternatives
        .iter()
        .flat_map(|alt| expand(&format!("{prefix}{alt}{suffix}")))
        .collect()
}

#[derive(Debug)]
struct Group {
    /// Byte index of the opening brace.
    start: usize,
    /// Byte index of the closing brace.
    end: usize,
    alternatives: Vec<String>,
}

/// Locate the leftmost brace group that expands to something.
fn find_group(pattern: &str) -> Option<Group> {
    let bytes = pattern.as_bytes();
    for (start, _) in pattern.match_indices('{') {
        let Some(end) = matching_close(bytes, start) else {
            continue;
        };
        let body = &pattern[start + 1..end];
        let alternatives = split_top_level(body)
            .or_else(|| expand_range(body))
            .filter(|alts| !alts.is_empty());
        if let Some(alternatives) = alternatives {
            return Some(Group {
                start,
                end,
                alternatives,
            });
        }
    }
    None
}

fn matching_close(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, byte) in bytes.iter().enumerate().skip(open) {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split `body` on commas outside nested braces; `None` if there are none.
fn split_top_level(body: &str) -> Option<Vec<String>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut last = 0;
    for (idx, ch) in body.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(body[last..idx].to_owned());
                last = idx + 1;
            }
            _ => {}
        }
    }
    if parts.is_empty() {
        return None;
    }
    parts.push(body[last..].to_owned());
    Some(parts)
}

/// Expand `a..b` or `a..b..step`; `None` if `body` is not a range.
fn expand_range(body: &str) -> Option<Vec<String>> {
    let fields: Vec<&str> = body.split("..").collect();
    let (from, to, step) = match fields.as_slice() {
        [from, to] => (*from, *to, 1),
        [from, to, step] => (*from, *to, step.parse::<i64>().ok()?.checked_abs()?),
        _ => return None,
    };
    let step = if step == 0 { 1 } else { step };

    if let (Ok(lo), Ok(hi)) = (from.parse::<i64>(), to.parse::<i64>()) {
        let width = if is_padded(from) || is_padded(to) {
            from.len().max(to.len())
        } else {
            0
        };
        return Some(
            stepped(lo, hi, step)
                .into_iter()
                .map(|n| pad_number(n, width))
                .collect(),
        );
    }

    let (Some(lo), Some(hi)) = (single_letter(from), single_letter(to)) else {
        return None;
    };
    Some(
        stepped(i64::from(lo), i64::from(hi), step)
            .into_iter()
            .filter_map(|n| u8::try_from(n).ok())
            .map(|b| char::from(b).to_string())
            .collect(),
    )
}

fn stepped(from: i64, to: i64, step: i64) -> Vec<i64> {
    let mut out = Vec::new();
    let mut current = Some(from);
    // Stops at the end of the range or where the next step leaves i64.
    while let Some(n) = current.filter(|n| if from <= to { *n <= to } else { *n >= to }) {
        out.push(n);
        current = if from <= to {
            n.checked_add(step)
        } else {
            n.checked_sub(step)
        };
    }
    out
}

fn is_padded(field: &str) -> bool {
    let digits = field.strip_prefix('-').unwrap_or(field);
    digits.len() > 1 && digits.starts_with('0')
}

fn pad_number(n: i64, width: usize) -> String {
    if n < 0 {
        format!("-{:0>pad$}", n.unsigned_abs(), pad = width.saturating_sub(1))
    } else {
        format!("{n:0>width$}")
    }
}

fn single_letter(field: &str) -> Option<u8> {
    match field.as_bytes() {
        [b] if b.is_ascii_alphabetic() => Some(*b),
        _ => None,
    }
}
