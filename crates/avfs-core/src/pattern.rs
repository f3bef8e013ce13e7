// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Shell-style pattern matching: `*`, `?`, `[...]` classes with `^`
//! negation, and `\` escapes on the POSIX personality only.
//!
//! Matching works on raw bytes and decodes full UTF-8 runes only where the
//! semantics demand it (`?` and character-class bounds), so multi-byte
//! components behave exactly like single-byte ones.

use crate::errors::FsError;
use crate::path_utils::PathUtils;
use crate::OsType;

/// Decodes the first UTF-8 rune of `b`, returning it with its byte length.
fn first_char(b: &[u8]) -> Option<(char, usize)> {
    for n in 1..=b.len().min(4) {
        if let Ok(s) = std::str::from_utf8(&b[..n]) {
            if let Some(c) = s.chars().next() {
                return Some((c, n));
            }
        }
    }

    None
}

impl PathUtils {
    /// Reports whether `name` matches the shell pattern. A malformed
    /// pattern yields [`FsError::BadPattern`].
    pub fn match_pattern(self, pattern: &str, name: &str) -> Result<bool, FsError> {
        let sep = self.separator();
        let mut pattern = pattern.as_bytes();
        let mut name = name.as_bytes();

        'pattern: while !pattern.is_empty() {
            let (star, chunk, rest) = scan_chunk(self, pattern);
            pattern = rest;

            if star && chunk.is_empty() {
                // Trailing * matches the rest unless it spans a separator.
                return Ok(!name.contains(&sep));
            }

            // Look for a match at the current position.
            if let Some(t) = match_chunk(self, chunk, name)? {
                if t.is_empty() || !pattern.is_empty() {
                    name = t;
                    continue 'pattern;
                }
            }

            if star {
                // Look for a match skipping i+1 bytes.
                let mut i = 0;
                while i < name.len() && name[i] != sep {
                    if let Some(t) = match_chunk(self, chunk, &name[i + 1..])? {
                        if pattern.is_empty() && !t.is_empty() {
                            i += 1;
                            continue;
                        }
                        name = t;
                        continue 'pattern;
                    }
                    i += 1;
                }
            }

            // Before failing, check that the rest of the pattern is valid.
            while !pattern.is_empty() {
                let (_, chunk, rest) = scan_chunk(self, pattern);
                pattern = rest;
                match_chunk(self, chunk, b"")?;
            }

            return Ok(false);
        }

        Ok(name.is_empty())
    }

    /// Splits a temp-name pattern at its last `*`: the part before becomes
    /// the prefix, the part after the suffix. Patterns containing a path
    /// separator are rejected.
    pub fn prefix_and_suffix(self, pattern: &str) -> Result<(&str, &str), FsError> {
        if pattern.bytes().any(|b| self.is_path_separator(b)) {
            return Err(FsError::PatternHasSeparator);
        }

        match pattern.rfind('*') {
            Some(pos) => Ok((&pattern[..pos], &pattern[pos + 1..])),
            None => Ok((pattern, "")),
        }
    }

    /// True if the path contains any of the magic pattern characters.
    pub fn has_meta(self, path: &str) -> bool {
        let magic: &[u8] = match self.os_type() {
            OsType::Windows => b"*?[",
            OsType::Linux => b"*?[\\",
        };

        path.bytes().any(|b| magic.contains(&b))
    }
}

/// Gets the next segment of `pattern`: a non-star chunk possibly preceded
/// by stars.
fn scan_chunk(ut: PathUtils, mut pattern: &[u8]) -> (bool, &[u8], &[u8]) {
    let mut star = false;
    while !pattern.is_empty() && pattern[0] == b'*' {
        pattern = &pattern[1..];
        star = true;
    }

    let mut in_range = false;
    let mut i = 0;

    while i < pattern.len() {
        match pattern[i] {
            b'\\' if ut.os_type() != OsType::Windows => {
                // Error check handled in match_chunk: bad pattern.
                if i + 1 < pattern.len() {
                    i += 1;
                }
            }
            b'[' => in_range = true,
            b']' => in_range = false,
            b'*' if !in_range => break,
            _ => {}
        }
        i += 1;
    }

    (star, &pattern[..i], &pattern[i..])
}

/// Checks whether `chunk` matches the beginning of `s`; on success returns
/// the remainder of `s`. The chunk holds only single-rune operators:
/// literals, classes and `?`.
fn match_chunk<'a>(
    ut: PathUtils,
    mut chunk: &[u8],
    mut s: &'a [u8],
) -> Result<Option<&'a [u8]>, FsError> {
    // Once the match fails the loop keeps consuming the chunk, checking
    // only that the pattern is well-formed.
    let mut failed = false;

    while !chunk.is_empty() {
        if !failed && s.is_empty() {
            failed = true;
        }

        match chunk[0] {
            b'[' => {
                let mut r = '\0';
                if !failed {
                    let (c, n) = first_char(s).ok_or(FsError::BadPattern)?;
                    r = c;
                    s = &s[n..];
                }

                chunk = &chunk[1..];

                let mut negated = false;
                if !chunk.is_empty() && chunk[0] == b'^' {
                    negated = true;
                    chunk = &chunk[1..];
                }

                let mut matched = false;
                let mut nrange = 0;
                loop {
                    if !chunk.is_empty() && chunk[0] == b']' && nrange > 0 {
                        chunk = &chunk[1..];
                        break;
                    }

                    let (lo, rest) = get_esc(ut, chunk)?;
                    chunk = rest;

                    let mut hi = lo;
                    if chunk[0] == b'-' {
                        let (h, rest) = get_esc(ut, &chunk[1..])?;
                        hi = h;
                        chunk = rest;
                    }

                    if lo <= r && r <= hi {
                        matched = true;
                    }
                    nrange += 1;
                }

                if matched == negated {
                    failed = true;
                }
            }
            b'?' => {
                if !failed {
                    if s[0] == ut.separator() {
                        failed = true;
                    }
                    let (_, n) = first_char(s).ok_or(FsError::BadPattern)?;
                    s = &s[n..];
                }
                chunk = &chunk[1..];
            }
            b'\\' if ut.os_type() != OsType::Windows => {
                chunk = &chunk[1..];
                if chunk.is_empty() {
                    return Err(FsError::BadPattern);
                }
                if !failed {
                    if chunk[0] != s[0] {
                        failed = true;
                    }
                    s = &s[1..];
                }
                chunk = &chunk[1..];
            }
            _ => {
                if !failed {
                    if chunk[0] != s[0] {
                        failed = true;
                    }
                    s = &s[1..];
                }
                chunk = &chunk[1..];
            }
        }
    }

    if failed {
        Ok(None)
    } else {
        Ok(Some(s))
    }
}

/// Gets a possibly-escaped rune from a character class.
fn get_esc(ut: PathUtils, mut chunk: &[u8]) -> Result<(char, &[u8]), FsError> {
    if chunk.is_empty() || chunk[0] == b'-' || chunk[0] == b']' {
        return Err(FsError::BadPattern);
    }

    if chunk[0] == b'\\' && ut.os_type() != OsType::Windows {
        chunk = &chunk[1..];
        if chunk.is_empty() {
            return Err(FsError::BadPattern);
        }
    }

    let (r, n) = first_char(chunk).ok_or(FsError::BadPattern)?;
    let nchunk = &chunk[n..];
    if nchunk.is_empty() {
        return Err(FsError::BadPattern);
    }

    Ok((r, nchunk))
}
