// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Lexical path manipulation for both personalities.
//!
//! All functions are pure and operate on `&str`: virtual paths follow the
//! backend's personality, not the host OS, so `std::path` would get the
//! separator wrong half the time. Non-ASCII components pass through
//! untouched because every structural byte (separators, dots, colons) is
//! ASCII.

use crate::{OsType, DEFAULT_VOLUME};

/// Lexical path operations parameterised by personality.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathUtils {
    os_type: OsType,
}

/// Reserved Windows file names, rejected at create time.
/// Search for PRN in the Microsoft file-naming documentation for the list.
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", //
    "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9", //
    "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

fn is_slash(c: u8) -> bool {
    c == b'\\' || c == b'/'
}

impl PathUtils {
    pub const fn new(os_type: OsType) -> Self {
        PathUtils { os_type }
    }

    pub const fn os_type(self) -> OsType {
        self.os_type
    }

    pub const fn separator(self) -> u8 {
        self.os_type.path_separator()
    }

    /// True if `c` separates path elements. The Windows personality accepts
    /// both slashes on input.
    pub fn is_path_separator(self, c: u8) -> bool {
        match self.os_type {
            OsType::Linux => c == b'/',
            OsType::Windows => is_slash(c),
        }
    }

    /// Replaces each slash with the personality separator.
    pub fn from_slash(self, path: &str) -> String {
        match self.os_type {
            OsType::Linux => path.to_string(),
            OsType::Windows => path.replace('/', "\\"),
        }
    }

    /// Replaces each personality separator with a slash.
    pub fn to_slash(self, path: &str) -> String {
        match self.os_type {
            OsType::Linux => path.to_string(),
            OsType::Windows => path.replace('\\', "/"),
        }
    }

    /// Length of the leading volume name: 2 for `C:`, the index just past
    /// the share for `\\server\share`, 0 on the POSIX personality.
    pub fn volume_name_len(self, path: &str) -> usize {
        if self.os_type != OsType::Windows {
            return 0;
        }

        let b = path.as_bytes();
        if b.len() < 2 {
            return 0;
        }

        // Drive letter.
        if b[1] == b':' && b[0].is_ascii_alphabetic() {
            return 2;
        }

        // UNC: leading `\\`, a server name, one slash, a share name.
        let l = b.len();
        if l >= 5 && is_slash(b[0]) && is_slash(b[1]) && !is_slash(b[2]) && b[2] != b'.' {
            let mut n = 3;
            while n < l - 1 {
                if is_slash(b[n]) {
                    n += 1;
                    if !is_slash(b[n]) {
                        if b[n] == b'.' {
                            break;
                        }
                        while n < l && !is_slash(b[n]) {
                            n += 1;
                        }
                        return n;
                    }
                    break;
                }
                n += 1;
            }
        }

        0
    }

    /// The leading volume name, if any.
    pub fn volume_name(self, path: &str) -> &str {
        &path[..self.volume_name_len(path)]
    }

    /// Reports whether the path is absolute.
    pub fn is_abs(self, path: &str) -> bool {
        match self.os_type {
            OsType::Linux => path.starts_with('/'),
            OsType::Windows => {
                let l = self.volume_name_len(path);
                if l == 0 {
                    return false;
                }
                let b = path.as_bytes();
                if is_slash(b[0]) && is_slash(b[1]) {
                    return true;
                }
                match path.as_bytes().get(l) {
                    Some(&c) => is_slash(c),
                    None => false,
                }
            }
        }
    }

    /// Returns the shortest path equivalent to `path` by purely lexical
    /// processing: collapse separators, drop `.` elements, resolve `..`
    /// without crossing the root, keep a trailing separator only on a bare
    /// root. An empty result becomes `.`.
    pub fn clean(self, path: &str) -> String {
        let original = path;
        let vol_len = self.volume_name_len(path);
        let path = &original[vol_len..];

        if path.is_empty() {
            if vol_len > 1 && original.as_bytes()[1] != b':' {
                // UNC volume name only.
                return self.from_slash(original);
            }
            return format!("{original}.");
        }

        let bytes = path.as_bytes();
        let rooted = self.is_path_separator(bytes[0]);
        let n = bytes.len();
        let sep = self.separator();

        let mut out = LazyBuf::new(bytes);
        let (mut r, mut dotdot) = (0usize, 0usize);
        if rooted {
            out.append(sep);
            r = 1;
            dotdot = 1;
        }

        while r < n {
            if self.is_path_separator(bytes[r]) {
                // Empty path element.
                r += 1;
            } else if bytes[r] == b'.' && (r + 1 == n || self.is_path_separator(bytes[r + 1])) {
                // `.` element.
                r += 1;
            } else if bytes[r] == b'.'
                && bytes[r + 1] == b'.'
                && (r + 2 == n || self.is_path_separator(bytes[r + 2]))
            {
                // `..` element: remove to the last separator.
                r += 2;
                if out.w > dotdot {
                    out.w -= 1;
                    while out.w > dotdot && !self.is_path_separator(out.index(out.w)) {
                        out.w -= 1;
                    }
                } else if !rooted {
                    // Cannot back up; keep the `..`.
                    if out.w > 0 {
                        out.append(sep);
                    }
                    out.append(b'.');
                    out.append(b'.');
                    dotdot = out.w;
                }
            } else {
                // Real path element; add a separator if needed.
                if rooted && out.w != 1 || !rooted && out.w != 0 {
                    out.append(sep);
                }
                while r < n && !self.is_path_separator(bytes[r]) {
                    out.append(bytes[r]);
                    r += 1;
                }
            }
        }

        if out.w == 0 {
            out.append(b'.');
        }

        self.from_slash(&format!("{}{}", &original[..vol_len], out.as_str()))
    }

    /// Joins the non-empty elements with the separator and cleans the
    /// result. Joining nothing yields the empty string.
    pub fn join(self, elems: &[&str]) -> String {
        for (i, e) in elems.iter().enumerate() {
            if !e.is_empty() {
                let sep = (self.separator() as char).to_string();
                return self.clean(&elems[i..].join(&sep));
            }
        }

        String::new()
    }

    /// Splits the path immediately after the final separator. The directory
    /// half keeps its trailing separator; the file half never contains one.
    pub fn split(self, path: &str) -> (&str, &str) {
        let vol_len = self.volume_name_len(path);
        let b = path.as_bytes();

        let mut i = b.len();
        while i > vol_len && !self.is_path_separator(b[i - 1]) {
            i -= 1;
        }

        (&path[..i], &path[i..])
    }

    /// The last element of the path after trailing separators are removed.
    /// An empty path yields `.`; an all-separator path yields the separator.
    pub fn base(self, path: &str) -> String {
        if path.is_empty() {
            return ".".to_string();
        }

        let mut path = path;
        while !path.is_empty() && self.is_path_separator(path.as_bytes()[path.len() - 1]) {
            path = &path[..path.len() - 1];
        }

        path = &path[self.volume_name_len(path)..];

        if let Some(i) = path.bytes().rposition(|c| self.is_path_separator(c)) {
            path = &path[i + 1..];
        }

        if path.is_empty() {
            return (self.separator() as char).to_string();
        }

        path.to_string()
    }

    /// Everything but the last element, cleaned.
    pub fn dir(self, path: &str) -> String {
        let vol_len = self.volume_name_len(path);
        let b = path.as_bytes();

        let mut i = path.len() as isize - 1;
        while i >= vol_len as isize && !self.is_path_separator(b[i as usize]) {
            i -= 1;
        }

        let end = ((i + 1).max(vol_len as isize)) as usize;
        let dir = self.clean(&path[vol_len..end]);
        if dir == "." && vol_len > 2 {
            // UNC volume with nothing below it.
            return path[..vol_len].to_string();
        }

        format!("{}{}", &path[..vol_len], dir)
    }

    /// Makes `path` absolute against `cur_dir` and cleans it.
    pub fn abs(self, cur_dir: &str, path: &str) -> String {
        if self.is_abs(path) {
            return self.clean(path);
        }

        if self.os_type == OsType::Windows && path.as_bytes().first().copied().is_some_and(is_slash)
        {
            // Rooted but volume-less: borrow the working directory's volume.
            return self.clean(&format!("{}{}", self.volume_name(cur_dir), path));
        }

        self.join(&[cur_dir, path])
    }

    /// Converts a Unix-style test path to this personality: on Windows an
    /// absolute path gains the default volume and flips its separators.
    pub fn from_unix_path(self, path: &str) -> String {
        if self.os_type != OsType::Windows {
            return self.clean(path);
        }

        if path.starts_with('/') {
            self.join(&[DEFAULT_VOLUME, &self.from_slash(path)])
        } else {
            self.clean(&self.from_slash(path))
        }
    }

    /// True if `name` is one of the Windows reserved device names.
    pub fn is_reserved_name(self, name: &str) -> bool {
        self.os_type == OsType::Windows
            && !name.is_empty()
            && RESERVED_NAMES.iter().any(|r| name.eq_ignore_ascii_case(r))
    }
}

/// A lazily constructed path buffer: no allocation happens until the output
/// diverges from the input.
struct LazyBuf<'a> {
    path: &'a [u8],
    buf: Option<Vec<u8>>,
    w: usize,
}

impl<'a> LazyBuf<'a> {
    fn new(path: &'a [u8]) -> Self {
        LazyBuf { path, buf: None, w: 0 }
    }

    fn index(&self, i: usize) -> u8 {
        match &self.buf {
            Some(buf) => buf[i],
            None => self.path[i],
        }
    }

    fn append(&mut self, c: u8) {
        if self.buf.is_none() {
            if self.w < self.path.len() && self.path[self.w] == c {
                self.w += 1;
                return;
            }
            let mut buf = vec![0u8; self.path.len()];
            buf[..self.w].copy_from_slice(&self.path[..self.w]);
            self.buf = Some(buf);
        }

        let buf = self.buf.as_mut().expect("buffer allocated above");
        buf[self.w] = c;
        self.w += 1;
    }

    fn as_str(&self) -> &str {
        let bytes = match &self.buf {
            Some(buf) => &buf[..self.w],
            None => &self.path[..self.w],
        };

        std::str::from_utf8(bytes).expect("clean preserves UTF-8")
    }
}
