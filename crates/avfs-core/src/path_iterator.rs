// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Segment cursor over an absolute path.
//!
//! [`PathIterator`] walks the parts of an absolute path one separator at a
//! time. Unlike a plain split it is mutable: [`PathIterator::replace_part`]
//! rewrites the underlying path in place, which is how the resolver expands
//! symbolic links without recursion.
//!
//! With `thirdPart` as the current part:
//!
//! ```text
//! /firstPart/secondPart/thirdPart/fourthPart/fifthPart
//!                      |-- part --|
//!                    start       end
//! |------- left -------|          |------- right ------|
//! |------ left_part --------------|
//! ```

use crate::path_utils::PathUtils;

/// Iterates through the parts of an absolute path. The volume name (on the
/// Windows personality) is not a part; it is exposed by
/// [`PathIterator::volume_name`].
#[derive(Clone, Debug)]
pub struct PathIterator {
    path: String,
    start: usize,
    end: usize,
    volume_name_len: usize,
    utils: PathUtils,
}

impl PathIterator {
    /// Creates an iterator over an absolute path.
    pub fn new(utils: PathUtils, path: impl Into<String>) -> Self {
        let path = path.into();
        let volume_name_len = utils.volume_name_len(&path);

        let mut pi = PathIterator { path, start: 0, end: 0, volume_name_len, utils };
        pi.reset();

        pi
    }

    /// Advances to the next part. Returns false when the path is exhausted.
    pub fn next(&mut self) -> bool {
        self.start = self.end + 1;
        if self.start >= self.path.len() {
            self.end = self.start;

            return false;
        }

        let sep = self.utils.separator();
        match self.path.as_bytes()[self.start..].iter().position(|&c| c == sep) {
            Some(pos) => self.end = self.start + pos,
            None => self.end = self.path.len(),
        }

        true
    }

    /// The current part.
    pub fn part(&self) -> &str {
        &self.path[self.start..self.end]
    }

    /// True if the current part is the last one.
    pub fn is_last(&self) -> bool {
        self.end == self.path.len()
    }

    /// The path before the current part.
    pub fn left(&self) -> &str {
        &self.path[..self.start]
    }

    /// The path up to and including the current part.
    pub fn left_part(&self) -> &str {
        &self.path[..self.end]
    }

    /// The path after the current part.
    pub fn right(&self) -> &str {
        &self.path[self.end..]
    }

    /// The current part and everything after it.
    pub fn right_part(&self) -> &str {
        &self.path[self.start..]
    }

    /// The whole path being iterated.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The leading volume name (empty on the POSIX personality).
    pub fn volume_name(&self) -> &str {
        &self.path[..self.volume_name_len]
    }

    pub fn volume_name_len(&self) -> usize {
        self.volume_name_len
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Replaces the current part with `new_path`, splicing the remainder of
    /// the path behind it. Used for symbolic-link expansion: an absolute
    /// target restarts iteration from the root (returns true), a relative
    /// target resumes just before the spliced-in segments (returns false).
    pub fn replace_part(&mut self, new_path: &str) -> bool {
        let ut = self.utils;
        let old_path = std::mem::take(&mut self.path);

        if ut.is_abs(new_path) {
            self.path = ut.join(&[new_path, &old_path[self.end..]]);
        } else {
            self.path = ut.join(&[&old_path[..self.start], new_path, &old_path[self.end..]]);
        }

        // If the path before the current part changed, restart. Compare
        // bytes: the new path need not share char boundaries with the old.
        if self.start >= self.path.len()
            || self.path.as_bytes()[..self.start] != old_path.as_bytes()[..self.start]
        {
            self.volume_name_len = ut.volume_name_len(&self.path);
            self.reset();

            return true;
        }

        // Resume from the part preceding the replaced one.
        self.end = self.start - 1;

        false
    }

    /// Rewinds to just past the volume name.
    pub fn reset(&mut self) {
        self.end = self.volume_name_len;
    }
}
