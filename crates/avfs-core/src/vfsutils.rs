// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Operations expressible over any [`Vfs`], used as the default bodies of
//! the convenience trait methods.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::{FsError, PathError};
use crate::types::{FileMode, OpenOptions};
use crate::vfs::{Vfs, VfsFile};
use crate::{FileInfo, OsType};

/// Reads the whole file.
pub fn read_file<V: Vfs + ?Sized>(vfs: &V, name: &str) -> Result<Vec<u8>, PathError> {
    let f = vfs.open(name)?;

    let mut data = Vec::new();
    let mut buf = [0u8; 32 * 1024];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
    }

    f.close()?;

    Ok(data)
}

/// Writes `data` to the named file, creating it with `perm` or truncating
/// an existing one.
pub fn write_file<V: Vfs + ?Sized>(
    vfs: &V,
    name: &str,
    data: &[u8],
    perm: FileMode,
) -> Result<(), PathError> {
    let flags = OpenOptions { write: true, create: true, truncate: true, ..Default::default() };
    let f = vfs.open_file(name, flags, perm)?;

    let mut written = 0;
    while written < data.len() {
        written += f.write(&data[written..])?;
    }

    f.close()
}

/// The directory's entries sorted by name.
pub fn read_dir<V: Vfs + ?Sized>(vfs: &V, name: &str) -> Result<Vec<FileInfo>, PathError> {
    let f = vfs.open(name)?;
    let result = f.readdir(-1);
    f.close()?;

    let mut infos = result?;
    infos.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(infos)
}

/// Returns the names of all files matching `pattern`, in lexical order.
/// I/O errors while reading directories are ignored; the only possible
/// failure is a malformed pattern.
pub fn glob<V: Vfs + ?Sized>(vfs: &V, pattern: &str) -> Result<Vec<String>, FsError> {
    let ut = vfs.utils();

    if !ut.has_meta(pattern) {
        // Still validate the pattern syntax.
        ut.match_pattern(pattern, "")?;
        if vfs.lstat(pattern).is_err() {
            return Ok(Vec::new());
        }

        return Ok(vec![pattern.to_string()]);
    }

    let (dir, file) = ut.split(pattern);
    let (volume_len, dir) = match vfs.os_type() {
        OsType::Windows => clean_glob_path_windows(vfs, dir),
        OsType::Linux => (0, clean_glob_path(vfs, dir)),
    };

    if !ut.has_meta(&dir[volume_len..]) {
        let mut matches = Vec::new();
        glob_in_dir(vfs, &dir, file, &mut matches)?;

        return Ok(matches);
    }

    // Prevent infinite recursion.
    if dir == pattern {
        return Err(FsError::BadPattern);
    }

    let mut matches = Vec::new();
    for d in glob(vfs, &dir)? {
        glob_in_dir(vfs, &d, file, &mut matches)?;
    }

    Ok(matches)
}

/// Prepares a path for glob matching.
fn clean_glob_path<V: Vfs + ?Sized>(vfs: &V, path: &str) -> String {
    let sep = vfs.utils().separator() as char;

    if path.is_empty() {
        ".".to_string()
    } else if path == sep.to_string().as_str() {
        path.to_string()
    } else {
        path[..path.len() - 1].to_string() // chop off trailing separator
    }
}

/// Windows version of [`clean_glob_path`], keeping the volume intact.
fn clean_glob_path_windows<V: Vfs + ?Sized>(vfs: &V, path: &str) -> (usize, String) {
    let ut = vfs.utils();
    let mut vol_len = ut.volume_name_len(path);

    if path.is_empty() {
        (0, ".".to_string())
    } else if vol_len + 1 == path.len() && ut.is_path_separator(path.as_bytes()[path.len() - 1]) {
        // `\`, `C:\` and `C:/`.
        (vol_len + 1, path.to_string())
    } else if vol_len == path.len() && path.len() == 2 {
        // `C:` becomes `C:.`.
        (vol_len, format!("{path}."))
    } else {
        if vol_len >= path.len() {
            vol_len = path.len() - 1;
        }
        (vol_len, path[..path.len() - 1].to_string())
    }
}

/// Appends the names in `dir` matching `pattern` to `matches`, in lexical
/// order. Directories that cannot be read are silently skipped.
fn glob_in_dir<V: Vfs + ?Sized>(
    vfs: &V,
    dir: &str,
    pattern: &str,
    matches: &mut Vec<String>,
) -> Result<(), FsError> {
    let ut = vfs.utils();

    let Ok(info) = vfs.stat(dir) else {
        return Ok(()); // ignore I/O error
    };
    if !info.is_dir() {
        return Ok(()); // ignore I/O error
    }

    let Ok(d) = vfs.open(dir) else {
        return Ok(()); // ignore I/O error
    };
    let mut names = d.readdirnames(-1).unwrap_or_default();
    let _ = d.close();
    names.sort();

    for name in names {
        if ut.match_pattern(pattern, &name)? {
            matches.push(ut.join(&[dir, &name]));
        }
    }

    Ok(())
}

/// Walks the tree rooted at `root` depth-first, directories before their
/// contents, children in lexical order. Symbolic links are reported but not
/// followed.
pub fn walk<V: Vfs + ?Sized>(
    vfs: &V,
    root: &str,
    visit: &mut dyn FnMut(&str, &FileInfo),
) -> Result<(), PathError> {
    let info = vfs.lstat(root)?;

    walk_inner(vfs, root, info, visit)
}

fn walk_inner<V: Vfs + ?Sized>(
    vfs: &V,
    path: &str,
    info: FileInfo,
    visit: &mut dyn FnMut(&str, &FileInfo),
) -> Result<(), PathError> {
    let is_dir = info.is_dir();
    visit(path, &info);

    if is_dir {
        let ut = vfs.utils();
        for entry in vfs.read_dir(path)? {
            let child = ut.join(&[path, &entry.name]);
            walk_inner(vfs, &child, entry, visit)?;
        }
    }

    Ok(())
}

// Random number state for temp names. Seeding on first use keeps the number
// of collision retries low.
static RAND_STATE: Mutex<u32> = Mutex::new(0);

fn reseed() -> u32 {
    let nanos =
        SystemTime::now().duration_since(UNIX_EPOCH).expect("clock before epoch").as_nanos();

    let seed = (nanos as u32).wrapping_add(std::process::id());
    tracing::debug!(seed, "reseeded the temp-name generator");

    seed
}

/// A nine-digit pseudo-random name component.
pub fn next_random() -> String {
    let mut state = RAND_STATE.lock().expect("rand state poisoned");

    let mut r = *state;
    if r == 0 {
        r = reseed();
    }
    r = r.wrapping_mul(1664525).wrapping_add(1013904223); // constants from Numerical Recipes
    *state = r;

    let n = 1_000_000_000 + u64::from(r) % 1_000_000_000;

    n.to_string()[1..].to_string()
}

fn join_name(vfs_sep: u8, dir: &str, name: &str) -> String {
    if dir.is_empty() || dir.as_bytes()[dir.len() - 1] == vfs_sep {
        format!("{dir}{name}")
    } else {
        format!("{dir}{}{name}", vfs_sep as char)
    }
}

/// Creates a new temporary directory and returns its path. The pattern's
/// last `*`, if any, is replaced by the random component.
pub fn mkdir_temp<V: Vfs + ?Sized>(vfs: &V, dir: &str, pattern: &str) -> Result<String, PathError> {
    const OP: &str = "mkdirtemp";

    let ut = vfs.utils();
    let dir = if dir.is_empty() { vfs.temp_dir() } else { dir.to_string() };

    let (prefix, suffix) =
        ut.prefix_and_suffix(pattern).map_err(|err| PathError::new(OP, pattern, err))?;
    let prefix = join_name(ut.separator(), &dir, prefix);
    let exists = crate::OsErrors::new(vfs.os_type()).file_exists;

    let mut tries = 0;
    loop {
        let name = format!("{prefix}{}{suffix}", next_random());
        match vfs.mkdir(&name, FileMode::new(0o700)) {
            Ok(()) => return Ok(name),
            Err(err) if err.err == exists => {
                tries += 1;
                if tries >= 10000 {
                    return Err(PathError { op: OP, ..err });
                }
            }
            Err(err) => return Err(err),
        }
    }
}

/// Creates and opens a new temporary file for reading and writing.
pub fn create_temp<V: Vfs + ?Sized>(
    vfs: &V,
    dir: &str,
    pattern: &str,
) -> Result<Box<dyn VfsFile>, PathError> {
    const OP: &str = "createtemp";

    let ut = vfs.utils();
    let dir = if dir.is_empty() { vfs.temp_dir() } else { dir.to_string() };

    let (prefix, suffix) =
        ut.prefix_and_suffix(pattern).map_err(|err| PathError::new(OP, pattern, err))?;
    let prefix = join_name(ut.separator(), &dir, prefix);
    let exists = crate::OsErrors::new(vfs.os_type()).file_exists;

    let flags = OpenOptions {
        read: true,
        write: true,
        create: true,
        create_new: true,
        ..Default::default()
    };

    let mut tries = 0;
    loop {
        let name = format!("{prefix}{}{suffix}", next_random());
        match vfs.open_file(&name, flags, FileMode::new(0o600)) {
            Ok(f) => return Ok(f),
            Err(err) if err.err == exists => {
                tries += 1;
                if tries >= 10000 {
                    return Err(PathError { op: OP, ..err });
                }
            }
            Err(err) => return Err(err),
        }
    }
}
