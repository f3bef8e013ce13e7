// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Conformance-style tests for the in-memory backend, exercised through the
//! `Vfs` trait surface only.

use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use avfs_core::{
    Features, FileMode, FsError, IdentityMgr, LinkError, LinuxError, OpenOptions, OsType,
    PathError, Vfs, Whence, WindowsError,
};
use avfs_memfs::MemFs;
use avfs_memidm::MemIdm;

/// The fixture tree shared by several tests, mirroring the conformance
/// suite: directories with assorted modes, small files, and a symlink
/// chain several hops deep.
const DIRS: &[(&str, u32)] = &[
    ("/A", 0o777),
    ("/B", 0o755),
    ("/B/1", 0o755),
    ("/B/1/D", 0o700),
    ("/B/1/E", 0o755),
    ("/B/2", 0o750),
    ("/B/2/F", 0o755),
    ("/B/2/F/3", 0o755),
    ("/B/2/F/3/G", 0o777),
    ("/B/2/F/3/G/4", 0o777),
    ("/C", 0o750),
    ("/C/5", 0o750),
];

const FILES: &[(&str, u32, &str)] = &[
    ("/file.txt", 0o644, "file"),
    ("/A/afile1.txt", 0o777, "afile1"),
    ("/A/afile2.txt", 0o644, "afile2"),
    ("/A/afile3.txt", 0o600, "afile3"),
    ("/B/1/1file.txt", 0o644, "1file"),
    ("/B/1/E/efile.txt", 0o644, "efile"),
    ("/B/2/F/3/3file1.txt", 0o640, "3file1"),
    ("/B/2/F/3/3file2.txt", 0o644, "3file2"),
    ("/B/2/F/3/G/4/4file.txt", 0o644, "4file"),
    ("/C/cfile.txt", 0o644, "cfile"),
];

/// (new_name, target) pairs; targets are stored uninterpreted.
const SYMLINKS: &[(&str, &str)] = &[
    ("/A/lroot", "/"),
    ("/lC", "/C"),
    ("/B/1/lafile2.txt", "/A/afile2.txt"),
    ("/B/2/lf", "/B/2/F"),
    ("/B/2/F/3/llf", "/B/2/lf"),
    ("/C/lllf", "/B/2/F/3/llf"),
    ("/A/l3file2.txt", "/C/lllf/3/3file2.txt"),
    ("/C/lNonExist", "/A/path/to/a/non/existing/file"),
];

fn linux_fs() -> MemFs {
    let fs = MemFs::builder().os_type(OsType::Linux).build();
    fs.set_umask(FileMode::new(0o022));
    fs
}

fn windows_fs() -> MemFs {
    let fs = MemFs::builder().os_type(OsType::Windows).build();
    fs.set_umask(FileMode::new(0o022));
    fs
}

fn create_fixture(fs: &MemFs) {
    fs.set_umask(FileMode::new(0));
    for (path, mode) in DIRS {
        fs.mkdir(path, FileMode::new(*mode)).expect("fixture mkdir");
    }
    for (path, mode, content) in FILES {
        fs.write_file(path, content.as_bytes(), FileMode::new(*mode)).expect("fixture write");
    }
    for (new_name, target) in SYMLINKS {
        fs.symlink(target, new_name).expect("fixture symlink");
    }
    fs.set_umask(FileMode::new(0o022));
}

#[test]
fn s1_mkdir_all_applies_the_umask_at_every_level() {
    let fs = linux_fs();
    fs.mkdir_all("/H/6/I/7/J/8", FileMode::new(0o777)).expect("mkdir_all");

    for path in ["/H", "/H/6", "/H/6/I", "/H/6/I/7", "/H/6/I/7/J", "/H/6/I/7/J/8"] {
        let info = fs.stat(path).expect("ancestor exists");
        assert!(info.is_dir());
        assert_eq!(info.mode.perm(), FileMode::new(0o755), "{path}");
    }

    // Idempotent on an existing tree.
    fs.mkdir_all("/H/6/I/7/J/8", FileMode::new(0o777)).expect("mkdir_all again");

    // A file in the way is not a directory.
    fs.write_file("/H/f", b"", FileMode::new(0o644)).expect("write");
    let err = fs.mkdir_all("/H/f/deeper", FileMode::new(0o777)).expect_err("file in the way");
    assert_eq!(err.err, FsError::Linux(LinuxError::NotADirectory));
}

#[test]
fn s2_append_extends_the_existing_content() {
    let fs = linux_fs();
    fs.write_file("/f.txt", b"AAABBBCCCDDD", FileMode::new(0o644)).expect("write");

    let flags = OpenOptions { write: true, append: true, ..Default::default() };
    let f = fs.open_file("/f.txt", flags, FileMode::new(0o644)).expect("open for append");
    f.write(b"whatever").expect("append");
    f.close().expect("close");

    assert_eq!(fs.read_file("/f.txt").expect("read"), b"AAABBBCCCDDDwhatever");
}

#[test]
fn s3_eval_symlinks_resolves_the_whole_chain() {
    let fs = linux_fs();
    create_fixture(&fs);

    assert_eq!(
        fs.eval_symlinks("/A/l3file2.txt").expect("chain resolves"),
        "/B/2/F/3/3file2.txt",
    );
    assert_eq!(fs.eval_symlinks("/C/lllf/3/3file1.txt").expect("resolves"), "/B/2/F/3/3file1.txt");
    assert_eq!(fs.eval_symlinks("/").expect("root resolves"), "/");

    // A dangling link reports the first missing component, as an lstat.
    let err = fs.eval_symlinks("/C/lNonExist").expect_err("dangling");
    assert_eq!(
        err,
        PathError::new("lstat", "/A/path", FsError::Linux(LinuxError::NoSuchFileOrDir)),
    );
}

#[test]
fn s4_truncate_beyond_eof_zero_fills() {
    let fs = linux_fs();
    fs.write_file("/d.txt", b"AAABBBCCCDDD", FileMode::new(0o644)).expect("write");

    fs.truncate("/d.txt", 24).expect("truncate");
    assert_eq!(fs.stat("/d.txt").expect("stat").size, 24);

    let mut want = b"AAABBBCCCDDD".to_vec();
    want.extend_from_slice(&[0u8; 12]);
    assert_eq!(fs.read_file("/d.txt").expect("read"), want);
}

#[test]
fn s5_remove_all_of_a_missing_path_succeeds() {
    let fs = linux_fs();
    fs.remove_all("/does/not/exist").expect("missing target is success");

    let win = windows_fs();
    win.remove_all("C:\\does\\not\\exist").expect("missing target is success");
}

#[test]
fn s6_windows_reserved_names_are_refused_at_create() {
    let fs = windows_fs();

    let err = fs.create("CON").expect_err("reserved device name");
    assert_eq!(err.op, "open");
    assert_eq!(err.err, FsError::Windows(WindowsError::FileExists));

    for name in ["prn", "NUL", "COM1", "lpt9"] {
        fs.create(name).expect_err(name);
    }

    let err = fs.mkdir("C:\\AUX", FileMode::new(0o777)).expect_err("reserved dir name");
    assert_eq!(err.err, FsError::Windows(WindowsError::FileExists));

    // Nearby names are ordinary.
    fs.create("CONSOLE").expect("not reserved").close().expect("close");
}

#[test]
fn written_bytes_round_trip() {
    let fs = linux_fs();

    for (i, content) in
        [&b""[..], b"x", b"hello world", &[0u8, 1, 2, 3, 255, 254][..]].iter().enumerate()
    {
        let path = format!("/data{i}");
        fs.write_file(&path, content, FileMode::new(0o644)).expect("write");
        assert_eq!(&fs.read_file(&path).expect("read"), content);
    }
}

#[test]
fn created_modes_are_masked_but_chmod_is_not() {
    let fs = linux_fs();

    for (umask, requested, want) in [
        (0o022u32, 0o777u32, 0o755u32),
        (0o022, 0o666, 0o644),
        (0o077, 0o777, 0o700),
        (0o000, 0o640, 0o640),
    ] {
        fs.set_umask(FileMode::new(umask));
        let dir = format!("/d{umask:o}-{requested:o}");
        fs.mkdir(&dir, FileMode::new(requested)).expect("mkdir");
        assert_eq!(fs.stat(&dir).expect("stat").mode.perm(), FileMode::new(want));

        let file = format!("/f{umask:o}-{requested:o}");
        fs.write_file(&file, b"", FileMode::new(requested)).expect("write");
        assert_eq!(fs.stat(&file).expect("stat").mode.perm(), FileMode::new(want));
    }

    // Umask applies only at creation.
    fs.set_umask(FileMode::new(0o077));
    fs.chmod("/d22-777", FileMode::new(0o777)).expect("chmod");
    assert_eq!(fs.stat("/d22-777").expect("stat").mode.perm(), FileMode::new(0o777));
}

#[test]
fn hard_links_share_content_and_identity() {
    let fs = linux_fs();
    fs.write_file("/a", b"original", FileMode::new(0o644)).expect("write");

    fs.link("/a", "/b").expect("link");
    assert_eq!(fs.stat("/a").expect("stat").nlink, 2);

    // A mutation through one name is visible through the other.
    fs.write_file("/a", b"mutated", FileMode::new(0o644)).expect("rewrite");
    assert_eq!(fs.read_file("/b").expect("read"), b"mutated");

    let fi_a = fs.stat("/a").expect("stat");
    let fi_b = fs.stat("/b").expect("stat");
    assert!(fs.same_file(&fi_a, &fi_b));

    // A symlink is its own node under lstat.
    fs.symlink("/a", "/la").expect("symlink");
    let fi_l = fs.lstat("/la").expect("lstat");
    assert!(!fs.same_file(&fi_a, &fi_l));
    let fi_followed = fs.stat("/la").expect("stat follows");
    assert!(fs.same_file(&fi_a, &fi_followed));

    // Content survives dropping the original name.
    fs.remove("/a").expect("remove");
    assert_eq!(fs.read_file("/b").expect("read"), b"mutated");
    assert_eq!(fs.stat("/b").expect("stat").nlink, 1);

    // Directories cannot be hard-linked.
    fs.mkdir("/dir", FileMode::new(0o755)).expect("mkdir");
    let err = fs.link("/dir", "/dir2").expect_err("directory link");
    assert_eq!(
        err,
        LinkError::new("link", "/dir", "/dir2", FsError::Linux(LinuxError::OpNotPermitted)),
    );
}

#[test]
fn readlink_returns_the_target_verbatim() {
    let fs = linux_fs();
    fs.mkdir("/d", FileMode::new(0o755)).expect("mkdir");

    for target in ["/x/y", "rel/target", "../..", "/A/path/to/a/non/existing/file", "नमस्ते"] {
        let link = format!("/d/l{}", fs.utils().base(target));
        fs.symlink(target, &link).expect("symlink");
        assert_eq!(fs.readlink(&link).expect("readlink"), *target);
    }

    let err = fs.readlink("/d").expect_err("not a symlink");
    assert_eq!(err, PathError::new("readlink", "/d", FsError::Linux(LinuxError::InvalidArgument)));
}

#[test]
fn remove_all_erases_every_descendant() {
    let fs = linux_fs();
    create_fixture(&fs);

    fs.remove_all("/B").expect("remove_all");

    for path in ["/B", "/B/1", "/B/1/E/efile.txt", "/B/2/F/3", "/B/2/F/3/G/4/4file.txt"] {
        let err = fs.stat(path).expect_err("gone");
        assert_eq!(
            err,
            PathError::new("stat", path, FsError::Linux(LinuxError::NoSuchFileOrDir)),
            "{path}",
        );
    }

    // Unrelated parts of the tree survive.
    fs.stat("/A/afile1.txt").expect("untouched");
}

#[test]
fn rename_moves_directories_and_replaces_files() {
    let fs = linux_fs();
    create_fixture(&fs);

    fs.rename("/B/2/F/3/G", "/A/G2").expect("rename dir");
    fs.stat("/B/2/F/3/G").expect_err("old path gone");
    assert_eq!(fs.read_file("/A/G2/4/4file.txt").expect("moved content"), b"4file");

    // Replacing an existing file frees the old node.
    fs.rename("/A/afile1.txt", "/A/afile2.txt").expect("rename over file");
    assert_eq!(fs.read_file("/A/afile2.txt").expect("read"), b"afile1");
    fs.stat("/A/afile1.txt").expect_err("source gone");

    // Replacing a non-empty directory is refused.
    let err = fs.rename("/A", "/C").expect_err("target dir not empty");
    assert_eq!(err.err, FsError::Linux(LinuxError::FileExists));

    // So is replacing an empty one.
    fs.mkdir("/empty", FileMode::new(0o755)).expect("mkdir");
    let err = fs.rename("/A", "/empty").expect_err("target dir exists");
    assert_eq!(
        err,
        LinkError::new("rename", "/A", "/empty", FsError::Linux(LinuxError::FileExists)),
    );
    fs.stat("/A/afile2.txt").expect("source tree untouched");

    // A missing source is reported on the pair.
    let err = fs.rename("/missing", "/elsewhere").expect_err("missing source");
    assert_eq!(
        err,
        LinkError::new("rename", "/missing", "/elsewhere", FsError::Linux(LinuxError::NoSuchFileOrDir)),
    );
}

#[test]
fn rename_across_volumes_is_a_cross_device_link() {
    let fs = windows_fs();
    fs.volume_add("D:").expect("volume");
    fs.write_file("C:\\f", b"x", FileMode::new(0o644)).expect("write");

    let err = fs.rename("C:\\f", "D:\\f").expect_err("cross volume");
    assert_eq!(err.err, FsError::Windows(WindowsError::NotSameDevice));

    // Same volume moves fine, and the other volume has its own namespace.
    fs.rename("C:\\f", "C:\\g").expect("same volume");
    fs.write_file("D:\\f", b"y", FileMode::new(0o644)).expect("write on D:");
    assert_eq!(fs.read_file("D:\\f").expect("read"), b"y");
    fs.stat("C:\\f").expect_err("gone from C:");
}

#[test]
fn truncate_and_seek_respect_bounds() {
    let fs = linux_fs();
    fs.write_file("/t", b"0123456789", FileMode::new(0o644)).expect("write");

    for n in [10i64, 4, 0, 16] {
        fs.truncate("/t", n).expect("truncate");
        assert_eq!(fs.stat("/t").expect("stat").size, n);
    }

    // The personality split for a negative size.
    let err = fs.truncate("/t", -1).expect_err("negative size");
    assert_eq!(err, PathError::new("truncate", "/t", FsError::Linux(LinuxError::InvalidArgument)));

    let win = windows_fs();
    win.write_file("C:\\t", b"abc", FileMode::new(0o644)).expect("write");
    let err = win.truncate("C:\\t", -1).expect_err("negative size");
    assert_eq!(
        err,
        PathError::new("truncate", "C:\\t", FsError::Windows(WindowsError::NegativeSeek)),
    );

    // Seek past EOF is fine; the write extends with zeros in the gap.
    let f = fs
        .open_file("/t", OpenOptions::read_write(), FileMode::new(0o644))
        .expect("open");
    assert_eq!(f.seek(20, Whence::Start).expect("seek"), 20);
    f.write(b"end").expect("write past eof");
    assert_eq!(f.seek(-3, Whence::End).expect("seek end"), 20);

    let err = f.seek(-1, Whence::Start).expect_err("negative seek");
    assert_eq!(err, PathError::new("seek", "/t", FsError::Linux(LinuxError::InvalidArgument)));
    f.close().expect("close");

    let data = fs.read_file("/t").expect("read");
    assert_eq!(data.len(), 23);
    assert!(data[16..20].iter().all(|&b| b == 0));
    assert_eq!(&data[20..], b"end");
}

#[test]
fn symlink_loops_hit_the_hop_budget() {
    let fs = linux_fs();
    fs.symlink("/pong", "/ping").expect("symlink");
    fs.symlink("/ping", "/pong").expect("symlink");

    let err = fs.stat("/ping").expect_err("loop");
    assert_eq!(err.err, FsError::Linux(LinuxError::TooManySymlinks));

    // A long but finite chain under the budget still resolves.
    fs.write_file("/real", b"content", FileMode::new(0o644)).expect("write");
    fs.symlink("/real", "/hop0").expect("symlink");
    for i in 1..30 {
        fs.symlink(&format!("/hop{}", i - 1), &format!("/hop{i}")).expect("symlink");
    }
    assert_eq!(fs.read_file("/hop29").expect("chain resolves"), b"content");

    // A chain longer than the budget does not.
    let tight = MemFs::builder().os_type(OsType::Linux).max_symlinks(8).build();
    tight.write_file("/real", b"x", FileMode::new(0o644)).expect("write");
    tight.symlink("/real", "/c0").expect("symlink");
    for i in 1..10 {
        tight.symlink(&format!("/c{}", i - 1), &format!("/c{i}")).expect("symlink");
    }
    let err = tight.stat("/c9").expect_err("budget exhausted");
    assert_eq!(err.err, FsError::Linux(LinuxError::TooManySymlinks));
}

#[test]
fn closed_handles_stay_closed() {
    let fs = linux_fs();
    fs.write_file("/f", b"data", FileMode::new(0o644)).expect("write");

    let f = fs.open("/f").expect("open");
    assert_ne!(f.fd(), u64::MAX);
    f.close().expect("close");

    assert_eq!(f.fd(), u64::MAX);

    let mut buf = [0u8; 4];
    assert_eq!(
        f.read(&mut buf).expect_err("closed"),
        PathError::new("read", "/f", FsError::FileClosing),
    );
    assert_eq!(
        f.write(b"x").expect_err("closed"),
        PathError::new("write", "/f", FsError::FileClosing),
    );
    assert_eq!(
        f.seek(0, Whence::Start).expect_err("closed"),
        PathError::new("seek", "/f", FsError::FileClosing),
    );
    assert_eq!(f.stat().expect_err("closed").err, FsError::FileClosing);
    assert_eq!(f.sync().expect_err("closed").err, FsError::FileClosing);
    assert_eq!(
        f.close().expect_err("double close"),
        PathError::new("close", "/f", FsError::FileClosing),
    );
}

#[test]
fn unlinked_files_stay_readable_through_open_handles() {
    let fs = linux_fs();
    fs.write_file("/f", b"survives", FileMode::new(0o644)).expect("write");

    let f = fs.open("/f").expect("open");
    fs.remove("/f").expect("remove while open");
    fs.stat("/f").expect_err("name is gone");

    let mut buf = [0u8; 16];
    let n = f.read(&mut buf).expect("read through the handle");
    assert_eq!(&buf[..n], b"survives");
    f.close().expect("close frees the node");
}

#[test]
fn chroot_confines_resolution() {
    let fs = linux_fs();
    fs.mkdir_all("/jail/inner", FileMode::new(0o755)).expect("mkdir_all");
    fs.write_file("/jail/inner/f", b"inside", FileMode::new(0o644)).expect("write");
    fs.write_file("/outside.txt", b"outside", FileMode::new(0o644)).expect("write");

    let jail_before = fs.stat("/jail").expect("stat");

    fs.chroot("/jail").expect("chroot");

    // The jail root is the old directory node.
    let root_after = fs.stat("/").expect("stat root");
    assert!(fs.same_file(&jail_before, &root_after));

    // Dot-dot cannot escape, and outside names are gone.
    let info = fs.stat("/../../..").expect("clamped to the jail root");
    assert!(fs.same_file(&jail_before, &info));
    fs.stat("/outside.txt").expect_err("not visible inside the jail");
    assert_eq!(fs.read_file("/inner/f").expect("inside content"), b"inside");

    // Absolute symlink targets re-resolve inside the jail.
    fs.symlink("/inner", "/abslink").expect("symlink");
    assert_eq!(fs.read_file("/abslink/f").expect("confined"), b"inside");
}

#[test]
fn chroot_needs_root_and_the_feature() {
    let idm = Arc::new(MemIdm::with_os_type(OsType::Linux));
    idm.group_add("staff").expect("group");
    idm.user_add("alice", "staff").expect("user");

    let fs = MemFs::builder().os_type(OsType::Linux).idm(idm).build();
    fs.mkdir("/jail", FileMode::new(0o755)).expect("mkdir");

    fs.set_user("alice").expect("switch user");
    let err = fs.chroot("/jail").expect_err("not root");
    assert_eq!(err, PathError::new("chroot", "/jail", FsError::Linux(LinuxError::OpNotPermitted)));

    let win = windows_fs();
    win.mkdir("C:\\jail", FileMode::new(0o755)).expect("mkdir");
    let err = win.chroot("C:\\jail").expect_err("no chroot on windows");
    assert_eq!(err.err, FsError::Windows(WindowsError::NotSupported));
}

#[test]
fn permissions_bind_non_root_users() {
    let idm = Arc::new(MemIdm::with_os_type(OsType::Linux));
    idm.group_add("staff").expect("group");
    idm.user_add("alice", "staff").expect("user");
    idm.user_add("bob", "staff").expect("user");

    let fs = MemFs::builder().os_type(OsType::Linux).idm(idm).build();
    fs.set_umask(FileMode::new(0o022));
    assert!(fs.has_feature(Features::IDENTITY_MGR));
    assert_eq!(fs.current_user().name(), "root");

    fs.mkdir("/shared", FileMode::new(0o777)).expect("mkdir");
    fs.chmod("/shared", FileMode::new(0o777)).expect("world-writable despite the umask");
    fs.mkdir("/rootonly", FileMode::new(0o700)).expect("mkdir");
    fs.write_file("/rootonly/secret", b"s", FileMode::new(0o600)).expect("write");
    fs.write_file("/shared/readable", b"r", FileMode::new(0o644)).expect("write");

    let alice = fs.set_user("alice").expect("switch user");
    assert_eq!(alice.uid(), 1000);
    assert!(!alice.is_root());

    // Traversal into a 0o700 root directory is denied.
    let err = fs.stat("/rootonly/secret").expect_err("no search permission");
    assert_eq!(err.err, FsError::Linux(LinuxError::PermDenied));

    // A world-writable directory accepts new files, owned by the creator.
    fs.write_file("/shared/mine", b"hi", FileMode::new(0o644)).expect("write");
    let info = fs.stat("/shared/mine").expect("stat");
    assert_eq!((info.uid, info.gid), (1000, 1000));

    // Others' files obey their mode bits.
    assert_eq!(fs.read_file("/shared/readable").expect("world-readable"), b"r");
    let err = fs
        .open_file("/shared/readable", OpenOptions::write_only(), FileMode::default())
        .expect_err("not writable by others");
    assert_eq!(err.err, FsError::Linux(LinuxError::PermDenied));

    // Mode and owner changes belong to the owner and root.
    let err = fs.chmod("/shared/readable", FileMode::new(0o600)).expect_err("not the owner");
    assert_eq!(err.err, FsError::Linux(LinuxError::OpNotPermitted));
    fs.chmod("/shared/mine", FileMode::new(0o600)).expect("own file");

    let err = fs.chown("/shared/mine", 1001, 1000).expect_err("chown is root-only");
    assert_eq!(err.err, FsError::Linux(LinuxError::OpNotPermitted));

    fs.set_user("root").expect("back to root");
    fs.chown("/shared/mine", 1001, 1000).expect("root may chown");
    let info = fs.stat("/shared/mine").expect("stat");
    assert_eq!((info.uid, info.gid), (1001, 1000));
}

#[test]
fn lchown_touches_the_link_not_the_target() {
    let idm = Arc::new(MemIdm::with_os_type(OsType::Linux));
    let fs = MemFs::builder().os_type(OsType::Linux).idm(idm).build();
    fs.write_file("/f", b"x", FileMode::new(0o644)).expect("write");
    fs.symlink("/f", "/lf").expect("symlink");

    fs.lchown("/lf", 1000, 1000).expect("lchown");
    assert_eq!(fs.lstat("/lf").expect("lstat").uid, 1000);
    assert_eq!(fs.stat("/f").expect("stat").uid, 0, "target untouched");

    fs.chown("/lf", 1001, 1001).expect("chown follows");
    assert_eq!(fs.stat("/f").expect("stat").uid, 1001);
    assert_eq!(fs.lstat("/lf").expect("lstat").uid, 1000);
}

#[test]
fn open_file_flag_combinations() {
    let fs = linux_fs();
    fs.write_file("/f", b"existing", FileMode::new(0o644)).expect("write");
    fs.mkdir("/d", FileMode::new(0o755)).expect("mkdir");

    // EXCLUSIVE create on an existing file.
    let flags = OpenOptions { write: true, create: true, create_new: true, ..Default::default() };
    let err = fs.open_file("/f", flags, FileMode::new(0o644)).expect_err("exists");
    assert_eq!(err, PathError::new("open", "/f", FsError::Linux(LinuxError::FileExists)));

    // Plain open of a missing file.
    let err = fs.open("/missing").expect_err("missing");
    assert_eq!(err, PathError::new("open", "/missing", FsError::Linux(LinuxError::NoSuchFileOrDir)));

    // CREATE without EXCLUSIVE opens the existing file, truncating only on
    // request.
    let f = fs
        .open_file(
            "/f",
            OpenOptions { read: true, write: true, create: true, ..Default::default() },
            FileMode::new(0o600),
        )
        .expect("open existing");
    f.close().expect("close");
    assert_eq!(fs.read_file("/f").expect("read"), b"existing", "no truncate requested");
    assert_eq!(fs.stat("/f").expect("stat").mode.perm(), FileMode::new(0o644), "mode unchanged");

    let f = fs.create("/f").expect("create truncates");
    f.close().expect("close");
    assert_eq!(fs.read_file("/f").expect("read"), b"");

    // Write intent on a directory.
    let err = fs
        .open_file("/d", OpenOptions::read_write(), FileMode::default())
        .expect_err("directory");
    assert_eq!(err, PathError::new("open", "/d", FsError::Linux(LinuxError::IsADirectory)));

    // Read-only directory handles list entries.
    let d = fs.open("/d").expect("open dir");
    assert_eq!(d.readdirnames(-1).expect("names"), Vec::<String>::new());
    d.close().expect("close");
}

#[test]
fn readdir_paginates_with_a_cursor() {
    let fs = linux_fs();
    fs.mkdir("/d", FileMode::new(0o755)).expect("mkdir");
    for i in 0..5 {
        fs.write_file(&format!("/d/f{i}"), b"", FileMode::new(0o644)).expect("write");
    }

    let d = fs.open("/d").expect("open");
    assert_eq!(d.readdirnames(2).expect("page"), ["f0", "f1"]);
    assert_eq!(d.readdirnames(2).expect("page"), ["f2", "f3"]);
    assert_eq!(d.readdirnames(2).expect("page"), ["f4"]);
    assert_eq!(d.readdirnames(2).expect("exhausted"), Vec::<String>::new());
    d.close().expect("close");

    // n <= 0 returns everything remaining.
    let d = fs.open("/d").expect("open");
    assert_eq!(d.readdirnames(3).expect("page").len(), 3);
    assert_eq!(d.readdirnames(-1).expect("rest").len(), 2);
    d.close().expect("close");

    let infos = fs.read_dir("/d").expect("read_dir");
    assert_eq!(infos.len(), 5);
    assert!(infos.windows(2).all(|w| w[0].name <= w[1].name), "sorted by name");

    let err = fs.open("/d/f0").expect("open file").readdirnames(-1).expect_err("not a dir");
    assert_eq!(err.op, "readdirent");
    assert_eq!(err.err, FsError::Linux(LinuxError::NotADirectory));
}

#[test]
fn read_write_at_and_negative_offsets() {
    let fs = linux_fs();
    fs.write_file("/f", b"0123456789", FileMode::new(0o644)).expect("write");

    let f = fs.open_file("/f", OpenOptions::read_write(), FileMode::default()).expect("open");

    let mut buf = [0u8; 4];
    assert_eq!(f.read_at(&mut buf, 3).expect("read_at"), 4);
    assert_eq!(&buf, b"3456");

    // read_at does not move the handle offset.
    let mut head = [0u8; 2];
    assert_eq!(f.read(&mut head).expect("read"), 2);
    assert_eq!(&head, b"01");

    assert_eq!(f.read_at(&mut buf, 100).expect("past eof"), 0);
    assert_eq!(
        f.read_at(&mut buf, -1).expect_err("negative"),
        PathError::new("readat", "/f", FsError::NegativeOffset),
    );

    f.write_at(b"xx", 8).expect("write_at");
    assert_eq!(
        f.write_at(b"xx", -1).expect_err("negative"),
        PathError::new("writeat", "/f", FsError::NegativeOffset),
    );

    // Writing far past EOF zero-fills the gap.
    f.write_at(b"z", 14).expect("write_at past eof");
    f.close().expect("close");

    let data = fs.read_file("/f").expect("read");
    assert_eq!(&data[..10], b"01234567xx");
    assert_eq!(&data[10..14], &[0, 0, 0, 0]);
    assert_eq!(data[14], b'z');

    // A read-only handle refuses writes, and vice versa.
    let ro = fs.open("/f").expect("open");
    assert_eq!(
        ro.write(b"x").expect_err("read-only").err,
        FsError::Linux(LinuxError::BadFileDesc),
    );
    ro.close().expect("close");

    let wo = fs.open_file("/f", OpenOptions::write_only(), FileMode::default()).expect("open");
    assert_eq!(
        wo.read(&mut buf).expect_err("write-only").err,
        FsError::Linux(LinuxError::BadFileDesc),
    );
    wo.close().expect("close");
}

#[test]
fn modification_times_advance_monotonically() {
    let fs = linux_fs();
    fs.write_file("/f", b"v1", FileMode::new(0o644)).expect("write");
    let t1 = fs.stat("/f").expect("stat").mtime_ns;

    fs.write_file("/f", b"v2", FileMode::new(0o644)).expect("write");
    let t2 = fs.stat("/f").expect("stat").mtime_ns;
    assert!(t2 > t1, "write advances mtime");

    fs.truncate("/f", 0).expect("truncate");
    let t3 = fs.stat("/f").expect("stat").mtime_ns;
    assert!(t3 > t2, "truncate advances mtime");

    // Chtimes pins an explicit value.
    let when = UNIX_EPOCH + Duration::from_secs(1_000_000);
    fs.chtimes("/f", when, when).expect("chtimes");
    assert_eq!(fs.stat("/f").expect("stat").mod_time(), when);
}

#[test]
fn unicode_components_pass_through() {
    let fs = linux_fs();
    fs.mkdir_all("/नमस्ते/दुनिया", FileMode::new(0o755)).expect("mkdir_all");
    fs.write_file("/नमस्ते/दुनिया/αρχείο.txt", "γεια".as_bytes(), FileMode::new(0o644))
        .expect("write");

    assert_eq!(fs.read_file("/नमस्ते/दुनिया/αρχείο.txt").expect("read"), "γεια".as_bytes());

    let names: Vec<String> =
        fs.read_dir("/नमस्ते").expect("read_dir").into_iter().map(|i| i.name).collect();
    assert_eq!(names, ["दुनिया"]);

    fs.rename("/नमस्ते/दुनिया", "/दुनिया").expect("rename");
    fs.stat("/दुनिया/αρχείο.txt").expect("moved");
}

#[test]
fn temp_names_use_the_pattern_and_random_suffix() {
    let fs = MemFs::builder().os_type(OsType::Linux).system_dirs().build();

    let d1 = fs.make_temp_dir("", "avfs-").expect("temp dir");
    let d2 = fs.make_temp_dir("", "avfs-").expect("temp dir");
    assert_ne!(d1, d2);
    assert!(d1.starts_with("/tmp/avfs-"), "{d1}");
    assert!(fs.stat(&d1).expect("exists").is_dir());
    assert_eq!(fs.stat(&d1).expect("stat").mode.perm(), FileMode::new(0o700));

    // A `*` positions the random component.
    let d3 = fs.make_temp_dir("", "pre*post").expect("temp dir");
    let base = fs.utils().base(&d3);
    assert!(base.starts_with("pre") && base.ends_with("post"), "{d3}");

    let f = fs.make_temp_file("", "scratch-*.txt").expect("temp file");
    let name = f.name();
    assert!(name.starts_with("/tmp/scratch-") && name.ends_with(".txt"), "{name}");
    f.write(b"payload").expect("write");
    f.close().expect("close");
    assert_eq!(fs.read_file(&name).expect("read"), b"payload");

    let err = fs.make_temp_file("", "bad/pattern").expect_err("separator");
    assert_eq!(err, PathError::new("createtemp", "bad/pattern", FsError::PatternHasSeparator));
    let err = fs.make_temp_dir("", "bad/pattern").expect_err("separator");
    assert_eq!(err, PathError::new("mkdirtemp", "bad/pattern", FsError::PatternHasSeparator));
}

#[test]
fn glob_matches_across_directories() {
    let fs = linux_fs();
    create_fixture(&fs);

    assert_eq!(
        fs.glob("/B/2/F/3/*.txt").expect("glob"),
        ["/B/2/F/3/3file1.txt", "/B/2/F/3/3file2.txt"],
    );
    assert_eq!(
        fs.glob("/A/afile?.txt").expect("glob"),
        ["/A/afile1.txt", "/A/afile2.txt", "/A/afile3.txt"],
    );
    assert_eq!(fs.glob("/*/1file.txt").expect("glob"), Vec::<String>::new());
    assert_eq!(fs.glob("/*/1/1file.txt").expect("glob"), ["/B/1/1file.txt"]);
    assert_eq!(fs.glob("/file.txt").expect("no meta"), ["/file.txt"]);
    assert_eq!(fs.glob("/nope*").expect("no match"), Vec::<String>::new());

    assert_eq!(fs.glob("/[").expect_err("malformed"), FsError::BadPattern);
}

#[test]
fn relative_paths_follow_the_working_directory() {
    let fs = linux_fs();
    fs.mkdir_all("/w/sub", FileMode::new(0o755)).expect("mkdir_all");

    assert_eq!(fs.getwd().expect("getwd"), "/");

    fs.chdir("/w").expect("chdir");
    assert_eq!(fs.getwd().expect("getwd"), "/w");

    fs.write_file("rel.txt", b"relative", FileMode::new(0o644)).expect("write");
    assert_eq!(fs.read_file("/w/rel.txt").expect("absolute view"), b"relative");

    fs.chdir("sub").expect("relative chdir");
    assert_eq!(fs.getwd().expect("getwd"), "/w/sub");
    assert_eq!(fs.read_file("../rel.txt").expect("dotdot"), b"relative");

    let err = fs.chdir("/w/rel.txt").expect_err("file");
    assert_eq!(err, PathError::new("chdir", "/w/rel.txt", FsError::Linux(LinuxError::NotADirectory)));

    // A directory handle can become the working directory.
    let d = fs.open("/w").expect("open dir");
    d.chdir().expect("fchdir");
    assert_eq!(fs.getwd().expect("getwd"), "/w");
    d.close().expect("close");
}

#[test]
fn windows_personality_reports_degenerate_metadata() {
    let fs = windows_fs();
    fs.mkdir("C:\\Dir", FileMode::new(0o700)).expect("mkdir");
    fs.write_file("C:\\Dir\\f.txt", b"x", FileMode::new(0o600)).expect("write");

    let dir = fs.stat("C:\\Dir").expect("stat");
    assert!(dir.is_dir());
    assert_eq!(dir.mode.perm(), FileMode::new(0o777));
    assert_eq!(dir.nlink, 1);

    let file = fs.stat("C:\\Dir\\f.txt").expect("stat");
    assert_eq!(file.mode, FileMode::new(0o666));

    let err = fs.chown("C:\\Dir\\f.txt", 1, 1).expect_err("unsupported");
    assert_eq!(
        err,
        PathError::new("chown", "C:\\Dir\\f.txt", FsError::Windows(WindowsError::NotSupported)),
    );

    // Slash input is accepted and the error table is the Windows one.
    let err = fs.stat("C:/Dir/missing").expect_err("missing");
    assert_eq!(err.err, FsError::Windows(WindowsError::FileNotFound));
    let err = fs.stat("C:/missing/deeper").expect_err("missing dir");
    assert_eq!(err.err, FsError::Windows(WindowsError::PathNotFound));

    // Symlinks need the privilege feature.
    let err = fs.symlink("C:\\Dir", "C:\\ldir").expect_err("no symlink feature");
    assert_eq!(err.err, FsError::Windows(WindowsError::PrivilegeNotHeld));

    let with_links = MemFs::builder().os_type(OsType::Windows).windows_symlinks().build();
    with_links.mkdir("C:\\Dir", FileMode::new(0o755)).expect("mkdir");
    with_links.symlink("C:\\Dir", "C:\\ldir").expect("symlink allowed");
    assert_eq!(with_links.readlink("C:\\ldir").expect("readlink"), "C:\\Dir");

    let err = with_links.readlink("C:\\Dir").expect_err("not a link");
    assert_eq!(err.err, FsError::Windows(WindowsError::NotReparsePoint));
}

#[test]
fn concurrent_use_only_loses_races_to_missing_paths() {
    use std::thread;

    let fs = MemFs::builder().os_type(OsType::Linux).build();
    fs.mkdir("/race", FileMode::new(0o777)).expect("mkdir");

    let mut handles = Vec::new();
    for t in 0..8 {
        let fs = fs.clone();
        handles.push(thread::spawn(move || {
            for round in 0..50 {
                let dir = format!("/race/t{t}");
                let file = format!("{dir}/r{round}.txt");

                let ops: [Result<(), PathError>; 4] = [
                    fs.mkdir_all(&dir, FileMode::new(0o755)),
                    fs.write_file(&file, b"payload", FileMode::new(0o644)),
                    fs.read_file(&file).map(|data| {
                        assert!(data.is_empty() || data == b"payload");
                    }),
                    fs.remove_all(&dir),
                ];

                for result in ops {
                    if let Err(err) = result {
                        assert_eq!(
                            err.err,
                            FsError::Linux(LinuxError::NoSuchFileOrDir),
                            "only missing-path races are acceptable: {err}",
                        );
                    }
                }
            }
        }));
    }

    // One thread keeps sweeping the shared parent.
    {
        let fs = fs.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..20 {
                fs.remove_all("/race").expect("remove_all is race-tolerant");
                let _ = fs.mkdir("/race", FileMode::new(0o777));
            }
        }));
    }

    for handle in handles {
        handle.join().expect("no panics under concurrency");
    }
}

#[test]
fn empty_paths_are_never_found() {
    let fs = linux_fs();

    assert_eq!(
        fs.stat("").expect_err("empty path"),
        PathError::new("stat", "", FsError::Linux(LinuxError::NoSuchFileOrDir)),
    );
    assert_eq!(fs.open("").expect_err("empty path").err, FsError::Linux(LinuxError::NoSuchFileOrDir));
    assert_eq!(fs.mkdir("", FileMode::new(0o755)).expect_err("empty path").op, "mkdir");
    fs.remove_all("").expect("a missing target is still a success");

    let win = windows_fs();
    assert_eq!(
        win.stat("").expect_err("empty path").err,
        FsError::Windows(WindowsError::PathNotFound),
    );
}

#[test]
fn mkdir_collisions_report_file_exists() {
    let fs = linux_fs();
    fs.mkdir("/d", FileMode::new(0o755)).expect("mkdir");

    assert_eq!(
        fs.mkdir("/d", FileMode::new(0o755)).expect_err("exists"),
        PathError::new("mkdir", "/d", FsError::Linux(LinuxError::FileExists)),
    );

    // A symlink occupying the name collides too, even when dangling.
    fs.symlink("/nowhere", "/l").expect("symlink");
    assert_eq!(
        fs.mkdir("/l", FileMode::new(0o755)).expect_err("exists").err,
        FsError::Linux(LinuxError::FileExists),
    );

    // And so does the root itself.
    assert_eq!(
        fs.mkdir("/", FileMode::new(0o755)).expect_err("exists").err,
        FsError::Linux(LinuxError::FileExists),
    );
}

#[test]
fn same_file_never_matches_across_instances() {
    let a = linux_fs();
    let b = linux_fs();
    a.write_file("/f", b"x", FileMode::new(0o644)).expect("write");
    b.write_file("/f", b"x", FileMode::new(0o644)).expect("write");

    let fi_a = a.stat("/f").expect("stat");
    let fi_b = b.stat("/f").expect("stat");
    assert!(!a.same_file(&fi_a, &fi_b), "identical layout, different stores");

    // A clone shares the store, so identity holds.
    let shared = a.clone();
    let fi_shared = shared.stat("/f").expect("stat");
    assert!(a.same_file(&fi_a, &fi_shared));
}

#[test]
fn rename_between_hard_links_is_a_no_op() {
    let fs = linux_fs();
    fs.write_file("/a", b"content", FileMode::new(0o644)).expect("write");
    fs.link("/a", "/b").expect("link");

    fs.rename("/a", "/b").expect("no-op");
    assert_eq!(fs.read_file("/a").expect("read"), b"content");
    assert_eq!(fs.read_file("/b").expect("read"), b"content");
    assert_eq!(fs.stat("/a").expect("stat").nlink, 2);
}

#[test]
fn write_string_and_current_seek() {
    let fs = linux_fs();

    let f = fs.create("/s.txt").expect("create");
    f.write_string("αβ-then-").expect("write_string");
    f.write_string("rest").expect("write_string");
    assert_eq!(f.seek(0, Whence::Current).expect("tell"), "αβ-then-rest".len() as i64);
    assert_eq!(f.seek(-4, Whence::Current).expect("back up"), "αβ-then-".len() as i64);
    f.write_string("tail").expect("overwrite");
    f.close().expect("close");

    assert_eq!(fs.read_file("/s.txt").expect("read"), "αβ-then-tail".as_bytes());
}

#[test]
fn walk_visits_depth_first_in_lexical_order() {
    let fs = linux_fs();
    fs.mkdir_all("/w/a/sub", FileMode::new(0o755)).expect("mkdir_all");
    fs.mkdir("/w/b", FileMode::new(0o755)).expect("mkdir");
    fs.write_file("/w/a/f1", b"", FileMode::new(0o644)).expect("write");
    fs.write_file("/w/b/f2", b"", FileMode::new(0o644)).expect("write");
    fs.symlink("/w/a", "/w/la").expect("symlink");

    let mut seen = Vec::new();
    fs.walk("/w", &mut |path, info| {
        seen.push((path.to_string(), info.is_symlink()));
    })
    .expect("walk");

    let paths: Vec<&str> = seen.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(
        paths,
        ["/w", "/w/a", "/w/a/f1", "/w/a/sub", "/w/b", "/w/b/f2", "/w/la"],
    );
    assert!(seen.last().expect("non-empty").1, "the symlink is reported, not followed");
}

#[test]
fn stat_and_lstat_disagree_only_on_symlinks() {
    let fs = linux_fs();
    create_fixture(&fs);

    let via_stat = fs.stat("/B/2/lf").expect("stat follows");
    assert!(via_stat.is_dir());
    assert!(!via_stat.is_symlink());

    let via_lstat = fs.lstat("/B/2/lf").expect("lstat does not");
    assert!(via_lstat.is_symlink());
    assert_eq!(via_lstat.size, "/B/2/F".len() as i64);

    let plain = fs.stat("/B/2/F").expect("stat");
    assert_eq!(plain.mode.perm(), FileMode::new(0o755));
    assert!(fs.same_file(&via_stat, &plain));

    // Directory link counts are synthetic: 2 plus child directories.
    let b = fs.stat("/B").expect("stat");
    assert_eq!(b.nlink, 2 + 2);
    let file = fs.stat("/file.txt").expect("stat");
    assert_eq!(file.nlink, 1);
}
