//! Platform capabilities used by the disk target.
//!
//! Everything that differs between Unix and Windows lives here so the rest
//! of the crate stays free of `cfg` attributes.

use std::fs;
use std::io;
use std::path::Path;

/// Whether the process may hand files to other owners.
///
/// Unprivileged Unix processes cannot `chown` to arbitrary ids; ownership
/// preservation then quietly does nothing, as `tar` does.
#[must_use]
pub fn is_privileged() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid() takes no arguments, cannot fail and has no side
        // effects.
        #[allow(unsafe_code)]
        let euid = unsafe { libc::geteuid() };
        euid == 0
    }
    #[cfg(not(unix))]
    {
        false
    }
}

/// Whether symlink timestamps can be set without following the link.
#[must_use]
pub const fn can_preserve_symlink_times() -> bool {
    cfg!(unix)
}

/// Creates a symlink at `link` pointing to `target`.
pub fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link)
    }
    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_file(target, link)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = (target, link);
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "symlinks are not supported on this platform",
        ))
    }
}

/// Changes ownership of `path` itself, not of a symlink's target.
pub fn lchown(path: &Path, uid: Option<u64>, gid: Option<u64>) -> io::Result<()> {
    #[cfg(unix)]
    {
        let narrow = |id: Option<u64>| {
            id.map(u32::try_from)
                .transpose()
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "owner id out of range"))
        };
        std::os::unix::fs::lchown(path, narrow(uid)?, narrow(gid)?)
    }
    #[cfg(not(unix))]
    {
        let _ = (path, uid, gid);
        Ok(())
    }
}

/// Applies permission bits. No-op where the platform has none.
pub fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
    }
    #[cfg(not(unix))]
    {
        let _ = (path, mode);
        Ok(())
    }
}

/// Permission bits of `metadata`.
#[must_use]
pub fn mode_of(metadata: &fs::Metadata) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o7777
    }
    #[cfg(not(unix))]
    {
        if metadata.permissions().readonly() {
            0o444
        } else {
            0o666
        }
    }
}

/// Opens `path` for writing, failing if anything exists there.
pub fn create_new(path: &Path, mode: u32) -> io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode & 0o7777);
    }
    #[cfg(not(unix))]
    let _ = mode;
    options.open(path)
}

/// Creates one directory with `mode`.
pub fn create_dir(path: &Path, mode: u32) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode & 0o7777);
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder.create(path)
}
