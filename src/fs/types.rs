//! Filesystem metadata types
//!
//! These types carry the subset of `lstat` information the comparison
//! engine classifies on: entry kind, permission bits and size.

use std::fmt;
use std::fs::Metadata;
use std::io;
use std::path::Path;

/// Type of a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link
    Symlink,
    /// Named pipe (FIFO)
    Fifo,
    /// Unix socket
    Socket,
    /// Block device
    BlockDevice,
    /// Character device
    CharDevice,
}

impl EntryKind {
    /// Convert from a std file type
    pub fn from_file_type(file_type: std::fs::FileType) -> Self {
        if file_type.is_dir() {
            return EntryKind::Directory;
        }
        if file_type.is_symlink() {
            return EntryKind::Symlink;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            if file_type.is_fifo() {
                return EntryKind::Fifo;
            }
            if file_type.is_socket() {
                return EntryKind::Socket;
            }
            if file_type.is_block_device() {
                return EntryKind::BlockDevice;
            }
            if file_type.is_char_device() {
                return EntryKind::CharDevice;
            }
        }

        EntryKind::File
    }

    /// Human-readable name used in classification details
    pub fn describe(&self) -> &'static str {
        match self {
            EntryKind::File => "regular file",
            EntryKind::Directory => "directory",
            EntryKind::Symlink => "symlink",
            EntryKind::Fifo => "named pipe",
            EntryKind::Socket => "socket",
            EntryKind::BlockDevice => "block device",
            EntryKind::CharDevice => "character device",
        }
    }

    /// Leading character of an `ls -l` style mode string
    fn mode_char(&self) -> char {
        match self {
            EntryKind::File => '-',
            EntryKind::Directory => 'd',
            EntryKind::Symlink => 'l',
            EntryKind::Fifo => 'p',
            EntryKind::Socket => 's',
            EntryKind::BlockDevice => 'b',
            EntryKind::CharDevice => 'c',
        }
    }

    /// Check if this is a directory
    pub fn is_dir(&self) -> bool {
        *self == EntryKind::Directory
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Metadata for one side of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    /// Entry type
    pub kind: EntryKind,

    /// Permission bits (including setuid, setgid and sticky)
    pub perm: u32,

    /// Size in bytes
    pub size: u64,
}

impl EntryMeta {
    /// Create metadata directly
    pub fn new(kind: EntryKind, perm: u32, size: u64) -> Self {
        Self {
            kind,
            perm: perm & 0o7777,
            size,
        }
    }

    /// Build from std metadata (expected to come from `symlink_metadata`)
    pub fn from_metadata(meta: &Metadata) -> Self {
        let kind = EntryKind::from_file_type(meta.file_type());

        #[cfg(unix)]
        let perm = {
            use std::os::unix::fs::MetadataExt;
            meta.mode() & 0o7777
        };

        #[cfg(not(unix))]
        let perm = match (kind, meta.permissions().readonly()) {
            (EntryKind::Directory, true) => 0o555,
            (EntryKind::Directory, false) => 0o755,
            (_, true) => 0o444,
            (_, false) => 0o644,
        };

        Self {
            kind,
            perm,
            size: meta.len(),
        }
    }

    /// `lstat` a path, never following a trailing symlink
    pub fn lstat(path: &Path) -> io::Result<Self> {
        std::fs::symlink_metadata(path).map(|meta| Self::from_metadata(&meta))
    }

    /// Check if this entry is a directory
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Render an `ls -l` style mode string, e.g. `-rwxr-xr-x`
    pub fn mode_string(&self) -> String {
        let mut out = String::with_capacity(10);
        out.push(self.kind.mode_char());

        // (read bit, write bit, exec bit, special bit, special char)
        let triads = [
            (0o400, 0o200, 0o100, 0o4000, 's'),
            (0o040, 0o020, 0o010, 0o2000, 's'),
            (0o004, 0o002, 0o001, 0o1000, 't'),
        ];

        for (r, w, x, special, special_char) in triads {
            out.push(if self.perm & r != 0 { 'r' } else { '-' });
            out.push(if self.perm & w != 0 { 'w' } else { '-' });
            let exec = self.perm & x != 0;
            out.push(match (self.perm & special != 0, exec) {
                (true, true) => special_char,
                (true, false) => special_char.to_ascii_uppercase(),
                (false, true) => 'x',
                (false, false) => '-',
            });
        }

        out
    }
}
