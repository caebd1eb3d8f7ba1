//! File system helpers: the source tree walker and the part reader used by
//! multipart uploads.

use std::{
    cmp::Ordering,
    fs::File,
    io,
    path::{Path, PathBuf},
};

use builder_pattern::Builder;
use bytes::Bytes;
use walkdir::{DirEntry, WalkDir};

use crate::constant::OS_METADATA_SUFFIX;

/// Lazy depth-first iterator over the files below a root directory.
///
/// Every file of a directory is yielded before anything inside its
/// subdirectories. When `reverse` is set the file names of each directory come
/// out in reverse lexicographic order; subdirectories keep the order the file
/// system lists them in.
///
/// # Example
///
/// ```no_run
/// use folder_to_s3::util::fs::DirTree;
///
/// for file in DirTree::new("assets", false) {
///     println!("{}", file.unwrap().display());
/// }
/// ```
pub struct DirTree {
    inner: walkdir::IntoIter,
}

impl DirTree {
    pub fn new(root: impl AsRef<Path>, reverse: bool) -> Self {
        let walker = WalkDir::new(root)
            .min_depth(1)
            .sort_by(move |a, b| listing_order(a, b, reverse));
        Self {
            inner: walker.into_iter(),
        }
    }
}

impl Iterator for DirTree {
    type Item = Result<PathBuf, walkdir::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(Err(err)),
            };
            if is_uploadable(&entry) {
                return Some(Ok(entry.into_path()));
            }
        }
    }
}

/// Files sort ahead of directories so a directory's files are all yielded
/// before its subtrees. The sort is stable, so `Equal` keeps listing order.
fn listing_order(a: &DirEntry, b: &DirEntry, reverse: bool) -> Ordering {
    match (a.file_type().is_dir(), b.file_type().is_dir()) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (false, false) if reverse => b.file_name().cmp(a.file_name()),
        _ => Ordering::Equal,
    }
}

fn is_uploadable(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    let is_file = file_type.is_file() || (file_type.is_symlink() && entry.path().is_file());
    is_file
        && !entry
            .file_name()
            .to_string_lossy()
            .ends_with(OS_METADATA_SUFFIX)
}

/// One part of a file, read for a multipart upload.
///
/// # Example
///
/// ```
/// use folder_to_s3::util::fs::ChunkFile;
/// use bytes::Bytes;
///
/// let chunk = ChunkFile::new()
///     .bytes(Bytes::from("hello world"))
///     .offset(0)
///     .build();
/// assert_eq!(chunk.size(), 11);
/// assert_eq!(chunk.offset(), 0);
/// ```
#[derive(Builder)]
pub struct ChunkFile {
    /// The part bytes.
    #[public]
    bytes: Bytes,
    /// Position of the part inside the source file.
    #[public]
    offset: u64,
}

impl ChunkFile {
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of bytes actually read.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Reads up to `size` bytes starting at `offset` without moving the file
    /// cursor, so several parts can be read from one shared handle.
    ///
    /// The chunk is shorter than `size` only when the file ends first.
    pub fn create_chunk_file(file: &File, offset: u64, size: u64) -> io::Result<ChunkFile> {
        let mut buffer = vec![0u8; size as usize];
        let mut filled = 0;
        while filled < buffer.len() {
            match read_at(file, &mut buffer[filled..], offset + filled as u64) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    tracing::error!(
                        "Failed to read file chunk, offset: {}, size: {}, err: {:?}",
                        offset,
                        size,
                        err
                    );
                    return Err(err);
                }
            }
        }
        buffer.truncate(filled);
        Ok(ChunkFile::new()
            .bytes(Bytes::from(buffer))
            .offset(offset)
            .build())
    }
}

#[cfg(unix)]
fn read_at(file: &File, buffer: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buffer, offset)
}

#[cfg(windows)]
fn read_at(file: &File, buffer: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_read(buffer, offset)
}
