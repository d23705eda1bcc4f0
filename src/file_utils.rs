use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

// @module: File and directory utilities

// @const: Suffix appended to captioned image stems
pub const PROCESSED_SUFFIX: &str = "_processed";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @creates: Parent directory of a file path
    pub fn ensure_parent_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        match path.as_ref().parent() {
            Some(parent) => Self::ensure_dir(parent),
            None => Ok(()),
        }
    }

    // @generates: Output path for a captioned image
    // @params: input_file, output_dir
    pub fn processed_image_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
    ) -> PathBuf {
        let input_file = input_file.as_ref();

        let stem = input_file.file_stem().unwrap_or_default();
        let mut output_filename = stem.to_string_lossy().to_string();
        output_filename.push_str(PROCESSED_SUFFIX);

        if let Some(ext) = input_file.extension() {
            output_filename.push('.');
            output_filename.push_str(&ext.to_string_lossy());
        } else {
            // The image encoder picks the format from the extension
            output_filename.push_str(".png");
        }

        output_dir.as_ref().join(output_filename)
    }

    // @generates: Sibling path sharing the stem of `base` with a tag and extension
    pub fn tagged_path<P: AsRef<Path>>(base: P, tag: &str, extension: &str) -> PathBuf {
        let base = base.as_ref();
        let stem = base.file_stem().unwrap_or_default().to_string_lossy();
        let file_name = format!("{}_{}.{}", stem, tag, extension);
        match base.parent() {
            Some(parent) => parent.join(file_name),
            None => PathBuf::from(file_name),
        }
    }

    /// Move a file, falling back to copy + remove across filesystems
    pub fn move_file<P1: AsRef<Path>, P2: AsRef<Path>>(from: P1, to: P2) -> Result<()> {
        let from = from.as_ref();
        let to = to.as_ref();

        if !from.exists() {
            return Err(anyhow::anyhow!("Source file does not exist: {:?}", from));
        }
        Self::ensure_parent_dir(to)?;

        if fs::rename(from, to).is_err() {
            fs::copy(from, to)
                .with_context(|| format!("Failed to copy {:?} to {:?}", from, to))?;
            fs::remove_file(from)
                .with_context(|| format!("Failed to remove {:?} after copy", from))?;
        }

        Ok(())
    }

    /// Whether two paths name the same file, resolving them when possible
    pub fn same_file<P1: AsRef<Path>, P2: AsRef<Path>>(a: P1, b: P2) -> bool {
        let a = a.as_ref();
        let b = b.as_ref();
        match (fs::canonicalize(a), fs::canonicalize(b)) {
            (Ok(ca), Ok(cb)) => ca == cb,
            _ => a == b,
        }
    }
}
