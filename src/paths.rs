use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_FILENAME: &str = "generated.pdf";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{kind} must be a single non-empty path segment, got {value:?}")]
    InvalidSegment { kind: &'static str, value: String },
}

/// Scratch and durable locations for one record.
///
/// Derivation is deterministic: the same record always maps onto the same
/// paths and keys, different records never share them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePathConfig {
    pub record_path: String,
    pub scratch_dir: PathBuf,
    pub durable_prefix: String,
    pub output_filename: String,
    pub output_full_path: PathBuf,
}

fn validate_segment(kind: &'static str, value: &str) -> Result<(), Error> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);
    if invalid {
        return Err(Error::InvalidSegment {
            kind,
            value: value.to_owned(),
        });
    }
    Ok(())
}

impl FilePathConfig {
    pub fn new(
        scratch_root: &Path,
        base_id: &str,
        table_id: &str,
        record_id: &str,
        output_filename: &str,
    ) -> Result<Self, Error> {
        validate_segment("base id", base_id)?;
        validate_segment("table id", table_id)?;
        validate_segment("record id", record_id)?;
        validate_segment("output filename", output_filename)?;
        let record_path = format!("{base_id}/{table_id}/{record_id}");
        let scratch_dir = scratch_root.join(base_id).join(table_id).join(record_id);
        Ok(Self {
            output_full_path: scratch_dir.join(output_filename),
            durable_prefix: record_path.clone(),
            output_filename: output_filename.to_owned(),
            scratch_dir,
            record_path,
        })
    }

    /// Durable key of the rendered document.
    pub fn output_key(&self) -> String {
        format!("{}/{}", self.durable_prefix, self.output_filename)
    }

    /// Name used for both the scratch file and the durable key of an
    /// attachment. The id prefix keeps same-named files apart. The id must be
    /// a single path segment; the filename is flattened into one.
    pub fn attachment_name(id: &str, filename: &str) -> Result<String, Error> {
        validate_segment("attachment id", id)?;
        let filename = filename.replace(['/', '\\', '\0'], "_");
        let filename = if filename.is_empty() || filename == "." || filename == ".." {
            "attachment".to_owned()
        } else {
            filename
        };
        Ok(format!("{id}__{filename}"))
    }

    pub fn attachment_scratch_path(&self, id: &str, filename: &str) -> Result<PathBuf, Error> {
        Ok(self.scratch_dir.join(Self::attachment_name(id, filename)?))
    }

    pub fn attachment_key(&self, id: &str, filename: &str) -> Result<String, Error> {
        Ok(format!(
            "{}/{}",
            self.durable_prefix,
            Self::attachment_name(id, filename)?
        ))
    }
}
