//! Export archive bundling

use mtq_common::export::{ExportBundle, ExportFile};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Packs rendered export files into one in-memory zip archive
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipBundler;

impl ZipBundler {
    /// Bundle every file of an export, in order
    pub fn bundle(&self, export: &ExportBundle) -> zip::result::ZipResult<Vec<u8>> {
        self.zip_files(&export.files)
    }

    pub fn zip_files(&self, files: &[ExportFile]) -> zip::result::ZipResult<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for file in files {
            writer.start_file(file.name.as_str(), options)?;
            writer.write_all(&file.contents)?;
        }

        Ok(writer.finish()?.into_inner())
    }
}
