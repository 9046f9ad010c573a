//! CSV export of batch cancel results and product listings
//!
//! Files start with a UTF-8 BOM so spreadsheet tools pick the right encoding
//! for the Chinese headers.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::{ExportError, ExportRow, ExportSink, ListedProduct, ReportLocale};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone)]
pub struct CsvExportSink {
    directory: PathBuf,
    locale: ReportLocale,
}

impl CsvExportSink {
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>, locale: ReportLocale) -> Self {
        Self { directory: directory.into(), locale }
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn io_error(path: &Path, source: std::io::Error) -> ExportError {
        ExportError::Io { path: path.to_path_buf(), source }
    }

    fn write_table<R, I>(&self, headers: &[&str], records: R, suggested_name: &str) -> Result<PathBuf, ExportError>
    where
        R: ExactSizeIterator<Item = I>,
        I: IntoIterator<Item = String>,
    {
        let count = records.len();
        if count == 0 {
            return Err(ExportError::Empty);
        }

        std::fs::create_dir_all(&self.directory).map_err(|e| Self::io_error(&self.directory, e))?;
        let path = self.directory.join(suggested_name);

        let mut file = File::create(&path).map_err(|e| Self::io_error(&path, e))?;
        file.write_all(UTF8_BOM).map_err(|e| Self::io_error(&path, e))?;

        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(headers)?;
        for record in records {
            writer.write_record(record)?;
        }
        writer.flush().map_err(|e| Self::io_error(&path, e))?;

        info!("📁 Exported {} rows to {}", count, path.display());
        Ok(path)
    }
}

impl ExportSink for CsvExportSink {
    fn export(&self, rows: &[ExportRow], suggested_name: &str) -> Result<PathBuf, ExportError> {
        self.write_table(&self.locale.headers(), rows.iter().map(ExportRow::fields), suggested_name)
    }

    fn export_products(
        &self,
        products: &[ListedProduct],
        suggested_name: &str,
    ) -> Result<PathBuf, ExportError> {
        self.write_table(
            &self.locale.product_headers(),
            products.iter().map(ListedProduct::fields),
            suggested_name,
        )
    }
}
