use crate::config::{Config, validate_output_filename};
use crate::error::{AppError, Result};
use crate::models::SheetValues;
use crate::sheets::SheetSource;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info, instrument, warn};

/// Downloads one sheet and writes it as `<output_dir>/<name>.csv`.
pub struct SheetExporter<S> {
    sheet_name: String,
    output_dir: PathBuf,
    source: S,
}

impl<S> SheetExporter<S>
where
    S: SheetSource + Sync,
{
    pub fn new(config: &Config, source: S) -> Self {
        Self {
            sheet_name: config.sheet.sheet_name.clone(),
            output_dir: config.output_dir(),
            source,
        }
    }

    pub fn output_path(&self, output_filename: &str) -> PathBuf {
        self.output_dir.join(format!("{}.csv", output_filename))
    }

    /// Export the sheet, returning the written path, or `None` when the sheet
    /// has no rows and nothing was written.
    #[instrument(name = "Exporting sheet", skip(self), fields(sheet = %self.sheet_name))]
    pub async fn export(&self, output_filename: &str) -> Result<Option<PathBuf>> {
        let result = self.try_export(output_filename).await;

        match &result {
            Err(e) if e.is_api() => error!("An API error occurred: {}", e),
            // Already reported where it was detected
            Err(AppError::MissingCredentialsFile(_)) => {}
            Err(e) => error!("An unexpected error occurred: {}", e),
            Ok(_) => {}
        }

        result
    }

    async fn try_export(&self, output_filename: &str) -> Result<Option<PathBuf>> {
        validate_output_filename(output_filename)?;

        let rows = self.source.fetch_values(&self.sheet_name).await?;
        let Some(values) = SheetValues::from_rows(rows) else {
            warn!("No data found in the sheet.");
            return Ok(None);
        };

        info!(
            columns = values.header().len(),
            "Successfully retrieved {} rows of data.",
            values.rows().len()
        );

        // Serialize fully before touching the output file
        let contents = values.to_csv_string()?;

        fs::create_dir_all(&self.output_dir)?;
        let output_path = self.output_path(output_filename);
        fs::write(&output_path, contents)?;

        info!(path = ?output_path, "Sheet successfully downloaded");

        Ok(Some(output_path))
    }
}


#[cfg(test)]
mod tests {
    use super::mocks::MockSheetSource;
    use super::*;
    use crate::models::sheet::test_helpers::rows;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn exporter(source: MockSheetSource) -> (TempDir, SheetExporter<MockSheetSource>) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            project_root: dir.path().to_path_buf(),
            ..Default::default()
        };
        (dir, SheetExporter::new(&config, source))
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capture_logs(logs: LogBuffer) -> impl tracing::Subscriber + Send + Sync {
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || logs.clone())
            .finish()
    }

    #[tokio::test]
    async fn test_export_writes_csv() {
        let source = MockSheetSource::with_values(rows(&[&["a", "b"], &["1", "2"], &["3", "4"]]));
        let (dir, exporter) = exporter(source.clone());

        let path = exporter.export("doentes").await.unwrap().unwrap();

        assert_eq!(path, dir.path().join("input/google_sheet/doentes.csv"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "a,b\n1,2\n3,4\n");
        assert_eq!(*source.requested_sheets.lock().unwrap(), vec!["Doentes"]);
    }

    #[tokio::test]
    async fn test_export_is_idempotent() {
        let source = MockSheetSource::with_values(rows(&[&["a", "b"], &["1", "2"], &["3", "4"]]));
        let (_dir, exporter) = exporter(source);

        let path = exporter.export("doentes").await.unwrap().unwrap();
        let first = fs::read(&path).unwrap();

        exporter.export("doentes").await.unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second, "re-running should overwrite, not append");
    }

    #[tokio::test]
    async fn test_export_empty_sheet_writes_nothing() {
        let logs = LogBuffer::default();
        let _guard = tracing::subscriber::set_default(capture_logs(logs.clone()));

        let (dir, exporter) = exporter(MockSheetSource::with_values(vec![]));

        let result = exporter.export("doentes").await.unwrap();

        assert_eq!(result, None);
        assert!(!dir.path().join("input").exists(), "no file or directory should be created");
        let logs = logs.contents();
        assert!(logs.contains("WARN"), "expected a warning, got: {logs}");
        assert!(logs.contains("No data found in the sheet."));
    }

    #[tokio::test]
    async fn test_export_api_error_is_logged_and_returned() {
        let logs = LogBuffer::default();
        let _guard = tracing::subscriber::set_default(capture_logs(logs.clone()));

        let source = MockSheetSource {
            fail_with_status: Some(403),
            ..MockSheetSource::with_values(rows(&[&["a"], &["1"]]))
        };
        let (dir, exporter) = exporter(source);

        let err = exporter.export("doentes").await.unwrap_err();

        assert!(err.is_api());
        assert!(!exporter.output_path("doentes").exists());
        assert!(!dir.path().join("input").exists());
        assert!(logs.contents().contains("An API error occurred"));
    }

    #[tokio::test]
    async fn test_export_custom_filename() {
        let source = MockSheetSource::with_values(rows(&[&["Nome"], &["Ana"]]));
        let (dir, exporter) = exporter(source);

        let path = exporter.export("pacientes").await.unwrap().unwrap();

        assert_eq!(path, dir.path().join("input/google_sheet/pacientes.csv"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "Nome\nAna\n");
    }

    #[tokio::test]
    async fn test_export_rejects_path_in_filename() {
        let logs = LogBuffer::default();
        let _guard = tracing::subscriber::set_default(capture_logs(logs.clone()));

        let source = MockSheetSource::with_values(rows(&[&["a"], &["1"]]));
        let (_dir, exporter) = exporter(source.clone());

        let err = exporter.export("../outside").await.unwrap_err();

        assert!(matches!(err, AppError::Config(_)));
        assert!(source.requested_sheets.lock().unwrap().is_empty());
        assert!(logs.contents().contains("An unexpected error occurred"));
    }
}
