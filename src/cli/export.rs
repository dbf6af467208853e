use crate::config::Config;
use crate::error::Result;
use crate::export::SheetExporter;
use crate::sheets::SheetsClient;
use clap::Args;
use tracing::info;

#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Output file name, without the .csv extension
    #[arg(short, long)]
    pub output: Option<String>,

    /// Spreadsheet to read from
    #[arg(long)]
    pub spreadsheet_id: Option<String>,

    /// Sheet (tab) to download
    #[arg(long)]
    pub sheet_name: Option<String>,
}

impl ExportArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.export.output_filename = output.clone();
        }
        if let Some(spreadsheet_id) = &self.spreadsheet_id {
            config.sheet.spreadsheet_id = spreadsheet_id.clone();
        }
        if let Some(sheet_name) = &self.sheet_name {
            config.sheet.sheet_name = sheet_name.clone();
        }
    }

    pub async fn execute(&self, mut config: Config) -> Result<()> {
        self.apply(&mut config);
        config.validate()?;

        let client = SheetsClient::new(&config)?;
        let url = client.spreadsheet_url();

        let exporter = SheetExporter::new(&config, client);
        match exporter.export(&config.export.output_filename).await? {
            Some(path) => info!(url = url, path = ?path, "Export completed"),
            None => info!(url = url, "Export skipped, sheet is empty"),
        }

        Ok(())
    }
}
