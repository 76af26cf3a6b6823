use crate::app::ports::RecordOutputPort;
use crate::domain::ProviderRecord;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Writes finished provider records to an NDJSON file, one record per line
pub struct FileRecordOutputAdapter {
    file_writer: Mutex<BufWriter<std::fs::File>>,
    file_path: String,
}

impl FileRecordOutputAdapter {
    pub fn new(file_path: &str) -> crate::error::Result<Self> {
        let path = Path::new(file_path);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        info!("Creating record output file: {}", file_path);

        let file_writer = BufWriter::new(
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(file_path)?,
        );

        Ok(Self {
            file_writer: Mutex::new(file_writer),
            file_path: file_path.to_string(),
        })
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }
}

#[async_trait::async_trait]
impl RecordOutputPort for FileRecordOutputAdapter {
    async fn write_record(&self, record: &ProviderRecord) -> anyhow::Result<()> {
        let json_line = serde_json::to_string(record)?;

        let mut writer = self
            .file_writer
            .lock()
            .map_err(|e| anyhow::anyhow!("output writer lock poisoned: {}", e))?;
        writeln!(writer, "{}", json_line)?;
        writer.flush()?;

        Ok(())
    }
}
