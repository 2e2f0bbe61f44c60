//! Alerting and export side effects for promising tokens

pub mod alert;
pub mod export;

use tracing::error;

use crate::config::ExportConfig;
use crate::scanner::analyzer::Analysis;

pub use alert::{alert, format_alert};
pub use export::{Exporter, Snapshot};

/// Alerts on promising tokens and keeps the export artifacts current
pub struct AlertExporter {
    exporter: Exporter,
}

impl AlertExporter {
    pub fn new(exporter: Exporter) -> Self {
        Self { exporter }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(Exporter::from_config(config))
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    pub fn alert(&self, analysis: &Analysis) {
        alert::alert(analysis);
    }

    /// Write both artifacts. Failures are logged and reported as `false`.
    pub async fn export(&self, promising: &[Analysis], total_tokens_analyzed: usize) -> bool {
        match self.exporter.export(promising, total_tokens_analyzed).await {
            Ok(()) => true,
            Err(e) => {
                error!("Error exporting results: {}", e);
                false
            }
        }
    }
}
