use serde::Deserialize;

use crate::infra::config::{AppConfig, LogConfig, PollingConfig, ServerConfig, TranscriptConfig};

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub logging: Option<FileLogConfig>,
    pub server: Option<FileServerConfig>,
    pub polling: Option<FilePollingConfig>,
    pub transcript: Option<FileTranscriptConfig>,
}

impl FileConfig {
    pub fn merge_into(self, config: &mut AppConfig) {
        if let Some(logging) = self.logging {
            logging.merge_into(&mut config.logging);
        }

        if let Some(server) = self.server {
            server.merge_into(&mut config.server);
        }

        if let Some(polling) = self.polling {
            polling.merge_into(&mut config.polling);
        }

        if let Some(transcript) = self.transcript {
            transcript.merge_into(&mut config.transcript);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogConfig {
    pub level: Option<String>,
    pub file_name: Option<String>,
}

impl FileLogConfig {
    fn merge_into(self, config: &mut LogConfig) {
        if let Some(level) = self.level {
            config.level = level;
        }

        if let Some(file_name) = self.file_name {
            config.file_name = file_name;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileServerConfig {
    pub base_url: Option<String>,
    pub request_timeout_ms: Option<u64>,
}

impl FileServerConfig {
    fn merge_into(self, config: &mut ServerConfig) {
        if let Some(base_url) = self.base_url {
            config.base_url = Some(base_url);
        }

        if let Some(timeout_ms) = self.request_timeout_ms {
            config.request_timeout_ms = timeout_ms;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FilePollingConfig {
    pub interval_ms: Option<u64>,
    pub message_limit: Option<usize>,
}

impl FilePollingConfig {
    fn merge_into(self, config: &mut PollingConfig) {
        if let Some(interval_ms) = self.interval_ms {
            config.interval_ms = interval_ms.max(250);
        }

        if let Some(limit) = self.message_limit {
            config.message_limit = limit;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileTranscriptConfig {
    pub pin_threshold_rows: Option<u32>,
}

impl FileTranscriptConfig {
    fn merge_into(self, config: &mut TranscriptConfig) {
        if let Some(threshold) = self.pin_threshold_rows {
            config.pin_threshold_rows = threshold;
        }
    }
}
