//! Saved-payload source: reads `{dir}/{SYMBOL}.json` files written in the
//! provider's own response format. Used for offline ingestion and tests.

use super::provider::{DailyPayload, DataError, PriceSource};
use std::fs;
use std::path::{Path, PathBuf};

pub struct JsonFileSource {
    dir: PathBuf,
}

impl JsonFileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn payload_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.json"))
    }

    /// Save a payload where `fetch` will find it.
    pub fn save(&self, symbol: &str, payload: &DailyPayload) -> Result<(), DataError> {
        let file_err = |message: String| DataError::PayloadFile {
            symbol: symbol.to_string(),
            message,
        };
        fs::create_dir_all(&self.dir).map_err(|e| file_err(format!("create dir: {e}")))?;
        let json = serde_json::to_string_pretty(payload).map_err(|e| file_err(e.to_string()))?;
        fs::write(self.payload_path(symbol), json).map_err(|e| file_err(format!("write: {e}")))
    }
}

impl PriceSource for JsonFileSource {
    fn name(&self) -> &str {
        "json_file"
    }

    fn fetch(&self, symbol: &str) -> Result<DailyPayload, DataError> {
        let path = self.payload_path(symbol);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        let content = fs::read_to_string(&path).map_err(|e| DataError::PayloadFile {
            symbol: symbol.to_string(),
            message: format!("read {}: {e}", path.display()),
        })?;
        serde_json::from_str(&content).map_err(|e| {
            DataError::ResponseFormatChanged(format!("{}: {e}", path.display()))
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}
