use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A wrapper for the token store configuration:
/// - persist: if false, tokens only live in memory for the lifetime of the process.
/// - backend: the durable backend used when persisting.
#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
pub struct StoreConfig {
    #[serde(default)]
    pub persist: bool,
    #[serde(flatten)]
    pub backend: Option<StoreBackend>,
}

/// The durable store backends, told apart by a "type" tag in the YAML.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(tag = "type")]
pub enum StoreBackend {
    #[serde(rename = "file")]
    File(FileStoreConfig),
}

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct FileStoreConfig {
    pub path: PathBuf,
}
