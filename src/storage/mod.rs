pub mod local_file;

pub use local_file::LocalFileStorage;

use crate::core::StorageConfig;

pub fn from_config(config: &StorageConfig) -> LocalFileStorage {
    match config {
        StorageConfig::LocalFile { path } => LocalFileStorage::new(path.clone()),
    }
}
