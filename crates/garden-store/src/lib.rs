pub mod config;
pub mod error;
pub mod garden;
pub mod schema;
pub mod store;

pub use config::{default_data_dir, load_config, parse_config};
pub use error::{Result, StoreError};
pub use garden::Garden;
pub use store::{ContactStore, StoreRecorder};
