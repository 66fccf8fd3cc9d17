//! Command implementations.

pub mod config;
pub mod download;
pub mod extract;
pub mod fetch_index;
pub mod map;
pub mod run;

pub use self::config::execute_config;
pub use self::download::execute_download;
pub use self::extract::execute_extract;
pub use self::fetch_index::execute_fetch_index;
pub use self::map::execute_map;
pub use self::run::execute_run;
