//! Local HTTP front end for yt-dlp: media metadata, a sorted catalog of
//! downloadable formats, and downloads into a local directory.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod info;
pub mod messages;
pub mod routes;

pub use catalog::{EncodingOption, FormatCatalog};
pub use config::AppConfig;
pub use engine::{MediaEngine, YtDlp};
pub use error::{ApiError, EngineError, ServerError};
pub use routes::{AppState, router};
