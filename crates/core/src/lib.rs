pub mod config;
pub mod error;

pub use config::{
    BackendConfig, CatalogChoice, Config, MailConfig, ReportConfig, ReportFormat,
};
pub use error::*;
