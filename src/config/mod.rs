//! Configuration module

mod settings;

pub use settings::BlogConfig;
pub use settings::FetchConfig;
pub use settings::GitHubConfig;
pub use settings::LocalConfig;
pub use settings::RenderConfig;
pub use settings::ServerConfig;
pub use settings::SourceKind;
pub use settings::{SOURCE_ENV, TOKEN_ENV};
