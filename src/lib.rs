pub mod config;
pub mod document;
pub mod notice;
pub mod paths;
pub mod pipeline;
pub mod preview;
pub mod record;
pub mod render;
pub mod replicate;
pub mod schema;
pub mod secret;
pub mod source;
pub mod storage;


pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to resolve schema: {0}")]
    Schema(schema::Error),
    #[error("Failed to replicate attachment: {0}")]
    Attachment(replicate::Error),
    #[error("Failed to render document: {0}")]
    Render(render::Error),
    #[error("Source request failed: {0}")]
    Transport(BoxError),
    #[error("Storage request failed: {0}")]
    Storage(BoxError),
    #[error("Failed to read secret: {0}")]
    Secret(BoxError),
    #[error("Invalid record path: {0}")]
    Path(paths::Error),
    #[error("Scratch file I/O failed: {0}")]
    Scratch(std::io::Error),
}
