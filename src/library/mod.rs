pub mod error;
pub mod locator;
pub mod manager;

pub use error::LibraryError;
pub use locator::BlobUrl;
pub use manager::LibraryManager;
