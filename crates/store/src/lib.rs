pub mod error;
pub mod memory;
pub mod store;

pub use error::StoreError;
pub use memory::{MemoryLocationStore, MemoryMediaStore};
pub use store::{LOCATION_LIST_CAP, LocationStore, MEDIA_LIST_CAP, MediaStore};
