pub mod device;
pub mod event;
pub mod media;
pub mod types;

pub use device::Device;
pub use event::{LiveEvent, LocationEvent};
pub use media::{MediaKind, MediaRecord};
pub use types::{BlobId, DeviceId, RecordId, SessionId};
