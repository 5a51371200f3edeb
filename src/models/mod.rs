pub mod media;

pub use media::{MediaAsset, MediaAssetId, MediaKind};
