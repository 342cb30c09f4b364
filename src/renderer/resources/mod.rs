//! "Resources" are the images a pass touches. They are created and owned by
//! the caller; passes only borrow handles to them.

pub mod image;

pub use image::{AttachmentImage, ImageBacking};
