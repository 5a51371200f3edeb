pub mod controller;
pub mod library;

pub use controller::MediaController;
pub use library::MediaLibrary;
