//! Service layer for file and upload boundaries

pub mod io;

pub use io::ImageIOService;
