pub mod extension;

pub use extension::ExtensionService;
