mod engine;

pub use engine::SheetExporter;
