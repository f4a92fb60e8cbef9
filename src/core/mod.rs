/// Reader, processor and writer traits shared by every component.
pub mod item;

/// Runs a reader through a processor into a writer.
pub mod step;
