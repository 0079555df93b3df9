#![deny(unsafe_code)]

pub mod index;
pub mod loader;
pub mod source;

pub use index::{IndexSnapshot, IndexStats, IndexedEntry, OntologyIndex};
pub use loader::{DirectorySource, load_vocabulary};
pub use source::{MemorySource, OntologySource};
