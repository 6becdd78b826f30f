mod flat;
mod qdrant;

pub use flat::{FlatIndex, IndexManifest, INDEX_DATA_FILE, INDEX_META_FILE};
pub use qdrant::QdrantVectorStore;
