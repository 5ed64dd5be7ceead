//! Game records: headers, move tree and PGN export

mod export;
mod headers;
mod tree;

pub use export::{PgnWriter, DEFAULT_LINE_WIDTH};
pub use headers::{Headers, SEVEN_TAG_ROSTER};
pub use tree::{Game, Node, NodeId, PlyMove};
