pub mod compress;
pub mod packer;
pub mod schema;

pub use compress::{compress, decompress};
pub use packer::{pack, pack_all, unpack, unpack_all};
pub use schema::{PackingSchema, SchemaNode};
