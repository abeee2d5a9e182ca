//! Schema Module - IDL Compiler and Schema Model
//!
//! Compiles the block definition language into an immutable [`Schema`]:
//!
//! 1. **Symbol Table** - fixed-slot chained hash map for name and id lookup
//! 2. **Parser** - hand-written scanner and recursive-descent parser
//! 3. **Compiler** - duplicate checks, dense id index, custom type resolution
//!
//! ```text
//! person 1 {
//!     name string required;
//!     phones phone[];
//! }
//! phone 2 {
//!     number string;
//! }
//! ```

pub mod compiler;
pub mod parser;
pub mod table;
pub mod types;

pub use parser::{MAX_BLOCK_ID, MAX_FIELDS};
pub use table::SymbolTable;
pub use types::{Block, BlockIndex, Field, FieldType, Requirement, Schema, ValueKind};
