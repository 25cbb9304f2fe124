//! Pipeline stage kernels
//!
//! The stateless kernels (`zic`, `intra`, `icc`) are plain functions over a
//! block and a section's tables; any number of them may run concurrently.
//! The stateful ones (`init_adder`, `buffer`, `inter`) are structs whose
//! state is confined to the serial stage that owns them and which must see
//! blocks in tag order.

pub mod buffer;
pub mod icc;
pub mod init_adder;
pub mod inter;
pub mod intra;
pub mod zic;
