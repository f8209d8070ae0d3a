//! Rewrites the installed fields of an ELF binary — the program interpreter
//! (`PT_INTERP`), the shared-object name (`DT_SONAME`), and the runtime
//! library search path (`DT_RUNPATH`/`DT_RPATH`) — producing an output that
//! differs from the input only in those fields and the minimal structural
//! changes needed to store them.
//!
//! A pure-userspace file transformation: no loader, no linker, and no
//! dynamic linking of the target involved. Strings that no longer fit are
//! placed in one additional loadable region spliced in right after the
//! mapped image, so everything the input already referenced keeps its
//! offsets and addresses.
//!
//! ```no_run
//! use elfpatch::Patcher;
//!
//! fn main() -> elfpatch::Result<()> {
//!     let mut patcher = Patcher::open("/bin/ls")?;
//!     println!("{:?}", patcher.interpreter()?);
//!     patcher.set_interpreter("/opt/lib/ld-linux-x86-64.so.2")?;
//!     patcher.set_runpath("$ORIGIN/../lib")?;
//!     patcher.save_to("ls.patched")?;
//!     Ok(())
//! }
//! ```

pub mod container;
pub mod elf;
pub mod error;
pub mod patch;
pub mod strtab;

pub use crate::error::{Error, Result};
pub use crate::patch::Patcher;
