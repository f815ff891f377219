//! # `dyld-meta`
//!
//! The `dyld-meta` crate provides a unified interface for reading the
//! versioned binary metadata formats embedded in Apple executables and OS
//! caches:
//!
//! * dyld chained fixups (the `LC_DYLD_CHAINED_FIXUPS` payload and the
//!   pointer chains it describes), see [`read::fixups`];
//! * the Rosetta AOT translation cache, see [`read::aot`];
//! * the ObjC and Swift shared-cache optimization tables, see
//!   [`read::objc`] and [`read::swift`].
//!
//! Everything is decoded from caller-supplied byte slices: the crate
//! performs no I/O and never mutates or executes what it reads. Truncated
//! or corrupt input surfaces as a typed [`read::Error`], never as a read
//! outside the supplied buffer. Where a format cannot identify its own
//! layout from content alone, the reader takes an explicit schema selector
//! instead of guessing.
//!
//! Locating these blobs inside a Mach-O file or cache (load command
//! scanning, segment lookup) is out of scope; pair this crate with a
//! general object file parser for that.
//!
//! ## Example
//!
//! Walk a fixup chain consisting of a single arm64e rebase slot:
//!
//! ```
//! use dyld_meta::read::fixups::{FixupChain, FixupEntry, PointerFormat};
//! use dyld_meta::Bytes;
//!
//! let page = 0x0000_0000_0012_3456u64.to_le_bytes();
//! let mut chain = FixupChain::new(Bytes(&page), PointerFormat::Arm64e, 0);
//! while let Ok(Some(fixup)) = chain.next() {
//!     match fixup.entry {
//!         FixupEntry::Rebase(rebase) => println!("rebase to {:#x}", rebase.target),
//!         FixupEntry::Bind(bind) => println!("bind ordinal {}", bind.ordinal),
//!     }
//! }
//! ```

#![deny(missing_docs)]
#![no_std]

#[cfg(feature = "cargo-all")]
compile_error!(
    "'--all-features' is not supported; use '--features all' instead. \
     This is because 'cargo-all' is a dummy feature to detect when \
     '--all-features' is used."
);

#[cfg(feature = "std")]
#[allow(unused_imports)]
#[macro_use]
extern crate std;

mod endian;
pub use endian::*;

mod pod;
pub use pod::{bytes_of, from_bytes, slice_from_bytes, Bytes, Pod};

pub mod bitfield;

#[cfg(feature = "aot")]
pub mod aot;
#[cfg(feature = "fixups")]
pub mod fixups;
#[cfg(feature = "objc")]
pub mod objc;
#[cfg(feature = "objc")]
pub mod swift;

#[cfg(feature = "read_core")]
pub mod read;
