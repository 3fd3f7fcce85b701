//! A loader that injects native plugin images into freshly launched guest processes.
//!
//! When a guest process is created, but before it runs any of its own code, the
//! host hands it to a [`PluginLoader`]. The loader finds the guest's plugin on
//! storage, validates the container, reserves a memory region, copies the
//! plugin into it, maps the region into the guest and finally patches the
//! guest's entry point so its first instructions jump into the plugin runtime.
//!
//! # Pipeline
//!
//! Each stage can abort the load; a failed load releases the region and leaves
//! the guest untouched.
//!
//! 1. [`resolver`] - find `<root>/<TitleId>/*.3gx`, falling back to `<root>/default.3gx`
//! 2. [`format`] - check magic and version, then parse the header, targets and payloads
//! 3. [`compat`] - reject emulator-only plugins, homebrew guests the plugin refuses,
//! 	and titles missing from the target list
//! 4. [`memory`] - reserve one region of the container's [`MemoryTier`]
//! 5. [`segments`] - stage the raw header at the top, copy the segments to the bottom
//! 6. [`injector`] - write the [`PreparedHeader`]( layout::PreparedHeader ), map the region,
//! 	install the entry [`hook`]
//!
//! # Host Primitives
//!
//! The loader reaches the outside world only through three traits:
//!
//! - [`Storage`]( resolver::Storage ): directory enumeration and file reads. [`FsStorage`]( resolver::FsStorage )
//! 	implements it over `std::fs`.
//! - [`MemoryPool`]: allocation of large owned blocks.
//! - [`Kernel`]: process queries, process control, cross-process mapping and cache flushes.
//!
//! # Forced Parameters
//!
//! An operator can force the next load (or every load, when persistent) to use
//! a given file, memory strategy and configuration block through
//! [`PluginLoader::set_forced_parameters`]. The title filter limits the override
//! to one title.
//!
//! # Errors
//!
//! Every failure is a [`LoadError`], also kept in the [`LoadContext`] until the
//! next load. [`LoadError::user_message`] yields the text to show an operator;
//! a homebrew guest refused by its plugin deliberately has none, since that is
//! the expected outcome for most homebrew launches.

mod title_id ;
mod error ;
mod config ;
mod context ;
mod loader ;
pub mod kernel ;
pub mod memory ;
pub mod resolver ;
pub mod format ;
pub mod compat ;
pub mod layout ;
pub mod segments ;
pub mod hook ;
pub mod injector ;

pub use title_id::TitleId ;
pub use error::{ LoadError, FileResolutionError, FormatError, CompatibilityError, ResourceError, SegmentError };
pub use config::LoaderConfig ;
pub use context::{ LoadContext, LoadState, ForcedLoadParameters, MemoryStrategy };
pub use loader::PluginLoader ;
pub use kernel::{ Kernel, KernelError, ProcessHandle, ProcessOp };
pub use memory::{ MemoryPool, MemoryTier, RawBlock, Region };
