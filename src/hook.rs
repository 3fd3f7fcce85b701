//! The entry hook that diverts a guest's first instructions into the plugin runtime.
//!
//! Installing the hook overwrites two words at the guest entry point with a
//! `ldr pc, [pc, #-4]` followed by the trampoline address. The original words
//! are returned as a [`SavedEntry`] so [`restore`] can put them back.

use crate::LoaderConfig ;
use crate::kernel::{ Kernel, KernelError, ProcessHandle };



/// `ldr pc, [pc, #-4]`: jump to the address stored in the next word.
pub const BRANCH_TO_NEXT_WORD: u32 = 0xE51F_F004 ;

/// The guest words replaced by the hook.
#[derive( Copy, Clone, Debug, Eq, PartialEq )]
pub struct SavedEntry {
	pub address: u32,
	pub words: [u32; 2],
}

/// A guest page aliased into the host, unmapped when dropped.
struct GuestAlias<'k, K: Kernel> {
	kernel: &'k mut K,
	page: u32,
}

impl<'k, K: Kernel> GuestAlias<'k, K> {

	fn map( kernel: &'k mut K, process: ProcessHandle, address: u32 ) -> Result<Self, KernelError> {
		let page = address & !( LoaderConfig::PAGE_SIZE - 1 );
		kernel.map_guest_memory( process, page, LoaderConfig::PAGE_SIZE )?;
		Ok( Self { kernel, page })
	}

	fn read_pair( &mut self, address: u32 ) -> [u32; 2] {
		[ self.kernel.read_word( address ), self.kernel.read_word( address + 4 ) ]
	}

	fn write_pair( &mut self, address: u32, words: [u32; 2] ) {
		self.kernel.write_word( address, words[0] );
		self.kernel.write_word( address + 4, words[1] );
		self.kernel.flush_data_cache();
	}

}

impl<K: Kernel> Drop for GuestAlias<'_, K> {
	fn drop( &mut self ) {
		self.kernel.unmap_guest_memory( self.page, LoaderConfig::PAGE_SIZE );
	}
}

/// Patches the guest entry point at `address` to branch to `trampoline`.
///
/// The guest page is aliased only for the duration of the write and flush.
///
/// # Errors
/// Fails if the entry page cannot be aliased; the guest is then untouched.
pub fn install<K: Kernel>(
	kernel: &mut K,
	process: ProcessHandle,
	address: u32,
	trampoline: u32,
) -> Result<SavedEntry, KernelError> {
	let mut alias = GuestAlias::map( kernel, process, address )?;
	let words = alias.read_pair( address );
	alias.write_pair( address, [ BRANCH_TO_NEXT_WORD, trampoline ]);
	Ok( SavedEntry { address, words })
}

/// Writes the words saved by [`install`] back to the guest entry point.
///
/// # Errors
/// Fails if the entry page cannot be aliased.
pub fn restore<K: Kernel>( kernel: &mut K, process: ProcessHandle, saved: &SavedEntry ) -> Result<(), KernelError> {
	GuestAlias::map( kernel, process, saved.address )?.write_pair( saved.address, saved.words );
	Ok(())
}
