//! The privileged primitives the loader drives.
//!
//! The loader never touches another process directly. Everything that needs the
//! kernel goes through [`Kernel`], so a host can back it with real supervisor
//! calls and tests can back it with an in-memory double.

use crate::TitleId ;
use crate::memory::Region ;



/// Opaque handle to a guest process, owned by whoever received the launch event.
#[derive( Copy, Clone, Debug, Eq, Hash, PartialEq )]
pub struct ProcessHandle( pub u32 );

/// A failed privileged call, carrying the raw result code the kernel returned.
#[derive( Copy, Clone, Debug, Eq, Hash, PartialEq )]
pub struct KernelError( pub u32 );

impl std::fmt::Display for KernelError {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> Result<(),std::fmt::Error> {
		write!( f, "kernel result {:#010X}", self.0 )
	}
}

impl std::error::Error for KernelError {}

/// Process control operations the loader requests before mapping a plugin.
#[derive( Copy, Clone, Debug, Eq, Hash, PartialEq )]
pub enum ProcessOp {
	/// Force every code mapping of the process to read/write/execute.
	SetMmuToRwx,
	/// Notify the loader when the process is about to terminate.
	SignalOnExit,
}

/// Supervisor calls used by the injector.
pub trait Kernel {

	/// Returns the title id of `process`.
	///
	/// # Errors
	/// Fails if the handle does not name a live process.
	fn title_id( &mut self, process: ProcessHandle ) -> Result<TitleId, KernelError> ;

	/// Applies a process control operation.
	///
	/// # Errors
	/// Fails if the kernel rejects the operation.
	fn control_process( &mut self, process: ProcessHandle, op: ProcessOp ) -> Result<(), KernelError> ;

	/// Maps the whole of `region` into `process` at virtual `address`.
	///
	/// # Errors
	/// Fails if the address range is taken or the kernel refuses the mapping.
	fn map_region( &mut self, process: ProcessHandle, region: &Region, address: u32 ) -> Result<(), KernelError> ;

	/// Undoes [`Kernel::map_region`].
	fn unmap_region( &mut self, process: ProcessHandle, region: &Region, address: u32 );

	/// Aliases `size` bytes of `process` at `address` into the host at the same address.
	///
	/// # Errors
	/// Fails if the guest range is not mapped or the host range is taken.
	fn map_guest_memory( &mut self, process: ProcessHandle, address: u32, size: u32 ) -> Result<(), KernelError> ;

	/// Drops an alias created by [`Kernel::map_guest_memory`].
	fn unmap_guest_memory( &mut self, address: u32, size: u32 );

	/// Reads a word through a live host alias.
	fn read_word( &mut self, address: u32 ) -> u32 ;

	/// Writes a word through a live host alias.
	fn write_word( &mut self, address: u32, value: u32 );

	/// Flushes the whole data cache so the guest observes host writes.
	fn flush_data_cache( &mut self );

}
