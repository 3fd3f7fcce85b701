//! The plugin memory region and its allocator.
//!
//! A container picks one of four fixed [`MemoryTier`]s; the loader reserves a
//! single block of that size from a [`MemoryPool`] and holds it in a
//! [`RegionAllocator`]. Only one region exists at a time: reserving again
//! releases the previous one first.

use crate::FormatError ;
use crate::ResourceError ;
use crate::kernel::KernelError ;



/// One of the four region sizes a container may request.
///
/// The byte size of each tier comes from [`LoaderConfig`]( crate::LoaderConfig ).
#[derive( Copy, Clone, Debug, Eq, Hash, PartialEq )]
pub enum MemoryTier {
	/// Tier 0, 5 MiB by default.
	Default,
	/// Tier 1, 2 MiB by default.
	Small,
	/// Tier 2, 10 MiB by default.
	Large,
	/// Tier 3, 5 MiB by default, reserved for future use.
	Reserved,
}

impl MemoryTier {
	/// Position of the tier in the size table.
	pub const fn index( self ) -> usize {
		match self {
			Self::Default => 0,
			Self::Small => 1,
			Self::Large => 2,
			Self::Reserved => 3,
		}
	}
}

impl TryFrom<u8> for MemoryTier {
	type Error = FormatError ;
	fn try_from( raw: u8 ) -> Result<Self, Self::Error> {
		match raw {
			0 => Ok( Self::Default ),
			1 => Ok( Self::Small ),
			2 => Ok( Self::Large ),
			3 => Ok( Self::Reserved ),
			_ => Err( FormatError::InvalidField( "memory region size" )),
		}
	}
}

/// A block handed out by a [`MemoryPool`].
///
/// `memory` is the host's view of the block; `handle` is what the kernel needs
/// to map the same pages into another process.
pub struct RawBlock {
	pub handle: u32,
	pub memory: Box<[u8]>,
}

impl std::fmt::Debug for RawBlock {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::result::Result<(), std::fmt::Error> {
		f.debug_struct( "RawBlock" )
			.field( "handle", &self.handle )
			.field( "memory", &format!( "Memory[len={:#x}]", self.memory.len() ))
			.finish()
	}
}

/// Source of large owned memory blocks.
pub trait MemoryPool {

	/// Allocates a zeroed block of exactly `size` bytes.
	///
	/// # Errors
	/// Fails if the pool cannot satisfy the request.
	fn allocate( &mut self, size: u32 ) -> Result<RawBlock, KernelError> ;

	/// Returns a block to the pool.
	fn free( &mut self, block: RawBlock );

}

/// The memory region reserved for the plugin currently being loaded or attached.
#[derive( Debug )]
pub struct Region {
	tier: MemoryTier,
	block: RawBlock,
}

impl Region {

	/// Tier this region was reserved for.
	#[inline] pub fn tier( &self ) -> MemoryTier { self.tier }

	/// Kernel handle of the underlying block.
	#[inline] pub fn handle( &self ) -> u32 { self.block.handle }

	/// Size of the region in bytes.
	#[allow( clippy::cast_possible_truncation )]
	#[inline] pub fn size( &self ) -> u32 { self.block.memory.len() as u32 }

	/// Host view of the region.
	#[inline] pub fn bytes( &self ) -> &[u8] { &self.block.memory }

	/// Mutable host view of the region.
	#[inline] pub fn bytes_mut( &mut self ) -> &mut [u8] { &mut self.block.memory }

}

/// Owns the single plugin region and the pool it comes from.
#[derive( Debug )]
pub struct RegionAllocator<P> {
	pool: P,
	held: Option<Region>,
}

impl<P: MemoryPool> RegionAllocator<P> {

	pub fn new( pool: P ) -> Self {
		Self { pool, held: None }
	}

	/// Reserves `size` bytes for `tier`, releasing any region still held.
	///
	/// The size is taken as given; the allocator does not second-guess the
	/// container's tier against its actual segment sizes.
	///
	/// # Errors
	/// Returns [`ResourceError::AllocationFailed`] if the pool refuses the block.
	pub fn reserve( &mut self, tier: MemoryTier, size: u32 ) -> Result<&mut Region, ResourceError> {
		self.release();
		let block = self.pool.allocate( size ).map_err(| err | {
			tracing::debug!( size, error = %err, "memory pool refused region" );
			ResourceError::AllocationFailed { size }
		})?;
		Ok( self.held.insert( Region { tier, block }))
	}

	/// Frees the held region, if any. Returns whether one was held.
	pub fn release( &mut self ) -> bool {
		match self.held.take() {
			Some( region ) => { self.pool.free( region.block ); true },
			None => false,
		}
	}

	#[inline] pub fn region( &self ) -> Option<&Region> { self.held.as_ref() }

}
