use std::path::PathBuf ;

use crate::context::MemoryStrategy ;
use crate::memory::MemoryTier ;



/// Static configuration of a [`PluginLoader`]( crate::PluginLoader ).
///
/// Everything has a default matching the stock layout except the trampoline
/// address, which depends on where the host placed its patch code.
///
/// ```
/// use plgldr::{ LoaderConfig, MemoryTier };
///
/// let config = LoaderConfig::new( 0x2000_1000 )
/// 	.with_plugin_root( "/luma/plugins" )
/// 	.with_tier_size( MemoryTier::Small, 3 * 1024 * 1024 );
///
/// assert_eq!( config.tier_size( MemoryTier::Small ), 3 * 1024 * 1024 );
/// assert_eq!( config.tier_size( MemoryTier::Large ), 10 * 1024 * 1024 );
/// ```
#[derive( Clone, Debug )]
#[must_use = "pass the config to PluginLoader::new()"]
pub struct LoaderConfig {
	/// Directory holding the per-title directories and the default plugin
	pub(crate) plugin_root: PathBuf,
	/// Plugin file extension, matched case-insensitively
	pub(crate) extension: String,
	/// File stem of the fallback plugin inside `plugin_root`
	pub(crate) default_stem: String,
	/// Directory entries requested per read
	pub(crate) dir_batch_size: usize,
	/// Region size of each [`MemoryTier`], indexed by [`MemoryTier::index`]
	pub(crate) tier_sizes: [u32; 4],
	/// Guest virtual address of the first instruction the guest executes
	pub(crate) entry_address: u32,
	/// Guest virtual address the region is mapped at
	pub(crate) heap_address: u32,
	/// Address the entry hook branches to
	pub(crate) trampoline_address: u32,
	pub(crate) event_channel: u32,
	pub(crate) reply_channel: u32,
	/// Strategy used when no forced parameters apply
	pub(crate) memory_strategy: MemoryStrategy,
}

impl LoaderConfig {

	/// Page granularity of every mapping the loader makes.
	pub const PAGE_SIZE: u32 = 0x1000 ;

	pub fn new( trampoline_address: u32 ) -> Self {
		Self {
			plugin_root: PathBuf::from( "/luma/plugins" ),
			extension: "3gx".to_string(),
			default_stem: "default".to_string(),
			dir_batch_size: 10,
			tier_sizes: [
				5 * 1024 * 1024,
				2 * 1024 * 1024,
				10 * 1024 * 1024,
				5 * 1024 * 1024,
			],
			entry_address: 0x0010_0000,
			heap_address: 0x0600_0000,
			trampoline_address,
			event_channel: 0,
			reply_channel: 0,
			memory_strategy: MemoryStrategy::None,
		}
	}

	pub fn with_plugin_root( mut self, root: impl Into<PathBuf> ) -> Self {
		self.plugin_root = root.into();
		self
	}

	/// Sets the plugin extension, without the leading dot.
	pub fn with_extension( mut self, extension: impl Into<String> ) -> Self {
		self.extension = extension.into();
		self
	}

	pub fn with_default_stem( mut self, stem: impl Into<String> ) -> Self {
		self.default_stem = stem.into();
		self
	}

	/// Sets how many directory entries are requested per read. Zero is treated as one.
	pub fn with_dir_batch_size( mut self, batch_size: usize ) -> Self {
		self.dir_batch_size = batch_size.max( 1 );
		self
	}

	/// Overrides the byte size of one tier.
	pub fn with_tier_size( mut self, tier: MemoryTier, size: u32 ) -> Self {
		self.tier_sizes[tier.index()] = size ;
		self
	}

	pub fn with_entry_address( mut self, address: u32 ) -> Self {
		self.entry_address = address ;
		self
	}

	pub fn with_heap_address( mut self, address: u32 ) -> Self {
		self.heap_address = address ;
		self
	}

	/// Sets the physical addresses of the event and reply channels handed to the plugin.
	pub fn with_event_channels( mut self, event: u32, reply: u32 ) -> Self {
		self.event_channel = event ;
		self.reply_channel = reply ;
		self
	}

	pub fn with_memory_strategy( mut self, strategy: MemoryStrategy ) -> Self {
		self.memory_strategy = strategy ;
		self
	}

	#[inline] pub fn tier_size( &self, tier: MemoryTier ) -> u32 { self.tier_sizes[tier.index()] }
	#[inline] pub fn plugin_root( &self ) -> &std::path::Path { &self.plugin_root }
	#[inline] pub fn entry_address( &self ) -> u32 { self.entry_address }
	#[inline] pub fn heap_address( &self ) -> u32 { self.heap_address }

	/// Path of the fallback plugin.
	pub fn default_plugin_path( &self ) -> PathBuf {
		self.plugin_root().join( format!( "{}.{}", self.default_stem, self.extension ))
	}

}
