//! Placement of everything inside the plugin region.
//!
//! The region is treated as an arena with two ends. The low end holds the
//! [`PreparedHeader`] followed by the executable image and grows upward; the
//! heap is whatever lies above the image. The high end holds the container's
//! raw header, staged downward from the region's last byte. Both bounds are
//! computed before anything is written and must not cross.
//!
//! ```text
//! base                                                   base + region size
//! | PreparedHeader | code | rodata | data | bss | pad |  heap ... | raw header |
//! |<---------------- image size ---------------------->|<------ heap size ---->|
//! ```

use crate::{ LoaderConfig, SegmentError };
use crate::format::Executable ;



/// Size of the serialized [`PreparedHeader`].
pub const PREPARED_HEADER_SIZE: u32 = 0xA0 ;

/// Number of configuration words handed to the plugin.
pub const CONFIG_WORDS: usize = 32 ;

/// Rounds `value` up to a multiple of `align`, which must be a power of two.
///
/// ```
/// use plgldr::layout::align_up ;
///
/// assert_eq!( align_up( 0x1001, 0x1000 ), 0x2000 );
/// assert_eq!( align_up( 0x2000, 0x1000 ), 0x2000 );
/// ```
pub const fn align_up( value: u64, align: u64 ) -> u64 {
	( value + align - 1 ) & !( align - 1 )
}

/// The computed arena bounds for one load.
#[derive( Copy, Clone, Debug, Eq, PartialEq )]
pub struct ImageLayout {
	region_size: u32,
	image_size: u32,
	raw_header_start: u32,
}

impl ImageLayout {

	/// Lays out `executable` and a staged raw header of `raw_header_len` bytes in a region of `region_size`.
	///
	/// # Errors
	/// Returns [`SegmentError::ImageTooLarge`] if the page-aligned image and the staged
	/// header together exceed the region, leaving no room for a non-negative heap.
	pub fn compute( executable: &Executable, raw_header_len: usize, region_size: u32 ) -> Result<Self, SegmentError> {

		let page = u64::from( LoaderConfig::PAGE_SIZE );
		let image_size = align_up( u64::from( PREPARED_HEADER_SIZE ) + executable.loaded_size(), page );
		let staged = raw_header_len as u64 ;

		let too_large = || SegmentError::ImageTooLarge {
			image_size: u32::try_from( image_size ).unwrap_or( u32::MAX ),
			region_size,
		};

		let raw_header_start = u64::from( region_size )
			.checked_sub( staged )
			.filter(| start | image_size <= *start )
			.ok_or_else( too_large )?;

		let layout = Self {
			region_size,
			image_size: u32::try_from( image_size ).map_err(| _ | too_large() )?,
			raw_header_start: u32::try_from( raw_header_start ).map_err(| _ | too_large() )?,
		};
		debug_assert!( layout.image_size % LoaderConfig::PAGE_SIZE == 0 );
		debug_assert!( layout.image_size <= layout.raw_header_start );
		Ok( layout )

	}

	/// Page-aligned size of the prepared header plus all segments.
	#[inline] pub fn image_size( &self ) -> u32 { self.image_size }

	/// Everything above the image. The staged raw header lives at its top until the heap is cleared.
	#[inline] pub fn heap_size( &self ) -> u32 { self.region_size - self.image_size }

	/// Offset of the first segment byte.
	#[inline] pub fn segments_start( &self ) -> u32 { PREPARED_HEADER_SIZE }

	/// Offset where the staged raw header begins; it runs to the end of the region.
	#[inline] pub fn raw_header_start( &self ) -> u32 { self.raw_header_start }

}

/// Control block written at the base of the region and read by the plugin runtime.
#[derive( Clone, Debug, Eq, PartialEq )]
pub struct PreparedHeader {
	pub magic: u32,
	pub version: u32,
	pub heap_address: u32,
	pub heap_size: u32,
	pub image_size: u32,
	pub is_default_plugin: bool,
	pub event_channel: u32,
	pub reply_channel: u32,
	pub config: [u32; CONFIG_WORDS],
}

impl PreparedHeader {

	/// `"PLGH"` read as a little-endian word.
	pub const MAGIC: u32 = u32::from_le_bytes( *b"PLGH" );

	/// An empty header carrying only the magic.
	pub fn new() -> Self {
		Self {
			magic: Self::MAGIC,
			version: 0,
			heap_address: 0,
			heap_size: 0,
			image_size: 0,
			is_default_plugin: false,
			event_channel: 0,
			reply_channel: 0,
			config: [0; CONFIG_WORDS],
		}
	}

	fn words( &self ) -> impl Iterator<Item = u32> + '_ {
		[
			self.magic,
			self.version,
			self.heap_address,
			self.heap_size,
			self.image_size,
			u32::from( self.is_default_plugin ),
			self.event_channel,
			self.reply_channel,
		].into_iter().chain( self.config.iter().copied() )
	}

	/// Serializes the header into the first [`PREPARED_HEADER_SIZE`] bytes of `out`.
	///
	/// # Panics
	/// Panics if `out` is shorter than [`PREPARED_HEADER_SIZE`].
	pub fn write_to( &self, out: &mut [u8] ) {
		out[..PREPARED_HEADER_SIZE as usize]
			.chunks_exact_mut( 4 )
			.zip( self.words() )
			.for_each(|( slot, word )| slot.copy_from_slice( &word.to_le_bytes() ));
	}

	/// Reads a header back from the base of a region, or `None` if it is too short or the magic is wrong.
	pub fn read_from( bytes: &[u8] ) -> Option<Self> {
		let mut words = bytes.get( ..PREPARED_HEADER_SIZE as usize )?
			.chunks_exact( 4 )
			.map(| chunk | u32::from_le_bytes([ chunk[0], chunk[1], chunk[2], chunk[3] ]));
		let mut next = || words.next().unwrap_or_default();
		let mut header = Self {
			magic: next(),
			version: next(),
			heap_address: next(),
			heap_size: next(),
			image_size: next(),
			is_default_plugin: next() != 0,
			event_channel: next(),
			reply_channel: next(),
			config: [0; CONFIG_WORDS],
		};
		header.config.iter_mut().for_each(| word | *word = next() );
		( header.magic == Self::MAGIC ).then_some( header )
	}

}

impl Default for PreparedHeader {
	fn default() -> Self { Self::new() }
}
