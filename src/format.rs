//! The plugin container format.
//!
//! A container starts with a fixed little-endian header followed by
//! variable-length data the header points into:
//!
//! | offset | field |
//! |---|---|
//! | `0x00` | magic `"3GX$"` |
//! | `0x04` | format version |
//! | `0x08` | info flags: compatibility, allow-homebrew, memory tier, events-self-managed, private memory, swap-not-needed |
//! | `0x10` | title, 32 bytes NUL padded |
//! | `0x30` | author, 32 bytes NUL padded |
//! | `0x50` | exe load checksum |
//! | `0x54` | target count and offset of the `u64` target array |
//! | `0x5C` | code/rodata/data file offsets, then code/rodata/data/bss sizes |
//! | `0x78` | save payload offset and size, load payload offset and size |
//!
//! Nothing in the header is trusted: the magic and version are checked before
//! anything else is read, and every offset/size pair is checked against the
//! stream length before it is followed.

use std::io::{ Read, Seek, SeekFrom };
use nonempty_collections::NEVec ;
use pipe_trait::Pipe ;

use crate::{ FormatError, TitleId };
use crate::memory::MemoryTier ;



/// Magic tag every container starts with.
pub const MAGIC: [u8; 4] = *b"3GX$" ;
/// Oldest container version this parser accepts.
pub const MIN_SUPPORTED_VERSION: u32 = 2 ;
/// Newest container version this parser accepts.
pub const CURRENT_VERSION: u32 = 2 ;
/// Size of the fixed header in bytes.
pub const FIXED_HEADER_SIZE: usize = 0x88 ;

const STRING_FIELD_SIZE: usize = 32 ;
const TARGET_SIZE: u64 = 8 ;

/// Which environments a plugin runs on.
#[derive( Copy, Clone, Debug, Eq, Hash, PartialEq )]
pub enum Compatibility {
	Normal,
	EmulatorOnly,
}

impl TryFrom<u8> for Compatibility {
	type Error = FormatError ;
	fn try_from( raw: u8 ) -> Result<Self, Self::Error> {
		match raw {
			0 => Ok( Self::Normal ),
			1 => Ok( Self::EmulatorOnly ),
			_ => Err( FormatError::InvalidField( "compatibility" )),
		}
	}
}

/// The container's info block.
#[derive( Clone, Debug, Eq, PartialEq )]
pub struct PluginInfo {
	pub compatibility: Compatibility,
	pub allow_homebrew_load: bool,
	pub memory_tier: MemoryTier,
	pub events_self_managed: bool,
	pub use_private_memory: bool,
	pub swap_not_needed: bool,
	pub title: String,
	pub author: String,
	/// Integrity token for the executable, kept for the runtime and never recomputed here.
	pub exe_load_checksum: u32,
}

/// File offsets and sizes of the executable segments.
#[derive( Copy, Clone, Debug, Default, Eq, PartialEq )]
pub struct Executable {
	pub code_offset: u32,
	pub rodata_offset: u32,
	pub data_offset: u32,
	pub code_size: u32,
	pub rodata_size: u32,
	pub data_size: u32,
	pub bss_size: u32,
}

impl Executable {

	/// Bytes copied from the file: code, rodata and data.
	pub fn file_backed_size( &self ) -> u64 {
		u64::from( self.code_size ) + u64::from( self.rodata_size ) + u64::from( self.data_size )
	}

	/// Bytes the segments occupy once loaded, bss included.
	pub fn loaded_size( &self ) -> u64 {
		self.file_backed_size() + u64::from( self.bss_size )
	}

	/// The file-backed segments as `( file offset, size )` pairs, in load order.
	pub fn file_segments( &self ) -> [( u32, u32 ); 3] {
		[
			( self.code_offset, self.code_size ),
			( self.rodata_offset, self.rodata_size ),
			( self.data_offset, self.data_size ),
		]
	}

}

/// Save/load helper routines shipped inside the container.
#[derive( Clone, Debug, Default, Eq, PartialEq )]
pub struct EmbeddedPayloads {
	pub save: Vec<u8>,
	pub load: Vec<u8>,
}

/// A parsed and validated container.
///
/// The segment contents are not read here; the segment loader streams them
/// straight into the memory region.
#[derive( Clone, Debug )]
pub struct Container {
	version: u32,
	info: PluginInfo,
	targets: Option<NEVec<TitleId>>,
	executable: Executable,
	payloads: EmbeddedPayloads,
	raw_header: Vec<u8>,
	file_size: u64,
}

impl Container {

	#[inline] pub fn version( &self ) -> u32 { self.version }
	#[inline] pub fn info( &self ) -> &PluginInfo { &self.info }

	/// Titles this plugin attaches to; `None` means every title.
	#[inline] pub fn targets( &self ) -> Option<&NEVec<TitleId>> { self.targets.as_ref() }

	#[inline] pub fn executable( &self ) -> &Executable { &self.executable }
	#[inline] pub fn payloads( &self ) -> &EmbeddedPayloads { &self.payloads }

	/// The header as stored on disk: the fixed header followed by the target array.
	#[inline] pub fn raw_header( &self ) -> &[u8] { &self.raw_header }

	/// Length of the stream the container was parsed from.
	#[inline] pub fn file_size( &self ) -> u64 { self.file_size }

}

/// Validates the magic and version of `stream`, then parses the rest of the header.
///
/// # Errors
/// - [`FormatError::Unreadable`] if any read fails or a declared range runs past the end
/// - [`FormatError::BadMagic`] if the stream is not a container at all
/// - [`FormatError::PluginTooOld`] / [`FormatError::LoaderTooOld`] on a version outside
/// 	[`MIN_SUPPORTED_VERSION`]`..=`[`CURRENT_VERSION`]
/// - [`FormatError::InvalidField`] for out-of-range enumerations
/// - [`FormatError::InvalidPayload`] if an embedded payload lies outside the file
pub fn validate_and_parse<R: Read + Seek>( stream: &mut R ) -> Result<Container, FormatError> {

	let file_size = stream.seek( SeekFrom::End( 0 )).map_err(| _ | FormatError::Unreadable )?;
	stream.rewind().map_err(| _ | FormatError::Unreadable )?;

	let mut header = vec![ 0u8; FIXED_HEADER_SIZE ];
	stream.read_exact( &mut header[..8] ).map_err(| _ | FormatError::Unreadable )?;
	let version = check_magic( &header[..8] )?;

	stream.read_exact( &mut header[8..] ).map_err(| _ | FormatError::Unreadable )?;
	let mut fields = FieldReader::new( &header[8..] );

	let compatibility = Compatibility::try_from( fields.u8() )?;
	let allow_homebrew_load = fields.flag();
	let memory_tier = MemoryTier::try_from( fields.u8() )?;
	let events_self_managed = fields.flag();
	let use_private_memory = fields.flag();
	let swap_not_needed = fields.flag();
	fields.skip( 2 );
	let title = fields.string();
	let author = fields.string();
	let exe_load_checksum = fields.u32();

	let target_count = fields.u32();
	let target_offset = fields.u32();

	let executable = Executable {
		code_offset: fields.u32(),
		rodata_offset: fields.u32(),
		data_offset: fields.u32(),
		code_size: fields.u32(),
		rodata_size: fields.u32(),
		data_size: fields.u32(),
		bss_size: fields.u32(),
	};

	let save_range = ( fields.u32(), fields.u32() );
	let load_range = ( fields.u32(), fields.u32() );

	let target_bytes = read_range( stream, file_size, target_offset, u64::from( target_count ) * TARGET_SIZE )
		.ok_or( FormatError::Unreadable )?;
	let targets = target_bytes
		.chunks_exact( 8 )
		.map(| chunk | TitleId::new( u64::from_le_bytes( chunk.try_into().unwrap_or_default() )))
		.collect::<Vec<_>>()
		.pipe( NEVec::try_from_vec );

	let payloads = EmbeddedPayloads {
		save: read_range( stream, file_size, save_range.0, u64::from( save_range.1 )).ok_or( FormatError::InvalidPayload )?,
		load: read_range( stream, file_size, load_range.0, u64::from( load_range.1 )).ok_or( FormatError::InvalidPayload )?,
	};

	header.extend_from_slice( &target_bytes );

	Ok( Container {
		version,
		info: PluginInfo {
			compatibility,
			allow_homebrew_load,
			memory_tier,
			events_self_managed,
			use_private_memory,
			swap_not_needed,
			title,
			author,
			exe_load_checksum,
		},
		targets,
		executable,
		payloads,
		raw_header: header,
		file_size,
	})

}

fn check_magic( ident: &[u8] ) -> Result<u32, FormatError> {
	if ident[..4] != MAGIC { return Err( FormatError::BadMagic ) }
	let version = u32::from_le_bytes([ ident[4], ident[5], ident[6], ident[7] ]);
	if version < MIN_SUPPORTED_VERSION { return Err( FormatError::PluginTooOld( version )) }
	if version > CURRENT_VERSION { return Err( FormatError::LoaderTooOld( version )) }
	Ok( version )
}

/// Reads `size` bytes at `offset`, or `None` if the range leaves the stream or the read fails.
fn read_range<R: Read + Seek>( stream: &mut R, file_size: u64, offset: u32, size: u64 ) -> Option<Vec<u8>> {
	if size == 0 { return Some( Vec::with_capacity( 0 )) }
	if u64::from( offset ).checked_add( size )? > file_size { return None }
	let mut buffer = vec![ 0u8; usize::try_from( size ).ok()? ];
	stream.seek( SeekFrom::Start( u64::from( offset ))).ok()?;
	stream.read_exact( &mut buffer ).ok()?;
	Some( buffer )
}

/// Cursor over an in-memory header; the header length is fixed, so reads cannot run short.
struct FieldReader<'a> {
	bytes: &'a [u8],
	position: usize,
}

impl<'a> FieldReader<'a> {

	fn new( bytes: &'a [u8] ) -> Self { Self { bytes, position: 0 }}

	fn take( &mut self, len: usize ) -> &'a [u8] {
		let slice = &self.bytes[self.position..self.position + len];
		self.position += len ;
		slice
	}

	fn skip( &mut self, len: usize ) { self.position += len ; }
	fn u8( &mut self ) -> u8 { self.take( 1 )[0] }
	fn flag( &mut self ) -> bool { self.u8() != 0 }

	fn u32( &mut self ) -> u32 {
		let bytes = self.take( 4 );
		u32::from_le_bytes([ bytes[0], bytes[1], bytes[2], bytes[3] ])
	}

	fn string( &mut self ) -> String {
		let raw = self.take( STRING_FIELD_SIZE );
		let end = raw.iter().position(| byte | *byte == 0 ).unwrap_or( raw.len() );
		String::from_utf8_lossy( &raw[..end] ).into_owned()
	}

}
