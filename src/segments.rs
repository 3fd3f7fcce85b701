use std::io::{ Read, Seek, SeekFrom };

use crate::SegmentError ;
use crate::format::Container ;
use crate::layout::ImageLayout ;
use crate::memory::Region ;



/// Lays out and copies the executable segments of `container` into `region`.
///
/// The raw container header is staged at the top of the region first, then
/// code, rodata and data are streamed in right after the prepared-header slot
/// and the bss plus page padding is zeroed. Every range is validated before the
/// first byte is written, so a rejected container leaves the region untouched.
///
/// # Errors
/// - [`SegmentError::MissingLoadRoutine`] if there is no code, or the executable is
/// 	checksummed but ships no load payload
/// - [`SegmentError::ImageTooLarge`] if the image does not fit the region
/// - [`SegmentError::CorruptLayout`] if a segment lies outside the file
/// - [`SegmentError::ReadFailed`] if the stream comes up short
pub fn load_segments<R: Read + Seek>(
	stream: &mut R,
	container: &Container,
	region: &mut Region,
) -> Result<ImageLayout, SegmentError> {

	let executable = container.executable();
	let info = container.info();

	if executable.code_size == 0 || ( info.exe_load_checksum != 0 && container.payloads().load.is_empty() ) {
		return Err( SegmentError::MissingLoadRoutine );
	}

	let raw_header = container.raw_header();
	let layout = ImageLayout::compute( executable, raw_header.len(), region.size() )?;

	let in_file = | ( offset, size ): ( u32, u32 ) | u64::from( offset ) + u64::from( size ) <= container.file_size();
	if !executable.file_segments().into_iter().all( in_file ) {
		return Err( SegmentError::CorruptLayout );
	}

	let bytes = region.bytes_mut();
	bytes[layout.raw_header_start() as usize..].copy_from_slice( raw_header );

	let mut cursor = layout.segments_start() as usize ;
	for ( offset, size ) in executable.file_segments() {
		let size = size as usize ;
		if size == 0 { continue }
		stream.seek( SeekFrom::Start( u64::from( offset ))).map_err(| _ | SegmentError::ReadFailed )?;
		stream.read_exact( &mut bytes[cursor..cursor + size] ).map_err(| _ | SegmentError::ReadFailed )?;
		cursor += size ;
	}

	bytes[cursor..layout.image_size() as usize].fill( 0 );

	tracing::trace!(
		image_size = layout.image_size(),
		heap_size = layout.heap_size(),
		bss_size = executable.bss_size,
		"segments loaded"
	);

	Ok( layout )

}
