use crate::{ LoaderConfig, ResourceError };
use crate::hook::{ self, SavedEntry };
use crate::kernel::{ Kernel, ProcessHandle, ProcessOp };
use crate::layout::PreparedHeader ;
use crate::memory::Region ;



/// Hands a fully loaded region to the guest and hooks its entry point.
///
/// Order matters: the header and heap are written before the region is
/// mapped, permissions are raised before the mapping request, and the entry
/// point is patched last, only once the plugin is mapped behind it. Any error
/// therefore leaves the guest's code exactly as it was. The region stays owned
/// by the caller, who must release it on error.
///
/// # Errors
/// - [`ResourceError::MappingFailed`] if a process control call or the region mapping fails
/// - [`ResourceError::EntryMappingFailed`] if the entry page cannot be aliased; the
/// 	region mapping is undone first
pub fn inject<K: Kernel>(
	kernel: &mut K,
	process: ProcessHandle,
	region: &mut Region,
	header: &PreparedHeader,
	config: &LoaderConfig,
) -> Result<SavedEntry, ResourceError> {

	let bytes = region.bytes_mut();
	header.write_to( bytes );
	bytes[header.image_size as usize..].fill( 0 );

	[ ProcessOp::SetMmuToRwx, ProcessOp::SignalOnExit ]
		.into_iter()
		.try_for_each(| op | kernel.control_process( process, op ))
		.map_err( ResourceError::MappingFailed )?;

	kernel.map_region( process, region, config.heap_address() ).map_err( ResourceError::MappingFailed )?;

	hook::install( kernel, process, config.entry_address(), config.trampoline_address )
		.map_err(| err | {
			kernel.unmap_region( process, region, config.heap_address() );
			ResourceError::EntryMappingFailed( err )
		})

}
