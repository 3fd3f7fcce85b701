//! Failure taxonomy for the load pipeline.
//!
//! Each stage reports its own enum; [`LoadError`] gathers them so the stages
//! compose with `?`. The loader keeps the most recent [`LoadError`] in its
//! [`LoadContext`]( crate::LoadContext ), and [`LoadError::user_message`]
//! decides what, if anything, an operator gets to see.

use thiserror::Error ;

use crate::TitleId ;
use crate::kernel::KernelError ;



/// No plugin file could be opened for the guest.
#[derive( Error, Debug, Clone, PartialEq, Eq )]
pub enum FileResolutionError {
	/// Neither the per-title plugin nor the default plugin could be opened.
	#[error( "No plugin found for title {0}" )] NotFound( TitleId ),
	/// The operator forced a path that cannot be opened.
	#[error( "Cannot open plugin file {0}" )] ForcedPathUnavailable( String ),
}

/// The container could not be read or is not one this loader understands.
#[derive( Error, Debug, Clone, PartialEq, Eq )]
pub enum FormatError {
	/// A read from the stream failed or came up short.
	#[error( "Cannot read the plugin file." )] Unreadable,
	/// The magic tag is wrong.
	#[error( "Invalid plugin file\nThis is not a valid 3GX plugin!" )] BadMagic,
	/// The container predates the oldest version this loader parses.
	#[error( "Outdated plugin file (version {0})\nLook for a newer plugin." )] PluginTooOld( u32 ),
	/// The container is newer than this loader.
	#[error( "Outdated plugin loader (plugin version {0})\nCheck for loader updates." )] LoaderTooOld( u32 ),
	/// A fixed-header field holds a value outside its enumeration.
	#[error( "Invalid plugin header field: {0}" )] InvalidField( &'static str ),
	/// The embedded save/load payload ranges fall outside the file.
	#[error( "Invalid save/load payloads." )] InvalidPayload,
}

/// The plugin refuses to attach to this guest.
#[derive( Error, Debug, Clone, PartialEq, Eq )]
pub enum CompatibilityError {
	/// The plugin targets emulators only.
	#[error( "The plugin is only compatible with emulators" )] EmulatorOnly,
	/// The guest is homebrew and the plugin does not allow that.
	#[error( "The plugin does not allow loading on homebrew" )] HomebrewDisallowed,
	/// The guest title is missing from the plugin's target list.
	#[error( "The plugin - {title} -\nis not compatible with this game.\nContact \"{author}\" for more info." )]
	TitleMismatch { title: String, author: String },
}

/// A privileged resource could not be obtained.
#[derive( Error, Debug, Clone, PartialEq, Eq )]
pub enum ResourceError {
	/// The guest's title id could not be queried.
	#[error( "Cannot query the guest process: {0}" )] ProcessQueryFailed( KernelError ),
	/// The memory pool refused a block of the requested size.
	#[error( "Memory allocation failed ({size:#x} bytes)" )] AllocationFailed { size: u32 },
	/// The region could not be mapped into the guest.
	#[error( "Cannot map the plugin into the process: {0}" )] MappingFailed( KernelError ),
	/// The guest's entry page could not be aliased into the host.
	#[error( "Cannot map the process: {0}" )] EntryMappingFailed( KernelError ),
}

/// The executable segments could not be laid out or copied.
#[derive( Error, Debug, Clone, PartialEq, Eq )]
pub enum SegmentError {
	/// The container declares no code to run.
	#[error( "This plugin requires a load function." )] MissingLoadRoutine,
	/// A segment range points outside the file.
	#[error( "This plugin is corrupted." )] CorruptLayout,
	/// A segment read came up short.
	#[error( "Cannot read the plugin code" )] ReadFailed,
	/// The image plus its staged header do not fit in the memory region.
	#[error( "Plugin image ({image_size:#x} bytes) does not fit its memory region ({region_size:#x} bytes)" )]
	ImageTooLarge { image_size: u32, region_size: u32 },
}

/// Any failure of the load pipeline.
#[derive( Error, Debug, Clone, PartialEq, Eq )]
pub enum LoadError {
	#[error( "{0}" )] FileResolution( #[from] FileResolutionError ),
	#[error( "{0}" )] Format( #[from] FormatError ),
	#[error( "{0}" )] Compatibility( #[from] CompatibilityError ),
	#[error( "{0}" )] Resource( #[from] ResourceError ),
	#[error( "{0}" )] Segment( #[from] SegmentError ),
}

impl LoadError {

	/// The message shown to the operator, if any.
	///
	/// Homebrew rejections are expected on nearly every homebrew launch and stay silent.
	pub fn user_message( &self ) -> Option<String> {
		match self {
			Self::Compatibility( CompatibilityError::HomebrewDisallowed ) => None,
			other => Some( other.to_string() ),
		}
	}

}
