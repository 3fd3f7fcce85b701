//! Locating the plugin file for a guest.
//!
//! Plugins live under `<root>/<TitleId>/` (any file with the plugin
//! extension) with `<root>/default.<ext>` as the fallback. Storage is reached
//! through [`Storage`] so the loader does not care whether it is an SD card
//! archive or a directory on the host.

use std::io::{ Read, Seek };
use std::path::{ Path, PathBuf };

use crate::{ FileResolutionError, LoaderConfig, TitleId };



/// A single directory entry as reported by [`Directory::read`].
#[derive( Clone, Debug, Eq, PartialEq )]
pub struct DirEntry {
	pub name: String,
	pub is_directory: bool,
}

/// An open directory that yields its entries in batches.
pub trait Directory {
	/// Reads up to `max` further entries. An empty batch means the directory is exhausted.
	///
	/// # Errors
	/// Fails on any storage error while enumerating.
	fn read( &mut self, max: usize ) -> std::io::Result<Vec<DirEntry>> ;
}

/// Read-only access to the storage holding plugins.
pub trait Storage {

	type File: Read + Seek ;
	type Dir: Directory ;

	/// Opens a directory for enumeration.
	///
	/// # Errors
	/// Fails if the directory does not exist or cannot be opened.
	fn open_dir( &mut self, path: &Path ) -> std::io::Result<Self::Dir> ;

	/// Opens a file for reading.
	///
	/// # Errors
	/// Fails if the file does not exist or cannot be opened.
	fn open_file( &mut self, path: &Path ) -> std::io::Result<Self::File> ;

}

/// [`Storage`] over the host filesystem, with plugin paths taken relative to `mount`.
#[derive( Clone, Debug )]
pub struct FsStorage {
	mount: PathBuf,
}

impl FsStorage {
	pub fn new( mount: impl Into<PathBuf> ) -> Self { Self { mount: mount.into() }}

	fn host_path( &self, path: &Path ) -> PathBuf {
		self.mount.join( path.strip_prefix( "/" ).unwrap_or( path ))
	}
}

/// Directory handle of [`FsStorage`].
#[derive( Debug )]
pub struct FsDirectory( std::fs::ReadDir );

impl Directory for FsDirectory {
	fn read( &mut self, max: usize ) -> std::io::Result<Vec<DirEntry>> {
		self.0.by_ref()
			.take( max )
			.map(| entry | entry.and_then(| entry | Ok( DirEntry {
				name: entry.file_name().to_string_lossy().into_owned(),
				is_directory: entry.file_type()?.is_dir(),
			})))
			.collect()
	}
}

impl Storage for FsStorage {

	type File = std::fs::File ;
	type Dir = FsDirectory ;

	fn open_dir( &mut self, path: &Path ) -> std::io::Result<Self::Dir> {
		std::fs::read_dir( self.host_path( path )).map( FsDirectory )
	}

	fn open_file( &mut self, path: &Path ) -> std::io::Result<Self::File> {
		std::fs::File::open( self.host_path( path ))
	}

}

/// An opened plugin file.
pub struct ResolvedPlugin<F> {
	pub path: PathBuf,
	pub file: F,
	/// Whether resolution fell back to the default plugin.
	pub is_default: bool,
}

impl<F> std::fmt::Debug for ResolvedPlugin<F> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::result::Result<(), std::fmt::Error> {
		f.debug_struct( "ResolvedPlugin" )
			.field( "path", &self.path )
			.field( "file", &"<File>" )
			.field( "is_default", &self.is_default )
			.finish()
	}
}

const MIN_NAME_LEN: usize = 5 ;

/// Directory holding the plugins of `title`.
pub fn title_dir( config: &LoaderConfig, title: TitleId ) -> PathBuf {
	config.plugin_root().join( title.to_string() )
}

/// Whether a directory entry is a candidate plugin file.
///
/// ```
/// use plgldr::resolver::{ DirEntry, has_plugin_extension };
///
/// let entry = | name: &str | DirEntry { name: name.to_string(), is_directory: false };
/// assert!( has_plugin_extension( &entry( "cheats.3GX" ), "3gx" ));
/// assert!( !has_plugin_extension( &entry( "a.gx" ), "3gx" ));
/// assert!( !has_plugin_extension( &DirEntry { name: "old.3gx".into(), is_directory: true }, "3gx" ));
/// ```
pub fn has_plugin_extension( entry: &DirEntry, extension: &str ) -> bool {
	if entry.is_directory || entry.name.chars().count() < MIN_NAME_LEN { return false }
	entry.name.len().checked_sub( extension.len() )
		.and_then(| start | entry.name.get( start.. ))
		.is_some_and(| tail | tail.eq_ignore_ascii_case( extension ))
}

/// Finds the first plugin file in the per-title directory, in enumeration order.
pub fn find_title_plugin<S: Storage>( storage: &mut S, config: &LoaderConfig, title: TitleId ) -> Option<PathBuf> {

	let dir_path = title_dir( config, title );
	let mut dir = storage.open_dir( &dir_path ).ok()?;

	loop {
		let batch = match dir.read( config.dir_batch_size ) {
			Ok( batch ) if !batch.is_empty() => batch,
			_ => return None,
		};
		tracing::trace!( dir = %dir_path.display(), entries = batch.len(), "scanning plugin directory" );
		if let Some( entry ) = batch.into_iter().find(| entry | has_plugin_extension( entry, &config.extension )) {
			return Some( dir_path.join( entry.name ));
		}
	}

}

/// Opens the plugin for `title`, falling back to the default plugin.
///
/// # Errors
/// Returns [`FileResolutionError::NotFound`] only when neither the per-title
/// plugin nor the default plugin can be opened.
pub fn resolve<S: Storage>(
	storage: &mut S,
	config: &LoaderConfig,
	title: TitleId,
) -> Result<ResolvedPlugin<S::File>, FileResolutionError> {

	if let Some( path ) = find_title_plugin( storage, config, title ) {
		match storage.open_file( &path ) {
			Ok( file ) => return Ok( ResolvedPlugin { path, file, is_default: false }),
			Err( err ) => tracing::debug!( path = %path.display(), error = %err, "cannot open title plugin" ),
		}
	}

	let path = config.default_plugin_path();
	storage.open_file( &path )
		.map(| file | ResolvedPlugin { path, file, is_default: true })
		.map_err(| _ | FileResolutionError::NotFound( title ))

}

/// Opens an operator-forced plugin path, with no fallback.
///
/// # Errors
/// Returns [`FileResolutionError::ForcedPathUnavailable`] if the file cannot be opened.
pub fn open_forced<S: Storage>( storage: &mut S, path: &Path ) -> Result<ResolvedPlugin<S::File>, FileResolutionError> {
	storage.open_file( path )
		.map(| file | ResolvedPlugin { path: path.to_path_buf(), file, is_default: false })
		.map_err(| _ | FileResolutionError::ForcedPathUnavailable( path.display().to_string() ))
}
