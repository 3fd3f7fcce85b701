use crate::{ LoadError, LoaderConfig, ResourceError };
use crate::{ compat, format, injector, resolver, segments };
use crate::context::{ ForcedLoadParameters, LoadContext, LoadState, MemoryStrategy };
use crate::hook ;
use crate::kernel::{ Kernel, ProcessHandle };
use crate::layout::PreparedHeader ;
use crate::memory::{ MemoryPool, Region, RegionAllocator };
use crate::resolver::Storage ;



/// Loads plugins into guest processes as they launch.
///
/// The loader owns its [`LoadContext`] and the single plugin region; the host
/// serializes launch events, so nothing here takes a lock. Call
/// [`PluginLoader::try_load`] from the launch handler before the guest runs.
///
/// # Type Parameters
/// - `S`: where plugin files are read from
/// - `P`: where the plugin region is allocated from
/// - `K`: the privileged calls used to map and patch the guest
pub struct PluginLoader<S, P, K> {
	config: LoaderConfig,
	storage: S,
	kernel: K,
	allocator: RegionAllocator<P>,
	context: LoadContext,
}

impl<S, P, K> PluginLoader<S, P, K>
where
	S: Storage,
	P: MemoryPool,
	K: Kernel,
{

	pub fn new( config: LoaderConfig, storage: S, pool: P, kernel: K ) -> Self {
		let context = LoadContext { memory_strategy: config.memory_strategy, ..LoadContext::default() };
		Self {
			config,
			storage,
			kernel,
			allocator: RegionAllocator::new( pool ),
			context,
		}
	}

	#[inline] pub fn config( &self ) -> &LoaderConfig { &self.config }
	#[inline] pub fn context( &self ) -> &LoadContext { &self.context }
	#[inline] pub fn storage( &self ) -> &S { &self.storage }
	#[inline] pub fn kernel( &self ) -> &K { &self.kernel }

	/// The region of the attached plugin, if one is held.
	#[inline] pub fn region( &self ) -> Option<&Region> { self.allocator.region() }

	/// Installs or clears the operator's forced load parameters.
	pub fn set_forced_parameters( &mut self, forced: Option<ForcedLoadParameters> ) {
		self.context.forced = forced ;
	}

	/// Runs the whole pipeline for a launching guest.
	///
	/// On failure the region is released, the error is recorded in the context,
	/// and the guest is left exactly as it was.
	///
	/// # Errors
	/// Returns the [`LoadError`] of the stage that failed.
	pub fn try_load( &mut self, process: ProcessHandle, is_homebrew: bool ) -> Result<(), LoadError> {

		self.context.reset_transient( self.config.memory_strategy );

		match self.run( process, is_homebrew ) {
			Ok(()) => {
				self.context.transition( LoadState::Attached );
				Ok(())
			}
			Err( err ) => {
				let released = self.allocator.release();
				self.context.transition( LoadState::Failed );
				match err.user_message() {
					Some( message ) => tracing::warn!( %message, released, "plugin load failed" ),
					None => tracing::debug!( error = %err, "plugin load skipped" ),
				}
				self.context.last_error = Some( err.clone() );
				Err( err )
			}
		}

	}

	/// [`PluginLoader::try_load`] for callers that only need to know whether a plugin attached.
	pub fn load( &mut self, process: ProcessHandle, is_homebrew: bool ) -> bool {
		self.try_load( process, is_homebrew ).is_ok()
	}

	fn run( &mut self, process: ProcessHandle, is_homebrew: bool ) -> Result<(), LoadError> {

		let title = self.kernel.title_id( process ).map_err( ResourceError::ProcessQueryFailed )?;
		let mut header = PreparedHeader::new();

		self.context.transition( LoadState::Resolving );
		let mut plugin = match self.context.take_forced_for( title ) {
			Some( forced ) => {
				self.context.memory_strategy = forced.memory_strategy ;
				header.config = forced.config ;
				resolver::open_forced( &mut self.storage, &forced.path )?
			}
			None => resolver::resolve( &mut self.storage, &self.config, title )?,
		};
		self.context.plugin_path = Some( plugin.path.clone() );
		self.context.is_default_plugin = plugin.is_default ;
		header.is_default_plugin = plugin.is_default ;

		self.context.transition( LoadState::Parsing );
		let container = format::validate_and_parse( &mut plugin.file )?;

		self.context.transition( LoadState::CheckingCompatibility );
		compat::check( &container, title, is_homebrew )?;

		let info = container.info();
		self.context.events_self_managed = info.events_self_managed ;
		self.context.is_memory_private = info.use_private_memory ;
		if self.context.memory_strategy == MemoryStrategy::Swap && info.swap_not_needed {
			self.context.memory_strategy = MemoryStrategy::None ;
		}
		self.context.exe_load_checksum = info.exe_load_checksum ;
		self.context.payloads = container.payloads().clone();

		self.context.transition( LoadState::Allocating );
		let region = self.allocator.reserve( info.memory_tier, self.config.tier_size( info.memory_tier ))?;

		self.context.transition( LoadState::LoadingSegments );
		let layout = segments::load_segments( &mut plugin.file, &container, region )?;

		header.version = container.version();
		header.heap_address = self.config.heap_address();
		header.heap_size = layout.heap_size();
		header.image_size = layout.image_size();
		header.event_channel = self.config.event_channel ;
		header.reply_channel = self.config.reply_channel ;

		self.context.transition( LoadState::Injecting );
		let saved = injector::inject( &mut self.kernel, process, region, &header, &self.config )?;
		self.context.saved_entry = Some( saved );

		tracing::info!(
			%title,
			path = %plugin.path.display(),
			plugin = %info.title,
			image_size = layout.image_size(),
			heap_size = layout.heap_size(),
			"plugin attached"
		);

		Ok(())

	}

	/// Puts the guest's original entry words back, if a hook is installed.
	///
	/// # Errors
	/// Returns [`ResourceError::EntryMappingFailed`] if the entry page cannot be
	/// aliased; the saved words are kept so the call can be retried.
	pub fn restore_entry( &mut self, process: ProcessHandle ) -> Result<(), ResourceError> {
		let Some( saved ) = self.context.saved_entry else { return Ok(()) };
		hook::restore( &mut self.kernel, process, &saved ).map_err( ResourceError::EntryMappingFailed )?;
		self.context.saved_entry = None ;
		Ok(())
	}

	/// Reclaims the plugin region once the guest it was attached to is terminating.
	pub fn on_guest_exit( &mut self ) {
		if self.allocator.release() {
			tracing::debug!( "plugin region released on guest exit" );
		}
		self.context.saved_entry = None ;
		self.context.transition( LoadState::Idle );
	}

}

impl<S, P: std::fmt::Debug, K> std::fmt::Debug for PluginLoader<S, P, K> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "PluginLoader" )
			.field( "config", &self.config )
			.field( "storage", &"<Storage>" )
			.field( "kernel", &"<Kernel>" )
			.field( "allocator", &self.allocator )
			.field( "context", &self.context )
			.finish()
	}
}
