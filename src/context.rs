//! The state the loader carries between launches.

use std::path::PathBuf ;

use crate::{ LoadError, TitleId };
use crate::format::EmbeddedPayloads ;
use crate::hook::SavedEntry ;
use crate::layout::CONFIG_WORDS ;



/// How the plugin runtime should treat guest memory while the plugin menu is open.
#[derive( Copy, Clone, Debug, Default, Eq, Hash, PartialEq )]
pub enum MemoryStrategy {
	#[default]
	None,
	/// Plugin memory is private to the guest.
	Private,
	/// Plugin memory is swapped out around the guest's own use.
	Swap,
}

/// Stages of a single load, in the order they run.
#[derive( Copy, Clone, Debug, Default, Eq, Hash, PartialEq )]
pub enum LoadState {
	#[default]
	Idle,
	Resolving,
	Parsing,
	CheckingCompatibility,
	Allocating,
	LoadingSegments,
	Injecting,
	/// The plugin is mapped and the entry hook installed.
	Attached,
	/// The load was abandoned and its region released.
	Failed,
}

/// Operator-supplied override applied ahead of normal resolution.
#[derive( Clone, Debug, Eq, PartialEq )]
pub struct ForcedLoadParameters {
	/// Only apply to this title; `None` applies to any title.
	pub title_filter: Option<TitleId>,
	pub path: PathBuf,
	/// Keep the parameters after they have been used once.
	pub persistent: bool,
	pub memory_strategy: MemoryStrategy,
	/// Opaque words copied into the prepared header for the plugin.
	pub config: [u32; CONFIG_WORDS],
}

impl ForcedLoadParameters {

	pub fn new( path: impl Into<PathBuf> ) -> Self {
		Self {
			title_filter: None,
			path: path.into(),
			persistent: false,
			memory_strategy: MemoryStrategy::None,
			config: [0; CONFIG_WORDS],
		}
	}

	pub fn for_title( mut self, title: TitleId ) -> Self {
		self.title_filter = Some( title );
		self
	}

	pub fn persistent( mut self, persistent: bool ) -> Self {
		self.persistent = persistent ;
		self
	}

	pub fn with_memory_strategy( mut self, strategy: MemoryStrategy ) -> Self {
		self.memory_strategy = strategy ;
		self
	}

	pub fn with_config( mut self, config: [u32; CONFIG_WORDS] ) -> Self {
		self.config = config ;
		self
	}

	/// Whether these parameters apply to a launch of `title`.
	pub fn applies_to( &self, title: TitleId ) -> bool {
		self.title_filter.is_none_or(| filter | filter == title )
	}

}

/// Process-wide loader state, owned by the [`PluginLoader`]( crate::PluginLoader ).
///
/// The transient fields are reset at the start of every load; the forced
/// parameters survive only while marked persistent.
#[derive( Clone, Debug, Default )]
pub struct LoadContext {
	pub(crate) state: LoadState,
	pub(crate) plugin_path: Option<PathBuf>,
	pub(crate) last_error: Option<LoadError>,
	pub(crate) memory_strategy: MemoryStrategy,
	pub(crate) events_self_managed: bool,
	pub(crate) is_memory_private: bool,
	pub(crate) is_default_plugin: bool,
	pub(crate) exe_load_checksum: u32,
	pub(crate) payloads: EmbeddedPayloads,
	pub(crate) forced: Option<ForcedLoadParameters>,
	pub(crate) saved_entry: Option<SavedEntry>,
}

impl LoadContext {

	#[inline] pub fn state( &self ) -> LoadState { self.state }

	/// Path of the plugin chosen by the most recent load.
	#[inline] pub fn plugin_path( &self ) -> Option<&std::path::Path> { self.plugin_path.as_deref() }

	#[inline] pub fn last_error( &self ) -> Option<&LoadError> { self.last_error.as_ref() }

	/// Operator-facing message for the last error; silent failures have none.
	pub fn error_message( &self ) -> Option<String> {
		self.last_error.as_ref().and_then( LoadError::user_message )
	}

	#[inline] pub fn memory_strategy( &self ) -> MemoryStrategy { self.memory_strategy }
	#[inline] pub fn events_self_managed( &self ) -> bool { self.events_self_managed }
	#[inline] pub fn is_memory_private( &self ) -> bool { self.is_memory_private }
	#[inline] pub fn is_default_plugin( &self ) -> bool { self.is_default_plugin }
	#[inline] pub fn exe_load_checksum( &self ) -> u32 { self.exe_load_checksum }

	/// Save/load helpers of the attached plugin.
	#[inline] pub fn payloads( &self ) -> &EmbeddedPayloads { &self.payloads }

	#[inline] pub fn forced_parameters( &self ) -> Option<&ForcedLoadParameters> { self.forced.as_ref() }

	/// Guest words replaced by the entry hook of the attached plugin.
	#[inline] pub fn saved_entry( &self ) -> Option<&SavedEntry> { self.saved_entry.as_ref() }

	/// Clears everything a previous load left behind, except the forced parameters.
	pub(crate) fn reset_transient( &mut self, default_strategy: MemoryStrategy ) {
		let forced = self.forced.take();
		*self = Self { forced, memory_strategy: default_strategy, ..Self::default() };
	}

	pub(crate) fn transition( &mut self, state: LoadState ) {
		tracing::debug!( from = ?self.state, to = ?state, "plugin load state" );
		self.state = state ;
	}

	/// Takes the forced parameters if they apply to `title`, keeping a copy when persistent.
	pub(crate) fn take_forced_for( &mut self, title: TitleId ) -> Option<ForcedLoadParameters> {
		match &self.forced {
			Some( forced ) if forced.applies_to( title ) && forced.persistent => Some( forced.clone() ),
			Some( forced ) if forced.applies_to( title ) => self.forced.take(),
			_ => None,
		}
	}

}
