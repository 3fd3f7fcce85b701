use itertools::Itertools ;

use crate::{ CompatibilityError, TitleId };
use crate::format::{ Compatibility, Container };



/// Decides whether `container` may attach to the guest.
///
/// Rules apply in order and the first failure wins: emulator-only plugins never
/// load on hardware, homebrew guests need the plugin's consent, and a non-empty
/// target list must name the guest. An empty target list matches every title.
///
/// # Errors
/// Returns the [`CompatibilityError`] of the first rule that fails.
pub fn check( container: &Container, title: TitleId, is_homebrew: bool ) -> Result<(), CompatibilityError> {

	let info = container.info();

	if info.compatibility == Compatibility::EmulatorOnly {
		return Err( CompatibilityError::EmulatorOnly );
	}

	if is_homebrew && !info.allow_homebrew_load {
		return Err( CompatibilityError::HomebrewDisallowed );
	}

	match container.targets() {
		None => Ok(()),
		Some( targets ) if targets.contains( &title ) => Ok(()),
		Some( targets ) => {
			tracing::debug!(
				%title,
				targets = %targets.iter().into_iter().join( ", " ),
				"guest not in plugin target list"
			);
			Err( CompatibilityError::TitleMismatch {
				title: info.title.clone(),
				author: info.author.clone(),
			})
		}
	}

}
