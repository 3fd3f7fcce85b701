use std::path::PathBuf ;
use plgldr::resolver::{ self, FsStorage };

use crate::fixtures ;

struct TempMount( PathBuf );

impl TempMount {
	fn new( name: &str ) -> Self {
		let path = std::env::temp_dir().join( format!( "plgldr-{}-{}", name, std::process::id() ));
		let _ = std::fs::remove_dir_all( &path );
		std::fs::create_dir_all( &path ).expect( "failed to create mount" );
		Self( path )
	}
}

impl Drop for TempMount {
	fn drop( &mut self ) { let _ = std::fs::remove_dir_all( &self.0 ); }
}

#[test]
fn resolves_title_plugin_on_disk() {

	let mount = TempMount::new( "title" );
	let title_dir = mount.0.join( "luma/plugins/0004000000000000" );
	std::fs::create_dir_all( title_dir.join( "nested.3gx" )).expect( "failed to create directory" );
	std::fs::write( title_dir.join( "cheats.3Gx" ), b"plugin" ).expect( "failed to write plugin" );

	let mut storage = FsStorage::new( &mount.0 );
	match resolver::resolve( &mut storage, &fixtures::config(), fixtures::GUEST_TITLE ) {
		Ok( plugin ) if !plugin.is_default => assert_eq!(
			plugin.path,
			PathBuf::from( "/luma/plugins/0004000000000000/cheats.3Gx" ),
		),
		other => panic!( "Expected the per-title plugin, got: {:#?}", other ),
	}

}

#[test]
fn resolves_default_plugin_on_disk() {

	let mount = TempMount::new( "default" );
	std::fs::create_dir_all( mount.0.join( "luma/plugins" )).expect( "failed to create directory" );
	std::fs::write( mount.0.join( "luma/plugins/default.3gx" ), b"plugin" ).expect( "failed to write plugin" );

	let mut storage = FsStorage::new( &mount.0 );
	match resolver::resolve( &mut storage, &fixtures::config(), fixtures::GUEST_TITLE ) {
		Ok( plugin ) if plugin.is_default => {}
		other => panic!( "Expected the default plugin, got: {:#?}", other ),
	}

}
