use plgldr::{ FormatError, LoadError, LoadState, ResourceError };

use crate::container_builder::ContainerBuilder ;
use crate::fixtures::{ self, harness, storage_for };
use crate::mock_host::KernelCall ;

#[test]
fn failure_after_success_leaves_no_region() {

	let storage = storage_for( fixtures::GUEST_TITLE, fixtures::BASIC_PLUGIN.clone() )
		.with_file( fixtures::DEFAULT_PATH, ContainerBuilder::new().version( 1 ).build() );
	let mut h = harness( storage );

	assert!( h.loader.load( fixtures::GUEST, false ));
	assert_eq!( h.pool.live_blocks(), 1 );

	match h.loader.try_load( fixtures::OTHER_GUEST, false ) {
		Err( LoadError::Format( FormatError::PluginTooOld( 1 ))) => {}
		other => panic!( "Expected PluginTooOld, got: {:#?}", other ),
	}
	assert_eq!( h.pool.live_blocks(), 0 );
	assert!( h.loader.region().is_none() );
	assert!( h.loader.context().saved_entry().is_none() );

}

#[test]
fn new_load_frees_the_previous_region() {

	let mut h = harness( storage_for( fixtures::GUEST_TITLE, fixtures::BASIC_PLUGIN.clone() ));

	assert!( h.loader.load( fixtures::GUEST, false ));
	let first = h.loader.region().expect( "region should be held" ).handle();

	h.kernel.0.borrow_mut().guest_words.insert( fixtures::ENTRY, fixtures::ORIGINAL_ENTRY[0] );
	h.kernel.0.borrow_mut().guest_words.insert( fixtures::ENTRY + 4, fixtures::ORIGINAL_ENTRY[1] );
	assert!( h.loader.load( fixtures::GUEST, false ));
	let second = h.loader.region().expect( "region should be held" ).handle();

	assert_ne!( first, second );
	let pool = h.pool.0.borrow();
	assert_eq!( pool.allocations, 2 );
	assert_eq!( pool.frees, 1 );
	assert_eq!( pool.live.len(), 1 );
	assert!( pool.live.contains( &second ));

}

#[test]
fn guest_exit_releases_the_region() {

	let mut h = harness( storage_for( fixtures::GUEST_TITLE, fixtures::BASIC_PLUGIN.clone() ));
	assert!( h.loader.load( fixtures::GUEST, false ));

	h.loader.on_guest_exit();
	assert_eq!( h.pool.live_blocks(), 0 );
	assert!( h.loader.region().is_none() );
	assert!( h.loader.context().saved_entry().is_none() );
	assert_eq!( h.loader.context().state(), LoadState::Idle );

	h.loader.on_guest_exit();
	assert_eq!( h.pool.0.borrow().frees, 1 );

}

#[test]
fn restore_entry_puts_back_the_original_words() {

	let mut h = harness( storage_for( fixtures::GUEST_TITLE, fixtures::BASIC_PLUGIN.clone() ));
	assert!( h.loader.load( fixtures::GUEST, false ));
	assert_ne!( h.kernel.guest_pair( fixtures::ENTRY ), fixtures::ORIGINAL_ENTRY );

	if let Err( err ) = h.loader.restore_entry( fixtures::GUEST ) { panic!( "Restore failed: {}", err ) }
	assert_eq!( h.kernel.guest_pair( fixtures::ENTRY ), fixtures::ORIGINAL_ENTRY );
	assert!( h.loader.context().saved_entry().is_none() );
	assert!( h.kernel.0.borrow().alias.is_none() );

	let calls_before = h.kernel.calls().len();
	if let Err( err ) = h.loader.restore_entry( fixtures::GUEST ) { panic!( "Restore failed: {}", err ) }
	assert_eq!( h.kernel.calls().len(), calls_before );

}

#[test]
fn failed_restore_keeps_the_saved_words() {

	let mut h = harness( storage_for( fixtures::GUEST_TITLE, fixtures::BASIC_PLUGIN.clone() ));
	assert!( h.loader.load( fixtures::GUEST, false ));
	h.kernel.0.borrow_mut().fail_map_guest = true ;

	match h.loader.restore_entry( fixtures::GUEST ) {
		Err( ResourceError::EntryMappingFailed( _ )) => {}
		other => panic!( "Expected EntryMappingFailed, got: {:#?}", other ),
	}
	assert!( h.loader.context().saved_entry().is_some() );

	h.kernel.0.borrow_mut().fail_map_guest = false ;
	assert!( h.loader.restore_entry( fixtures::GUEST ).is_ok() );
	assert_eq!( h.kernel.guest_pair( fixtures::ENTRY ), fixtures::ORIGINAL_ENTRY );

}

#[test]
fn refused_allocation_is_reported() {

	let mut h = harness( storage_for( fixtures::GUEST_TITLE, ContainerBuilder::new().tier( 2 ).build() ));
	h.pool.0.borrow_mut().refuse = true ;

	match h.loader.try_load( fixtures::GUEST, false ) {
		Err( LoadError::Resource( ResourceError::AllocationFailed { size })) => assert_eq!( size, 10 * 1024 * 1024 ),
		other => panic!( "Expected AllocationFailed, got: {:#?}", other ),
	}
	assert!( h.kernel.calls().is_empty() );
	assert_eq!( h.loader.context().state(), LoadState::Failed );

}

#[test]
fn unknown_process_is_reported() {

	let mut h = harness( storage_for( fixtures::GUEST_TITLE, fixtures::BASIC_PLUGIN.clone() ));

	match h.loader.try_load( plgldr::ProcessHandle( 0x99 ), false ) {
		Err( LoadError::Resource( ResourceError::ProcessQueryFailed( _ ))) => {}
		other => panic!( "Expected ProcessQueryFailed, got: {:#?}", other ),
	}
	assert_eq!( *h.loader.storage().dir_reads.borrow(), 0 );
	assert_eq!( h.pool.0.borrow().allocations, 0 );

}

#[test]
fn unmapped_region_is_never_mapped_twice() {

	let mut h = harness( storage_for( fixtures::GUEST_TITLE, fixtures::BASIC_PLUGIN.clone() ));
	assert!( h.loader.load( fixtures::GUEST, false ));
	h.loader.on_guest_exit();
	assert!( h.loader.load( fixtures::GUEST, false ));

	let maps = h.kernel.calls().into_iter()
		.filter(| call | matches!( call, KernelCall::MapRegion { .. }))
		.count();
	assert_eq!( maps, 2 );
	assert_eq!( h.pool.live_blocks(), 1 );

}
