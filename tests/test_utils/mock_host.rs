#[allow( dead_code )]
mod mock_host {

	use std::cell::RefCell ;
	use std::collections::{ HashMap, HashSet, VecDeque };
	use std::io::Cursor ;
	use std::path::{ Path, PathBuf };
	use std::rc::Rc ;

	use plgldr::resolver::{ DirEntry, Directory, Storage };
	use plgldr::{ Kernel, KernelError, MemoryPool, ProcessHandle, ProcessOp, RawBlock, Region, TitleId };

	/// In-memory storage. Directory entries enumerate in insertion order.
	#[derive( Clone, Default )]
	pub struct MemoryStorage {
		files: HashMap<PathBuf, Vec<u8>>,
		listings: HashMap<PathBuf, Vec<DirEntry>>,
		pub dir_reads: Rc<RefCell<usize>>,
	}

	impl MemoryStorage {

		pub fn new() -> Self { Self::default() }

		/// Adds a readable file and lists it in its parent directory.
		pub fn with_file( mut self, path: impl Into<PathBuf>, bytes: Vec<u8> ) -> Self {
			let path = path.into();
			self = self.with_listed( &path, false );
			self.files.insert( path, bytes );
			self
		}

		/// Lists an entry in its parent directory without backing it by a readable file.
		pub fn with_unreadable_entry( self, path: impl Into<PathBuf> ) -> Self {
			self.with_listed( &path.into(), false )
		}

		pub fn with_subdirectory( self, path: impl Into<PathBuf> ) -> Self {
			self.with_listed( &path.into(), true )
		}

		fn with_listed( mut self, path: &Path, is_directory: bool ) -> Self {
			let parent = path.parent().map( Path::to_path_buf ).unwrap_or_default();
			let name = path.file_name().map(| name | name.to_string_lossy().into_owned() ).unwrap_or_default();
			self.listings.entry( parent ).or_default().push( DirEntry { name, is_directory });
			self
		}

	}

	pub struct MemoryDirectory {
		entries: VecDeque<DirEntry>,
		reads: Rc<RefCell<usize>>,
	}

	impl Directory for MemoryDirectory {
		fn read( &mut self, max: usize ) -> std::io::Result<Vec<DirEntry>> {
			*self.reads.borrow_mut() += 1 ;
			let count = max.min( self.entries.len() );
			Ok( self.entries.drain( ..count ).collect() )
		}
	}

	impl Storage for MemoryStorage {

		type File = Cursor<Vec<u8>> ;
		type Dir = MemoryDirectory ;

		fn open_dir( &mut self, path: &Path ) -> std::io::Result<Self::Dir> {
			match self.listings.get( path ) {
				Some( entries ) => Ok( MemoryDirectory {
					entries: entries.iter().cloned().collect(),
					reads: Rc::clone( &self.dir_reads ),
				}),
				None => Err( std::io::ErrorKind::NotFound.into() ),
			}
		}

		fn open_file( &mut self, path: &Path ) -> std::io::Result<Self::File> {
			self.files.get( path )
				.map(| bytes | Cursor::new( bytes.clone() ))
				.ok_or_else(|| std::io::ErrorKind::NotFound.into() )
		}

	}

	#[derive( Debug, Default )]
	pub struct PoolState {
		pub live: HashSet<u32>,
		pub allocations: usize,
		pub frees: usize,
		pub refuse: bool,
		next_handle: u32,
	}

	/// A memory pool handing out heap buffers; clones share state.
	#[derive( Clone, Debug, Default )]
	pub struct MockPool( pub Rc<RefCell<PoolState>> );

	impl MockPool {
		pub fn new() -> Self { Self::default() }
		pub fn live_blocks( &self ) -> usize { self.0.borrow().live.len() }
	}

	impl MemoryPool for MockPool {

		fn allocate( &mut self, size: u32 ) -> Result<RawBlock, KernelError> {
			let mut state = self.0.borrow_mut();
			if state.refuse { return Err( KernelError( 0xD860_180A )) }
			state.next_handle += 1 ;
			let handle = state.next_handle ;
			state.live.insert( handle );
			state.allocations += 1 ;
			Ok( RawBlock { handle, memory: vec![ 0xAA; size as usize ].into_boxed_slice() })
		}

		fn free( &mut self, block: RawBlock ) {
			let mut state = self.0.borrow_mut();
			assert!( state.live.remove( &block.handle ), "block {} freed twice", block.handle );
			state.frees += 1 ;
		}

	}

	#[derive( Clone, Debug, Eq, PartialEq )]
	pub enum KernelCall {
		Control( ProcessOp ),
		MapRegion { handle: u32, address: u32 },
		UnmapRegion { handle: u32 },
		MapGuest { address: u32 },
		UnmapGuest { address: u32 },
		Flush,
	}

	#[derive( Debug, Default )]
	pub struct KernelState {
		pub titles: HashMap<ProcessHandle, TitleId>,
		/// Guest words by address, shared by every process for simplicity.
		pub guest_words: HashMap<u32, u32>,
		pub alias: Option<( u32, u32 )>,
		pub calls: Vec<KernelCall>,
		/// Region contents captured at the moment of mapping.
		pub mapped_snapshot: Option<Vec<u8>>,
		/// Process control operation the kernel rejects.
		pub fail_control: Option<ProcessOp>,
		pub fail_map_region: bool,
		pub fail_map_guest: bool,
	}

	/// A kernel double recording every call; clones share state.
	#[derive( Clone, Debug, Default )]
	pub struct MockKernel( pub Rc<RefCell<KernelState>> );

	impl MockKernel {

		pub fn new() -> Self { Self::default() }

		pub fn with_process( self, process: ProcessHandle, title: TitleId ) -> Self {
			self.0.borrow_mut().titles.insert( process, title );
			self
		}

		pub fn with_guest_words( self, address: u32, words: [u32; 2] ) -> Self {
			{
				let mut state = self.0.borrow_mut();
				state.guest_words.insert( address, words[0] );
				state.guest_words.insert( address + 4, words[1] );
			}
			self
		}

		pub fn guest_pair( &self, address: u32 ) -> [u32; 2] {
			let state = self.0.borrow();
			[
				state.guest_words.get( &address ).copied().unwrap_or_default(),
				state.guest_words.get( &( address + 4 )).copied().unwrap_or_default(),
			]
		}

		pub fn calls( &self ) -> Vec<KernelCall> { self.0.borrow().calls.clone() }

		fn assert_aliased( state: &KernelState, address: u32 ) {
			match state.alias {
				Some(( page, size )) if address >= page && address < page + size => {}
				other => panic!( "guest word {:#x} accessed without an alias (alias: {:?})", address, other ),
			}
		}

	}

	impl Kernel for MockKernel {

		fn title_id( &mut self, process: ProcessHandle ) -> Result<TitleId, KernelError> {
			self.0.borrow().titles.get( &process ).copied().ok_or( KernelError( 0xD8E0_07F7 ))
		}

		fn control_process( &mut self, _process: ProcessHandle, op: ProcessOp ) -> Result<(), KernelError> {
			let mut state = self.0.borrow_mut();
			if state.fail_control == Some( op ) { return Err( KernelError( 0xD900_1830 )) }
			state.calls.push( KernelCall::Control( op ));
			Ok(())
		}

		fn map_region( &mut self, _process: ProcessHandle, region: &Region, address: u32 ) -> Result<(), KernelError> {
			let mut state = self.0.borrow_mut();
			if state.fail_map_region { return Err( KernelError( 0xD900_1BF7 )) }
			state.calls.push( KernelCall::MapRegion { handle: region.handle(), address });
			state.mapped_snapshot = Some( region.bytes().to_vec() );
			Ok(())
		}

		fn unmap_region( &mut self, _process: ProcessHandle, region: &Region, _address: u32 ) {
			self.0.borrow_mut().calls.push( KernelCall::UnmapRegion { handle: region.handle() });
		}

		fn map_guest_memory( &mut self, _process: ProcessHandle, address: u32, size: u32 ) -> Result<(), KernelError> {
			let mut state = self.0.borrow_mut();
			if state.fail_map_guest { return Err( KernelError( 0xE0A0_1BF5 )) }
			assert!( state.alias.is_none(), "guest page aliased twice" );
			state.alias = Some(( address, size ));
			state.calls.push( KernelCall::MapGuest { address });
			Ok(())
		}

		fn unmap_guest_memory( &mut self, address: u32, _size: u32 ) {
			let mut state = self.0.borrow_mut();
			state.alias = None ;
			state.calls.push( KernelCall::UnmapGuest { address });
		}

		fn read_word( &mut self, address: u32 ) -> u32 {
			let state = self.0.borrow();
			Self::assert_aliased( &state, address );
			state.guest_words.get( &address ).copied().unwrap_or_default()
		}

		fn write_word( &mut self, address: u32, value: u32 ) {
			let mut state = self.0.borrow_mut();
			Self::assert_aliased( &state, address );
			state.guest_words.insert( address, value );
		}

		fn flush_data_cache( &mut self ) {
			self.0.borrow_mut().calls.push( KernelCall::Flush );
		}

	}

}
