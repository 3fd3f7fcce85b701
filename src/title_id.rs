/// A 64-bit title identifier naming a guest application.
///
/// Used both to locate a title's plugin directory and to filter containers
/// against their compatibility list. Displays as 16 upper-case hex digits,
/// which is also the name of the title's plugin directory.
///
/// ```
/// use plgldr::TitleId ;
///
/// let id = TitleId::new( 0x0004_0000_0003_0800 );
/// assert_eq!( id.to_string(), "0004000000030800" );
/// ```
#[derive( Copy, Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord )]
pub struct TitleId( u64 );

impl TitleId {
	/// Creates a new title identifier from a `u64`.
	pub const fn new( id: u64 ) -> Self { Self( id )}
}

impl std::fmt::Display for TitleId {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> Result<(),std::fmt::Error> {
		write!( f, "{:016X}", self.0 )
	}
}

impl From<u64> for TitleId {
	fn from( id: u64 ) -> Self { Self( id )}
}

impl From<TitleId> for u64 {
	fn from( id: TitleId ) -> Self { id.0 }
}
