pub mod category;
pub mod community;

pub use category::CategoryRepository;
pub use community::CommunityRepository;
