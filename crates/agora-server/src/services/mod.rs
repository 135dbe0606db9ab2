pub mod category;
pub mod community;

pub use category::CategoryService;
pub use community::CommunityService;
