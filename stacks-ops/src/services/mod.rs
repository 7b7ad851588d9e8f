//! Business logic behind the Ops routes

pub mod authorization_service;
pub mod page_service;
pub mod permission_group_service;
pub mod product_service;
pub mod promenade_page_service;
pub mod segment_service;
pub mod user_service;

pub use authorization_service::AuthorizationService;
pub use page_service::PageService;
pub use permission_group_service::PermissionGroupService;
pub use product_service::ProductService;
pub use promenade_page_service::PromenadePageService;
pub use segment_service::SegmentService;
pub use user_service::UserService;
