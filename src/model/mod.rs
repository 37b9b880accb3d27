//! Domain types shared by the store, the service layer and the HTTP handlers.
//!
//! - [`User`] / [`NewUser`] / [`UserChanges`] - user records and writes
//! - [`Follow`] / [`FollowCounts`] - directed follow edges
//! - [`PageRequest`] / [`Page`] / [`Pagination`] - offset pagination
//! - [`UserQuery`] - search and sort options for user listings

mod follow;
mod page;
mod user;

pub use follow::{Follow, FollowCounts};
pub use page::{Page, PageRequest, Pagination, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
pub use user::{NewUser, SortField, SortOrder, User, UserChanges, UserQuery};
