pub mod generation;
pub mod notification;
pub mod post;
pub mod response;
pub mod user;
