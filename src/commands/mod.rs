pub mod diff;
pub mod remote_show;
pub mod show;
pub mod upload;
pub mod validate;
