pub mod initiative;
pub mod key_result;
pub mod milestone;
pub mod objective;
pub mod project;
pub mod red_flag;
pub mod user;
