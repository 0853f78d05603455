pub mod cursor;
pub mod list;
