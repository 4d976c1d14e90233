pub mod db;
pub mod memory;
pub mod password;

pub use db::DbAdapter;
pub use memory::InMemoryAdapter;
