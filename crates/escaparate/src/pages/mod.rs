//! Page objects for the storefront screens.

mod inventory;
mod login;

pub use inventory::InventoryPage;
pub use login::{Credentials, LoginPage};
