pub mod list;

pub use list::{ListCollection, ShoppingList};
