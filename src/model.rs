pub mod layout;
pub mod layout_store;

pub use layout::{Layout, LayoutZone};
pub use layout_store::{LayoutStore, StoreError};
