//! Build descriptors and package selection.

mod descriptor;
mod select;

pub use descriptor::{Condition, Descriptor, Package, DESCRIPTOR_URL};
pub use select::{select_packages, Selection, SelectionCriteria, ALL_LANGUAGES, CORE_TYPE};
