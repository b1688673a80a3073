//! Arrow utilities

pub mod array_utils;

pub use array_utils::{downcast_array, f64_column, get_column, string_column};
