//! Type-erased access to trait objects
//!
//! Components and materials are stored as trait objects; [`AsAny`] lets
//! callers get the concrete type back without string tags.

use std::any::Any;

/// Upcast to [`Any`], implemented for every `'static` type
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`
    fn as_any(&self) -> &dyn Any;

    /// Borrow as `&mut dyn Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
