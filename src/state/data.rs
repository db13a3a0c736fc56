//! Per-state data payloads.

use std::any::{self, Any};
use std::fmt;

fn create_boxed<T: Default + 'static>() -> Box<dyn Any> {
    Box::new(T::default())
}

/// Declared payload type of a state, able to allocate fresh instances.
#[derive(Clone, Copy)]
pub struct DataFactory {
    type_name: &'static str,
    create: fn() -> Box<dyn Any>,
}

impl DataFactory {
    pub fn of<T: Default + 'static>() -> Self {
        Self {
            type_name: any::type_name::<T>(),
            create: create_boxed::<T>,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn create(&self) -> Box<dyn Any> {
        (self.create)()
    }
}

impl fmt::Debug for DataFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DataFactory").field(&self.type_name).finish()
    }
}

/// Payload used by states that do not declare their own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DefaultStateData;
