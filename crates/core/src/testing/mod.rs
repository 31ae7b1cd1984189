//! Test doubles for converters.

mod mock_converter;

use std::sync::Arc;

use crate::converter::{Converter, ConverterRegistry};

pub use mock_converter::MockConverter;

/// Build a registry with the same mock wired into all six category
/// slots.
pub fn mock_registry(mock: Arc<MockConverter>) -> ConverterRegistry {
    let mock: Arc<dyn Converter> = mock;
    ConverterRegistry::new(
        Arc::clone(&mock),
        Arc::clone(&mock),
        Arc::clone(&mock),
        Arc::clone(&mock),
        Arc::clone(&mock),
        mock,
    )
}
