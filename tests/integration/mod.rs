//! Integration tests for the stylesync reconciliation loop

mod context_holder;
mod options;
mod output_resolution;
mod test_utils;
