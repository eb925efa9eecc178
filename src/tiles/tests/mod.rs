mod test_utils;
mod grid_tests;
mod cache_tests;
