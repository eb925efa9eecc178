mod byte_order_tests;
mod ifd_tests;
