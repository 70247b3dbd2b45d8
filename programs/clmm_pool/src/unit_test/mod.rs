pub mod math_test;
pub mod tick_bitmap_test;
pub mod tick_test;
