pub mod markers;
pub mod time_series;
pub mod trajectory;
