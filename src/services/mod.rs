pub mod etl;
pub mod normalize;
pub mod openweather;
