pub mod trainer;
pub mod trial;
