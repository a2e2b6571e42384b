pub mod curriculum;
pub mod reaction_stats;
