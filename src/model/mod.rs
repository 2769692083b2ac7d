pub mod cohort;
pub mod series;
pub mod shelf_life;
