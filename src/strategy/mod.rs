pub mod implementations;
pub mod markdown;
pub mod optimization;
pub mod order_up_to;
pub mod traits;
